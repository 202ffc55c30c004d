use std::rc::Rc;

use ash::{prelude::VkResult, vk};

use crate::utility::OnErr;

use super::{
  device_api::{ImageSharing, PresentDevice, SwapchainDescriptor},
  device_destroyable::Scoped,
  errors::ResourceCreationError,
};

// it is usually recommended to use one more than the minimum number of images
pub fn requested_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
  let count = capabilities.min_image_count + 1;
  // 0 means there is no maximum
  if capabilities.max_image_count > 0 {
    count.min(capabilities.max_image_count)
  } else {
    count
  }
}

// in rare cases that presentation != graphics, images are shared concurrently by both families
pub fn image_sharing(graphics_family: u32, presentation_family: u32) -> ImageSharing {
  if graphics_family != presentation_family {
    ImageSharing::Concurrent([graphics_family, presentation_family])
  } else {
    ImageSharing::Exclusive
  }
}

// Swapchain plus one color view per presentable image.
pub struct PresentationChain<D: PresentDevice> {
  device: Rc<D>,
  swapchain: vk::SwapchainKHR,
  // owned by the swapchain
  images: Box<[vk::Image]>,
  image_views: Box<[vk::ImageView]>,
  format: vk::SurfaceFormatKHR,
  extent: vk::Extent2D,
}

impl<D: PresentDevice> PresentationChain<D> {
  #[allow(clippy::too_many_arguments)]
  pub fn create(
    device: Rc<D>,
    surface: vk::SurfaceKHR,
    capabilities: &vk::SurfaceCapabilitiesKHR,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
    graphics_family: u32,
    presentation_family: u32,
  ) -> Result<Self, ResourceCreationError> {
    let descriptor = SwapchainDescriptor {
      surface,
      min_image_count: requested_image_count(capabilities),
      format,
      extent,
      usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
      sharing: image_sharing(graphics_family, presentation_family),
      pre_transform: capabilities.current_transform,
      present_mode,
    };
    log::info!(
      "Creating swapchain with ({}, {}) extent, {:?} format, {:?} present mode and {} images",
      extent.width,
      extent.height,
      format,
      present_mode,
      descriptor.min_image_count
    );

    let swapchain = Scoped::new(device.as_ref(), device.create_swapchain(&descriptor)?);
    // the device may create more images than requested
    let images = device.swapchain_images(*swapchain)?.into_boxed_slice();

    let image_views = {
      let mut image_views: Vec<vk::ImageView> = Vec::with_capacity(images.len());
      for &image in images.iter() {
        let view = device
          .create_image_view(image, format.format)
          .on_err(|_| {
            for &view in image_views.iter() {
              device.destroy_image_view(view);
            }
          })?;
        image_views.push(view);
      }
      image_views.into_boxed_slice()
    };
    let swapchain = swapchain.release();

    log::debug!(
      "Created swapchain with\nimages: {:?}\nimage views: {:?}",
      images,
      image_views
    );

    Ok(Self {
      device,
      swapchain,
      images,
      image_views,
      format,
      extent,
    })
  }

  // Returns the index of the next presentable image and whether the chain is suboptimal.
  // `signal` is signaled once the image can be rendered to.
  pub fn acquire_next(&self, timeout: u64, signal: vk::Semaphore) -> VkResult<(u32, bool)> {
    self
      .device
      .acquire_next_image(self.swapchain, timeout, signal)
  }

  pub fn present(&self, image_index: u32, wait: vk::Semaphore) -> VkResult<bool> {
    self.device.queue_present(self.swapchain, image_index, wait)
  }

  pub fn image_count(&self) -> usize {
    self.images.len()
  }

  pub fn image_views(&self) -> &[vk::ImageView] {
    &self.image_views
  }

  pub fn format(&self) -> vk::SurfaceFormatKHR {
    self.format
  }

  pub fn extent(&self) -> vk::Extent2D {
    self.extent
  }
}

impl<D: PresentDevice> Drop for PresentationChain<D> {
  fn drop(&mut self) {
    log::debug!("Destroying swapchain");
    for &view in self.image_views.iter() {
      self.device.destroy_image_view(view);
    }
    self.device.destroy_swapchain(self.swapchain);
  }
}

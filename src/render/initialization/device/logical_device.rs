use std::{ops::Deref, ptr};

use ash::{prelude::VkResult, vk};

use crate::{
  render::{
    command_pools::create_command_pool,
    device_api::{
      BufferDevice, FrameSubmission, ImageSharing, PresentDevice, SwapchainDescriptor, SyncDevice,
    },
    device_destroyable::Scoped,
    errors::InitializationError,
    initialization::Instance,
    REQUIRED_DEVICE_EXTENSIONS,
  },
  utility::OnErr,
};

use super::{DeviceSelection, Queues};

// Logical device together with everything needed to implement the device traits
pub struct Device {
  inner: ash::Device,
  swapchain_loader: ash::khr::swapchain::Device,
  memory_properties: vk::PhysicalDeviceMemoryProperties,
  pub queues: Queues,
  pub graphics_family: u32,
  pub presentation_family: u32,
  // one-shot transfers, allocated on the graphics family
  transfer_pool: vk::CommandPool,
}

impl Deref for Device {
  type Target = ash::Device;

  fn deref(&self) -> &Self::Target {
    &self.inner
  }
}

impl Device {
  pub fn create(
    instance: &Instance,
    selection: &DeviceSelection,
  ) -> Result<Self, InitializationError> {
    let queue_create_infos =
      Queues::get_queue_create_infos(selection.graphics_family, selection.presentation_family);

    let extension_pointers: Vec<*const std::ffi::c_char> = REQUIRED_DEVICE_EXTENSIONS
      .iter()
      .map(|name| name.as_ptr())
      .collect();

    // in this case there are no features
    let features = vk::PhysicalDeviceFeatures::default();

    let create_info = vk::DeviceCreateInfo::default()
      .queue_create_infos(&queue_create_infos)
      .enabled_extension_names(&extension_pointers)
      .enabled_features(&features);

    log::info!("Creating logical device");
    let inner = unsafe { instance.create_device(selection.physical_device, &create_info, None) }
      .map_err(InitializationError::LogicalDeviceCreationFailed)?;

    log::debug!("Retrieving queues");
    let queues = unsafe {
      Queues::retrieve(
        &inner,
        selection.graphics_family,
        selection.presentation_family,
      )
    };

    let transfer_pool = create_command_pool(
      &inner,
      vk::CommandPoolCreateFlags::TRANSIENT,
      selection.graphics_family,
    )
    .on_err(|_| unsafe { inner.destroy_device(None) })
      .map_err(InitializationError::LogicalDeviceCreationFailed)?;

    let memory_properties =
      unsafe { instance.get_physical_device_memory_properties(selection.physical_device) };
    log::debug!("Memory properties: {:#?}", memory_properties);

    let swapchain_loader = ash::khr::swapchain::Device::new(instance, &inner);

    Ok(Self {
      inner,
      swapchain_loader,
      memory_properties,
      queues,
      graphics_family: selection.graphics_family,
      presentation_family: selection.presentation_family,
      transfer_pool,
    })
  }
}

impl Drop for Device {
  fn drop(&mut self) {
    log::debug!("Destroying logical device");
    unsafe {
      self.inner.destroy_command_pool(self.transfer_pool, None);
      // destroying a logical device also implicitly destroys all associated queues
      self.inner.destroy_device(None);
    }
  }
}

impl BufferDevice for Device {
  fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
    &self.memory_properties
  }

  fn create_buffer(
    &self,
    size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
  ) -> VkResult<vk::Buffer> {
    let create_info = vk::BufferCreateInfo::default()
      .size(size)
      .usage(usage)
      .sharing_mode(vk::SharingMode::EXCLUSIVE);
    unsafe { self.inner.create_buffer(&create_info, None) }
  }

  fn destroy_buffer(&self, buffer: vk::Buffer) {
    unsafe { self.inner.destroy_buffer(buffer, None) }
  }

  fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
    unsafe { self.inner.get_buffer_memory_requirements(buffer) }
  }

  fn allocate_memory(
    &self,
    size: vk::DeviceSize,
    memory_type_index: u32,
  ) -> VkResult<vk::DeviceMemory> {
    let allocate_info = vk::MemoryAllocateInfo::default()
      .allocation_size(size)
      .memory_type_index(memory_type_index);
    unsafe { self.inner.allocate_memory(&allocate_info, None) }
  }

  fn free_memory(&self, memory: vk::DeviceMemory) {
    unsafe { self.inner.free_memory(memory, None) }
  }

  fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: vk::DeviceMemory) -> VkResult<()> {
    unsafe { self.inner.bind_buffer_memory(buffer, memory, 0) }
  }

  fn write_memory(&self, memory: vk::DeviceMemory, bytes: &[u8]) -> VkResult<()> {
    unsafe {
      let dst = self.inner.map_memory(
        memory,
        0,
        bytes.len() as vk::DeviceSize,
        vk::MemoryMapFlags::empty(),
      )? as *mut u8;
      ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len());
      // memory is host coherent, no flush needed
      self.inner.unmap_memory(memory);
    }
    Ok(())
  }

  fn read_memory(&self, memory: vk::DeviceMemory, size: vk::DeviceSize) -> VkResult<Vec<u8>> {
    let mut bytes = vec![0u8; size as usize];
    unsafe {
      let src =
        self
          .inner
          .map_memory(memory, 0, size, vk::MemoryMapFlags::empty())? as *const u8;
      ptr::copy_nonoverlapping(src, bytes.as_mut_ptr(), bytes.len());
      self.inner.unmap_memory(memory);
    }
    Ok(bytes)
  }

  fn allocate_transfer_command_buffer(&self) -> VkResult<vk::CommandBuffer> {
    let allocate_info = vk::CommandBufferAllocateInfo::default()
      .command_pool(self.transfer_pool)
      .level(vk::CommandBufferLevel::PRIMARY)
      .command_buffer_count(1);
    let buffers = unsafe { self.inner.allocate_command_buffers(&allocate_info) }?;
    Ok(buffers[0])
  }

  fn free_transfer_command_buffer(&self, command_buffer: vk::CommandBuffer) {
    unsafe {
      self
        .inner
        .free_command_buffers(self.transfer_pool, &[command_buffer])
    }
  }

  fn record_buffer_copy(
    &self,
    command_buffer: vk::CommandBuffer,
    src: vk::Buffer,
    dst: vk::Buffer,
    size: vk::DeviceSize,
  ) -> VkResult<()> {
    let begin_info =
      vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
    let region = vk::BufferCopy {
      src_offset: 0,
      dst_offset: 0,
      size,
    };
    unsafe {
      self.inner.begin_command_buffer(command_buffer, &begin_info)?;
      self.inner.cmd_copy_buffer(command_buffer, src, dst, &[region]);
      self.inner.end_command_buffer(command_buffer)
    }
  }

  fn submit_transfer_and_wait(&self, command_buffer: vk::CommandBuffer) -> VkResult<()> {
    let fence = Scoped::new(self, self.create_fence(false)?);
    let command_buffers = [command_buffer];
    let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
    unsafe {
      self
        .inner
        .queue_submit(self.queues.graphics, &[submit_info], *fence)?;
    }
    self.wait_for_fence(*fence, u64::MAX)
  }
}

impl SyncDevice for Device {
  fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
    let create_info = vk::SemaphoreCreateInfo::default();
    unsafe { self.inner.create_semaphore(&create_info, None) }
  }

  fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
    unsafe { self.inner.destroy_semaphore(semaphore, None) }
  }

  fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence> {
    let flags = if signaled {
      vk::FenceCreateFlags::SIGNALED
    } else {
      vk::FenceCreateFlags::empty()
    };
    let create_info = vk::FenceCreateInfo::default().flags(flags);
    unsafe { self.inner.create_fence(&create_info, None) }
  }

  fn destroy_fence(&self, fence: vk::Fence) {
    unsafe { self.inner.destroy_fence(fence, None) }
  }

  fn wait_for_fence(&self, fence: vk::Fence, timeout: u64) -> VkResult<()> {
    unsafe { self.inner.wait_for_fences(&[fence], true, timeout) }
  }

  fn reset_fence(&self, fence: vk::Fence) -> VkResult<()> {
    unsafe { self.inner.reset_fences(&[fence]) }
  }

  fn submit_graphics(&self, submission: &FrameSubmission) -> VkResult<()> {
    let wait_semaphores = [submission.wait_semaphore];
    let wait_stages = [submission.wait_stage];
    let command_buffers = [submission.command_buffer];
    let signal_semaphores = [submission.signal_semaphore];
    let submit_info = vk::SubmitInfo::default()
      .wait_semaphores(&wait_semaphores)
      .wait_dst_stage_mask(&wait_stages)
      .command_buffers(&command_buffers)
      .signal_semaphores(&signal_semaphores);
    unsafe {
      self
        .inner
        .queue_submit(self.queues.graphics, &[submit_info], submission.fence)
    }
  }

  fn wait_idle(&self) -> VkResult<()> {
    unsafe { self.inner.device_wait_idle() }
  }
}

impl PresentDevice for Device {
  fn create_swapchain(&self, descriptor: &SwapchainDescriptor) -> VkResult<vk::SwapchainKHR> {
    let mut create_info = vk::SwapchainCreateInfoKHR::default()
      .surface(descriptor.surface)
      .min_image_count(descriptor.min_image_count)
      .image_format(descriptor.format.format)
      .image_color_space(descriptor.format.color_space)
      .image_extent(descriptor.extent)
      .image_array_layers(1)
      .image_usage(descriptor.usage)
      .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
      .pre_transform(descriptor.pre_transform)
      .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
      .present_mode(descriptor.present_mode)
      .clipped(true)
      .old_swapchain(vk::SwapchainKHR::null());

    if let ImageSharing::Concurrent(ref family_indices) = descriptor.sharing {
      create_info = create_info
        .image_sharing_mode(vk::SharingMode::CONCURRENT)
        .queue_family_indices(family_indices);
    }

    unsafe { self.swapchain_loader.create_swapchain(&create_info, None) }
  }

  fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
    unsafe { self.swapchain_loader.destroy_swapchain(swapchain, None) }
  }

  fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
    unsafe { self.swapchain_loader.get_swapchain_images(swapchain) }
  }

  fn create_image_view(&self, image: vk::Image, format: vk::Format) -> VkResult<vk::ImageView> {
    let subresource_range = vk::ImageSubresourceRange {
      aspect_mask: vk::ImageAspectFlags::COLOR,
      base_mip_level: 0,
      level_count: 1,
      base_array_layer: 0,
      layer_count: 1,
    };
    let create_info = vk::ImageViewCreateInfo::default()
      .image(image)
      .view_type(vk::ImageViewType::TYPE_2D)
      .format(format)
      .components(vk::ComponentMapping {
        r: vk::ComponentSwizzle::IDENTITY,
        g: vk::ComponentSwizzle::IDENTITY,
        b: vk::ComponentSwizzle::IDENTITY,
        a: vk::ComponentSwizzle::IDENTITY,
      })
      .subresource_range(subresource_range);
    unsafe { self.inner.create_image_view(&create_info, None) }
  }

  fn destroy_image_view(&self, view: vk::ImageView) {
    unsafe { self.inner.destroy_image_view(view, None) }
  }

  fn acquire_next_image(
    &self,
    swapchain: vk::SwapchainKHR,
    timeout: u64,
    signal: vk::Semaphore,
  ) -> VkResult<(u32, bool)> {
    unsafe {
      self
        .swapchain_loader
        .acquire_next_image(swapchain, timeout, signal, vk::Fence::null())
    }
  }

  fn queue_present(
    &self,
    swapchain: vk::SwapchainKHR,
    image_index: u32,
    wait: vk::Semaphore,
  ) -> VkResult<bool> {
    let wait_semaphores = [wait];
    let swapchains = [swapchain];
    let image_indices = [image_index];
    let present_info = vk::PresentInfoKHR::default()
      .wait_semaphores(&wait_semaphores)
      .swapchains(&swapchains)
      .image_indices(&image_indices);
    unsafe {
      self
        .swapchain_loader
        .queue_present(self.queues.presentation, &present_info)
    }
  }
}

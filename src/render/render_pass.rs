use std::rc::Rc;

use ash::vk;

use crate::utility::const_flag_bitor;

use super::{errors::ResourceCreationError, initialization::device::Device};

// one execution / memory dependency between the subpass and whatever is outside the render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubpassTransition {
  pub src_subpass: u32,
  pub dst_subpass: u32,
  pub src_stage: vk::PipelineStageFlags,
  pub dst_stage: vk::PipelineStageFlags,
  pub src_access: vk::AccessFlags,
  pub dst_access: vk::AccessFlags,
}

impl SubpassTransition {
  pub const fn dependency(&self) -> vk::SubpassDependency {
    vk::SubpassDependency {
      src_subpass: self.src_subpass,
      dst_subpass: self.dst_subpass,
      src_stage_mask: self.src_stage,
      dst_stage_mask: self.dst_stage,
      src_access_mask: self.src_access,
      dst_access_mask: self.dst_access,
      dependency_flags: vk::DependencyFlags::BY_REGION,
    }
  }
}

const COLOR_READ_WRITE: vk::AccessFlags = const_flag_bitor!(vk::AccessFlags =>
  vk::AccessFlags::COLOR_ATTACHMENT_READ,
  vk::AccessFlags::COLOR_ATTACHMENT_WRITE
);

pub const SUBPASS_TRANSITIONS: [SubpassTransition; 2] = [
  // the presentation engine must be done reading the image before the layout transition
  SubpassTransition {
    src_subpass: vk::SUBPASS_EXTERNAL,
    dst_subpass: 0,
    src_stage: vk::PipelineStageFlags::BOTTOM_OF_PIPE,
    dst_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
    src_access: vk::AccessFlags::MEMORY_READ,
    dst_access: COLOR_READ_WRITE,
  },
  // writes finish before the transition to PRESENT_SRC_KHR
  SubpassTransition {
    src_subpass: 0,
    dst_subpass: vk::SUBPASS_EXTERNAL,
    src_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
    dst_stage: vk::PipelineStageFlags::BOTTOM_OF_PIPE,
    src_access: COLOR_READ_WRITE,
    dst_access: vk::AccessFlags::MEMORY_READ,
  },
];

pub struct RenderPass {
  device: Rc<Device>,
  pub handle: vk::RenderPass,
}

impl RenderPass {
  pub fn create(device: Rc<Device>, format: vk::Format) -> Result<Self, ResourceCreationError> {
    let image_attachment = [vk::AttachmentDescription {
      flags: vk::AttachmentDescriptionFlags::empty(),
      format,
      samples: vk::SampleCountFlags::TYPE_1,
      load_op: vk::AttachmentLoadOp::CLEAR,
      store_op: vk::AttachmentStoreOp::STORE,
      stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
      stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
      initial_layout: vk::ImageLayout::UNDEFINED,
      final_layout: vk::ImageLayout::PRESENT_SRC_KHR, // layout after render pass finishes
    }];

    let attachment_ref = [vk::AttachmentReference {
      attachment: 0,
      layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    }];

    let image_subpass = [vk::SubpassDescription::default()
      .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
      .color_attachments(&attachment_ref)];

    let dependencies = SUBPASS_TRANSITIONS.map(|transition| transition.dependency());

    let create_info = vk::RenderPassCreateInfo::default()
      .attachments(&image_attachment)
      .subpasses(&image_subpass)
      .dependencies(&dependencies);
    log::debug!("Creating render pass");
    let handle = unsafe { device.create_render_pass(&create_info, None) }?;
    Ok(Self { device, handle })
  }
}

impl Drop for RenderPass {
  fn drop(&mut self) {
    unsafe {
      self.device.destroy_render_pass(self.handle, None);
    }
  }
}

// one framebuffer per presentable image view
pub struct Framebuffers {
  device: Rc<Device>,
  handles: Box<[vk::Framebuffer]>,
}

impl Framebuffers {
  pub fn create(
    device: Rc<Device>,
    render_pass: &RenderPass,
    image_views: &[vk::ImageView],
    extent: vk::Extent2D,
  ) -> Result<Self, ResourceCreationError> {
    let mut handles = Vec::with_capacity(image_views.len());
    for view in image_views {
      let attachments = [*view];
      let create_info = vk::FramebufferCreateInfo::default()
        .render_pass(render_pass.handle)
        .attachments(&attachments)
        .width(extent.width)
        .height(extent.height)
        .layers(1);
      match unsafe { device.create_framebuffer(&create_info, None) } {
        Ok(framebuffer) => handles.push(framebuffer),
        Err(err) => {
          for &framebuffer in handles.iter() {
            unsafe { device.destroy_framebuffer(framebuffer, None) };
          }
          return Err(err.into());
        }
      }
    }

    Ok(Self {
      device,
      handles: handles.into_boxed_slice(),
    })
  }

  pub fn handles(&self) -> &[vk::Framebuffer] {
    &self.handles
  }
}

impl Drop for Framebuffers {
  fn drop(&mut self) {
    for &framebuffer in self.handles.iter() {
      unsafe { self.device.destroy_framebuffer(framebuffer, None) };
    }
  }
}

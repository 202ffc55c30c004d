use std::rc::Rc;

use ash::vk;

use crate::{
  render::{
    errors::ResourceCreationError,
    initialization::device::Device,
    mesh::Mesh,
    pipeline::GraphicsPipeline,
    render_pass::{Framebuffers, RenderPass},
  },
  utility::OnErr,
};

// Holds one command buffer per presentable image, recorded once and submitted every time the
// image is acquired
pub struct GraphicsCommandPool {
  device: Rc<Device>,
  pool: vk::CommandPool,
  buffers: Box<[vk::CommandBuffer]>,
}

impl GraphicsCommandPool {
  pub fn create(device: Rc<Device>, image_count: usize) -> Result<Self, ResourceCreationError> {
    let pool = super::create_command_pool(
      &device,
      vk::CommandPoolCreateFlags::empty(),
      device.graphics_family,
    )?;
    let buffers = super::allocate_primary_command_buffers(&device, pool, image_count as u32)
      .on_err(|_| unsafe { device.destroy_command_pool(pool, None) })?
      .into_boxed_slice();

    Ok(Self {
      device,
      pool,
      buffers,
    })
  }

  pub fn buffers(&self) -> &[vk::CommandBuffer] {
    &self.buffers
  }

  pub fn record(
    &self,
    render_pass: &RenderPass,
    framebuffers: &Framebuffers,
    extent: vk::Extent2D,
    pipeline: &GraphicsPipeline,
    meshes: &[Mesh<Device>],
    clear_color: [f32; 4],
  ) -> Result<(), ResourceCreationError> {
    let clear_color = vk::ClearColorValue {
      float32: clear_color,
    };
    for (&cb, &framebuffer) in self.buffers.iter().zip(framebuffers.handles()) {
      unsafe {
        self.record_image(
          cb,
          render_pass.handle,
          framebuffer,
          extent,
          pipeline,
          meshes,
          clear_color,
        )?;
      }
    }
    Ok(())
  }

  #[allow(clippy::too_many_arguments)]
  unsafe fn record_image(
    &self,
    cb: vk::CommandBuffer,
    render_pass: vk::RenderPass,
    framebuffer: vk::Framebuffer,
    extent: vk::Extent2D,
    pipeline: &GraphicsPipeline,
    meshes: &[Mesh<Device>],
    clear_color: vk::ClearColorValue,
  ) -> Result<(), vk::Result> {
    let device = &self.device;
    // the same buffer can be pending for one image while being submitted for another frame
    let begin_info =
      vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::SIMULTANEOUS_USE);
    device.begin_command_buffer(cb, &begin_info)?;

    let clear_values = [vk::ClearValue { color: clear_color }];
    let render_pass_begin_info = vk::RenderPassBeginInfo::default()
      .render_pass(render_pass)
      .framebuffer(framebuffer)
      // whole image
      .render_area(vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
      })
      .clear_values(&clear_values);
    device.cmd_begin_render_pass(cb, &render_pass_begin_info, vk::SubpassContents::INLINE);

    device.cmd_bind_pipeline(cb, vk::PipelineBindPoint::GRAPHICS, pipeline.handle);
    for mesh in meshes {
      device.cmd_bind_vertex_buffers(cb, 0, &[mesh.vertex_buffer()], &[0]);
      device.cmd_bind_index_buffer(cb, mesh.index_buffer(), 0, mesh.index_type());
      device.cmd_draw_indexed(cb, mesh.index_count(), 1, 0, 0, 0);
    }

    device.cmd_end_render_pass(cb);
    device.end_command_buffer(cb)
  }
}

impl Drop for GraphicsCommandPool {
  fn drop(&mut self) {
    // also frees the command buffers
    unsafe { self.device.destroy_command_pool(self.pool, None) };
  }
}

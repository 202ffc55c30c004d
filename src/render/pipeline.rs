use std::{marker::PhantomData, ptr, rc::Rc};

use ash::vk;

use super::{
  config::RenderConfig,
  errors::ResourceCreationError,
  initialization::device::Device,
  render_pass::RenderPass,
  shaders::Shader,
  vertex::Vertex,
};

pub struct GraphicsPipeline {
  device: Rc<Device>,
  pub layout: vk::PipelineLayout,
  pub handle: vk::Pipeline,
}

impl GraphicsPipeline {
  pub fn create(
    device: Rc<Device>,
    render_pass: &RenderPass,
    extent: vk::Extent2D,
    config: &RenderConfig,
  ) -> Result<Self, ResourceCreationError> {
    // modules are destroyed at the end of this function
    let shader = Shader::load(&device, config)?;

    // no descriptor sets or push constants
    let layout_create_info = vk::PipelineLayoutCreateInfo::default();
    let layout = unsafe { device.create_pipeline_layout(&layout_create_info, None) }?;

    match Self::create_pipeline(&device, layout, &shader, render_pass.handle, extent) {
      Ok(handle) => {
        drop(shader);
        Ok(Self {
          device,
          layout,
          handle,
        })
      }
      Err(err) => {
        unsafe { device.destroy_pipeline_layout(layout, None) };
        Err(err)
      }
    }
  }

  fn create_pipeline(
    device: &Device,
    layout: vk::PipelineLayout,
    shader: &Shader,
    render_pass: vk::RenderPass,
    extent: vk::Extent2D,
  ) -> Result<vk::Pipeline, ResourceCreationError> {
    let shader_stages = shader.get_pipeline_shader_creation_info();

    let binding_descriptions = [Vertex::get_binding_description(0)];
    let attribute_descriptions = Vertex::get_attribute_descriptions(0);
    let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
      .vertex_binding_descriptions(&binding_descriptions)
      .vertex_attribute_descriptions(&attribute_descriptions);

    let input_assembly_state = triangle_input_assembly_state();

    // full image viewport and scissor
    let viewport = [vk::Viewport {
      x: 0.0,
      y: 0.0,
      width: extent.width as f32,
      height: extent.height as f32,
      min_depth: 0.0,
      max_depth: 1.0,
    }];
    let scissor = [vk::Rect2D {
      offset: vk::Offset2D { x: 0, y: 0 },
      extent,
    }];
    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
      .scissors(&scissor)
      .viewports(&viewport);

    let rasterization_state = no_depth_rasterization_state();
    let multisample_state = no_multisample_state();

    // blending disabled, fragment color is written as is
    let attachment_state = [vk::PipelineColorBlendAttachmentState {
      blend_enable: vk::FALSE,
      color_write_mask: vk::ColorComponentFlags::RGBA,
      src_color_blend_factor: vk::BlendFactor::ONE,
      dst_color_blend_factor: vk::BlendFactor::ZERO,
      color_blend_op: vk::BlendOp::ADD,
      src_alpha_blend_factor: vk::BlendFactor::ONE,
      dst_alpha_blend_factor: vk::BlendFactor::ZERO,
      alpha_blend_op: vk::BlendOp::ADD,
    }];
    let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
      .logic_op_enable(false)
      .logic_op(vk::LogicOp::COPY) // disabled
      .attachments(&attachment_state);

    let create_info = vk::GraphicsPipelineCreateInfo::default()
      .stages(&shader_stages)
      .vertex_input_state(&vertex_input_state)
      .input_assembly_state(&input_assembly_state)
      .viewport_state(&viewport_state)
      .rasterization_state(&rasterization_state)
      .multisample_state(&multisample_state)
      .color_blend_state(&color_blend_state)
      .layout(layout)
      .render_pass(render_pass)
      .subpass(0)
      .base_pipeline_index(-1); // -1 for null

    log::debug!("Creating graphics pipeline");
    let pipelines = unsafe {
      device.create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
    }
    .map_err(|(_, vkerr)| ResourceCreationError::from(vkerr))?;
    pipelines
      .first()
      .copied()
      .ok_or(ResourceCreationError::Unexpected(vk::Result::INCOMPLETE))
  }
}

impl Drop for GraphicsPipeline {
  fn drop(&mut self) {
    unsafe {
      self.device.destroy_pipeline(self.handle, None);
      self.device.destroy_pipeline_layout(self.layout, None);
    }
  }
}

const fn triangle_input_assembly_state<'a>() -> vk::PipelineInputAssemblyStateCreateInfo<'a> {
  vk::PipelineInputAssemblyStateCreateInfo {
    s_type: vk::StructureType::PIPELINE_INPUT_ASSEMBLY_STATE_CREATE_INFO,
    flags: vk::PipelineInputAssemblyStateCreateFlags::empty(),
    p_next: ptr::null(),
    primitive_restart_enable: vk::FALSE,
    topology: vk::PrimitiveTopology::TRIANGLE_LIST,
    _marker: PhantomData,
  }
}

// rasterization with no depth and no culling
const fn no_depth_rasterization_state<'a>() -> vk::PipelineRasterizationStateCreateInfo<'a> {
  vk::PipelineRasterizationStateCreateInfo {
    s_type: vk::StructureType::PIPELINE_RASTERIZATION_STATE_CREATE_INFO,
    p_next: ptr::null(),
    flags: vk::PipelineRasterizationStateCreateFlags::empty(),
    depth_clamp_enable: vk::FALSE,
    cull_mode: vk::CullModeFlags::NONE,
    front_face: vk::FrontFace::CLOCKWISE, // doesn't matter if cull_mode is none
    line_width: 1.0,
    polygon_mode: vk::PolygonMode::FILL,
    rasterizer_discard_enable: vk::FALSE,
    depth_bias_clamp: 0.0,
    depth_bias_constant_factor: 0.0,
    depth_bias_enable: vk::FALSE,
    depth_bias_slope_factor: 0.0,
    _marker: PhantomData,
  }
}

const fn no_multisample_state<'a>() -> vk::PipelineMultisampleStateCreateInfo<'a> {
  // everything off
  vk::PipelineMultisampleStateCreateInfo {
    s_type: vk::StructureType::PIPELINE_MULTISAMPLE_STATE_CREATE_INFO,
    flags: vk::PipelineMultisampleStateCreateFlags::empty(),
    p_next: ptr::null(),
    rasterization_samples: vk::SampleCountFlags::TYPE_1,
    sample_shading_enable: vk::FALSE,
    min_sample_shading: 0.0,
    p_sample_mask: ptr::null(),
    alpha_to_one_enable: vk::FALSE,
    alpha_to_coverage_enable: vk::FALSE,
    _marker: PhantomData,
  }
}

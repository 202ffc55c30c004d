use std::{ffi::CStr, path::PathBuf};

use ash::vk;

use crate::render::FRAMES_IN_FLIGHT;

// Validation layer setup, handed to instance creation.
#[derive(Debug, Clone)]
pub struct DiagnosticsConfig {
  pub validation: bool,
  pub layers: Vec<&'static CStr>,
  pub message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
  pub message_type: vk::DebugUtilsMessageTypeFlagsEXT,
}

impl Default for DiagnosticsConfig {
  fn default() -> Self {
    Self {
      validation: cfg!(feature = "vl"),
      layers: vec![c"VK_LAYER_KHRONOS_validation"],
      message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
      message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
        | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
        | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
    }
  }
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
  pub vertex_shader: PathBuf,
  pub fragment_shader: PathBuf,
  // rgba
  pub clear_color: [f32; 4],
  pub frames_in_flight: usize,
  pub diagnostics: DiagnosticsConfig,
}

impl Default for RenderConfig {
  fn default() -> Self {
    Self {
      vertex_shader: PathBuf::from("./shaders/vert.spv"),
      fragment_shader: PathBuf::from("./shaders/frag.spv"),
      clear_color: [0.0, 0.0, 0.0, 1.0],
      frames_in_flight: FRAMES_IN_FLIGHT,
      diagnostics: DiagnosticsConfig::default(),
    }
  }
}

use ash::vk;
use raw_window_handle::HandleError;

use super::{shaders::ShaderError, upload::GeometryUsage};

pub fn error_chain_fmt(
  e: &impl std::error::Error,
  f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
  writeln!(f, "{}\nCauses:", e)?;
  let mut current = e.source();
  while let Some(cause) = current {
    writeln!(f, "  {}", cause)?;
    current = cause.source();
  }
  Ok(())
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutOfMemoryError {
  #[error("Out of Device Memory")]
  OutOfDeviceMemory,
  #[error("Out of host memory")]
  OutOfHostMemory,
}

impl OutOfMemoryError {
  pub fn from_result(value: vk::Result) -> Option<Self> {
    match value {
      vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => Some(OutOfMemoryError::OutOfDeviceMemory),
      vk::Result::ERROR_OUT_OF_HOST_MEMORY => Some(OutOfMemoryError::OutOfHostMemory),
      _ => None,
    }
  }
}

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
  #[error("Out of memory")]
  OutOfMemory(#[source] OutOfMemoryError),
  #[error("Surface is lost")]
  SurfaceIsLost,
  #[error("Surface query failed")]
  Other(#[source] vk::Result),
}

impl From<vk::Result> for SurfaceError {
  fn from(value: vk::Result) -> Self {
    if let Some(oom) = OutOfMemoryError::from_result(value) {
      return SurfaceError::OutOfMemory(oom);
    }
    match value {
      vk::Result::ERROR_SURFACE_LOST_KHR => SurfaceError::SurfaceIsLost,
      other => SurfaceError::Other(other),
    }
  }
}

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
  #[error("OS error")]
  OsError(#[source] winit::error::OsError),
  #[error("Failed to get handle")]
  HandleError(#[source] HandleError),
}

#[derive(thiserror::Error)]
pub enum InitializationError {
  #[error("Failed to load the Vulkan library: {0}")]
  LibraryLoadFailed(String),

  #[error("Vulkan implementation supports API {supported} but the application targets {targeted}")]
  UnsupportedApiVersion { supported: String, targeted: String },

  #[error("Instance creation failed")]
  InstanceCreationFailed(#[source] vk::Result),

  #[error("Some Instance extensions are strictly required but unavailable: {0:?}")]
  MissingInstanceExtensions(Vec<String>),

  #[error("Some requested validation layers are unavailable: {0:?}")]
  MissingValidationLayers(Vec<String>),

  #[error("Failed to create the debug messenger")]
  DebugMessengerCreationFailed(#[source] vk::Result),

  #[error("Window error")]
  WindowError(#[source] WindowError),

  #[error("Failed to create a window surface")]
  SurfaceCreationFailed(#[source] vk::Result),

  #[error("Failed to enumerate physical devices")]
  DeviceEnumerationFailed(#[source] vk::Result),

  #[error("No physical device supports the application")]
  NoSuitableDevice,

  #[error("Failed to create the logical device")]
  LogicalDeviceCreationFailed(#[source] vk::Result),

  #[error("Failed to create a required resource")]
  ResourceCreationFailed(#[source] ResourceCreationError),
}
impl std::fmt::Debug for InitializationError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    error_chain_fmt(self, f)
  }
}

impl From<winit::error::OsError> for InitializationError {
  fn from(value: winit::error::OsError) -> Self {
    InitializationError::WindowError(WindowError::OsError(value))
  }
}

impl From<HandleError> for InitializationError {
  fn from(value: HandleError) -> Self {
    InitializationError::WindowError(WindowError::HandleError(value))
  }
}

impl From<ResourceCreationError> for InitializationError {
  fn from(value: ResourceCreationError) -> Self {
    InitializationError::ResourceCreationFailed(value)
  }
}

#[derive(thiserror::Error)]
pub enum ResourceCreationError {
  #[error("Not enough memory")]
  OutOfMemory(#[source] OutOfMemoryError),

  #[error("No memory type supports the required properties {required:?}")]
  NoCompatibleMemoryType { required: vk::MemoryPropertyFlags },

  #[error("Cannot upload {len} bytes as elements of {stride} bytes")]
  InvalidUploadSize { len: usize, stride: usize },

  #[error("Memory map failed: The application was unable to map the required memory")]
  MemoryMapFailed,

  #[error("Device copy of {0:?} data differs from the uploaded bytes")]
  ReadBackMismatch(GeometryUsage),

  #[error("One-shot transfer did not complete")]
  TransferFailed(#[source] vk::Result),

  #[error("Shader error")]
  ShaderFailed(#[source] ShaderError),

  // undefined behavior / driver or application bug (see vl)
  #[error("Device is lost")]
  DeviceLost,

  #[error("Driver returned an unexpected result")]
  Unexpected(#[source] vk::Result),
}
impl std::fmt::Debug for ResourceCreationError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    error_chain_fmt(self, f)
  }
}

impl From<vk::Result> for ResourceCreationError {
  fn from(value: vk::Result) -> Self {
    if let Some(oom) = OutOfMemoryError::from_result(value) {
      return ResourceCreationError::OutOfMemory(oom);
    }
    match value {
      vk::Result::ERROR_MEMORY_MAP_FAILED => ResourceCreationError::MemoryMapFailed,
      vk::Result::ERROR_DEVICE_LOST => ResourceCreationError::DeviceLost,
      other => {
        log::error!("Resource creation returned {:?}", other);
        ResourceCreationError::Unexpected(other)
      }
    }
  }
}

impl From<ShaderError> for ResourceCreationError {
  fn from(value: ShaderError) -> Self {
    ResourceCreationError::ShaderFailed(value)
  }
}

// VK_ERROR_OUT_OF_DATE_KHR is reported like any other failure, the chain is never recreated
#[derive(thiserror::Error)]
pub enum DeviceSubmissionError {
  #[error("Failed to wait for frame slot {slot}")]
  SlotWaitFailed {
    slot: usize,
    #[source]
    result: vk::Result,
  },

  #[error("Failed to reset the availability fence of frame slot {slot}")]
  SlotResetFailed {
    slot: usize,
    #[source]
    result: vk::Result,
  },

  #[error("Failed to acquire the next presentable image")]
  AcquireFailed(#[source] vk::Result),

  #[error("No command buffer was recorded for presentable image {image_index}")]
  MissingCommandBuffer { image_index: u32 },

  #[error("Failed to submit frame work to the graphics queue")]
  SubmitFailed(#[source] vk::Result),

  #[error("Failed to present image {image_index}")]
  PresentFailed {
    image_index: u32,
    #[source]
    result: vk::Result,
  },

  #[error("Failed to wait for the device to become idle")]
  WaitIdleFailed(#[source] vk::Result),
}
impl std::fmt::Debug for DeviceSubmissionError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    error_chain_fmt(self, f)
  }
}

mod command_pools;
mod config;
mod device_api;
mod device_destroyable;
mod errors;
mod frame;
mod frame_pacer;
mod initialization;
mod mesh;
mod pipeline;
mod render_loop;
mod render_pass;
mod renderer;
mod shaders;
mod swapchain;
mod upload;
mod vertex;

#[cfg(test)]
pub(crate) mod testing;

use std::ffi::CStr;

use ash::vk;

pub use config::RenderConfig;
pub use errors::{error_chain_fmt, DeviceSubmissionError, InitializationError};
pub use renderer::Renderer;

// Vulkan API version required to run the program
pub const TARGET_API_VERSION: u32 = vk::API_VERSION_1_2;

pub const REQUIRED_DEVICE_EXTENSIONS: [&CStr; 1] = [ash::khr::swapchain::NAME];

// number of frames that can be recorded or executing at the same time
pub const FRAMES_IN_FLIGHT: usize = 2;

// acquire is throttled by the frame fences, so it is allowed to wait forever
pub const ACQUIRE_TIMEOUT: u64 = u64::MAX;

// used when the surface accepts any format
pub const PREFERRED_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
  format: vk::Format::R8G8B8A8_UNORM,
  color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

// FIFO is the fallback, as it is required to be supported
pub const PREFERRED_PRESENT_MODE: vk::PresentModeKHR = vk::PresentModeKHR::MAILBOX;

mod app;
mod render;
mod utility;

use std::{ffi::CStr, process::ExitCode};

use ash::vk;
use winit::event_loop::{ControlFlow, EventLoop};

use app::App;
use render::RenderConfig;

pub const APPLICATION_NAME: &CStr = c"Vulkan App";
pub const APPLICATION_VERSION: u32 = vk::make_api_version(0, 1, 0, 0);

pub const WINDOW_TITLE: &str = "Vulkan";
pub const WINDOW_WIDTH: u32 = 800;
pub const WINDOW_HEIGHT: u32 = 600;

fn main() -> ExitCode {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  let event_loop = match EventLoop::new() {
    Ok(event_loop) => event_loop,
    Err(err) => {
      log::error!("Failed to create event loop: {}", err);
      return ExitCode::FAILURE;
    }
  };
  event_loop.set_control_flow(ControlFlow::Poll);

  let mut app = App::new(RenderConfig::default());
  if let Err(err) = event_loop.run_app(&mut app) {
    log::error!("Event loop error: {}", err);
    return ExitCode::FAILURE;
  }

  match app.take_error() {
    Some(err) => {
      log::error!("{:?}", err);
      ExitCode::FAILURE
    }
    None => ExitCode::SUCCESS,
  }
}

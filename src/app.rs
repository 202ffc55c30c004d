use winit::{
  application::ApplicationHandler,
  dpi::PhysicalSize,
  event::WindowEvent,
  event_loop::ActiveEventLoop,
  window::{Window, WindowId},
};

use crate::{
  render::{error_chain_fmt, DeviceSubmissionError, InitializationError, RenderConfig, Renderer},
  WINDOW_HEIGHT, WINDOW_TITLE, WINDOW_WIDTH,
};

#[derive(thiserror::Error)]
pub enum AppError {
  #[error("Failed to initialize")]
  Initialization(#[source] InitializationError),
  #[error("Failed to render a frame")]
  Frame(#[source] DeviceSubmissionError),
}
impl std::fmt::Debug for AppError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    error_chain_fmt(self, f)
  }
}

pub struct App {
  config: RenderConfig,
  // dropped before the window
  renderer: Option<Renderer>,
  window: Option<Window>,
  error: Option<AppError>,
}

impl App {
  pub fn new(config: RenderConfig) -> Self {
    Self {
      config,
      renderer: None,
      window: None,
      error: None,
    }
  }

  // error that stopped the event loop, if any
  pub fn take_error(&mut self) -> Option<AppError> {
    self.error.take()
  }

  fn fail(&mut self, event_loop: &ActiveEventLoop, error: AppError) {
    self.error = Some(error);
    event_loop.exit();
  }

  fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), InitializationError> {
    let attributes = Window::default_attributes()
      .with_title(WINDOW_TITLE)
      .with_inner_size(PhysicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT))
      .with_resizable(false);
    let window = event_loop.create_window(attributes)?;

    let renderer = Renderer::new(&window, &self.config)?;
    log::info!("Initialization complete");

    self.renderer = Some(renderer);
    self.window = Some(window);
    Ok(())
  }
}

impl ApplicationHandler for App {
  fn resumed(&mut self, event_loop: &ActiveEventLoop) {
    if self.window.is_some() {
      return;
    }
    if let Err(err) = self.init(event_loop) {
      self.fail(event_loop, AppError::Initialization(err));
    }
  }

  fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
    match event {
      WindowEvent::CloseRequested => {
        log::info!("Close requested");
        event_loop.exit();
      }
      WindowEvent::RedrawRequested => {
        if let Some(renderer) = self.renderer.as_mut() {
          if let Err(err) = renderer.draw_frame() {
            self.fail(event_loop, AppError::Frame(err));
          }
        }
      }
      _ => {}
    }
  }

  fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
    if let Some(window) = self.window.as_ref() {
      window.request_redraw();
    }
  }

  fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
    // waits for the device and releases every Vulkan object while the window still exists
    self.renderer = None;
  }
}

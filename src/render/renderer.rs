use std::rc::Rc;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::window::Window;

use super::{
  command_pools::GraphicsCommandPool,
  config::RenderConfig,
  errors::{DeviceSubmissionError, InitializationError, ResourceCreationError},
  initialization::{
    self,
    device::{self as device_selection, Device},
    DebugUtils, Instance, Surface,
  },
  mesh::Mesh,
  pipeline::GraphicsPipeline,
  render_loop::RenderLoopDriver,
  render_pass::{Framebuffers, RenderPass},
  swapchain::PresentationChain,
  upload::TransferUploader,
  vertex::Vertex,
  REQUIRED_DEVICE_EXTENSIONS,
};

// two quads, drawn with the same index list
const LEFT_QUAD: [Vertex; 4] = [
  Vertex::new([-0.1, -0.4, 0.0], [1.0, 0.0, 0.0]),
  Vertex::new([-0.1, 0.4, 0.0], [0.0, 1.0, 0.0]),
  Vertex::new([-0.9, 0.4, 0.0], [0.0, 0.0, 1.0]),
  Vertex::new([-0.9, -0.4, 0.0], [1.0, 1.0, 0.0]),
];
const RIGHT_QUAD: [Vertex; 4] = [
  Vertex::new([0.9, -0.3, 0.0], [1.0, 0.0, 0.0]),
  Vertex::new([0.9, 0.1, 0.0], [0.0, 1.0, 0.0]),
  Vertex::new([0.1, 0.3, 0.0], [0.0, 0.0, 1.0]),
  Vertex::new([0.1, -0.3, 0.0], [1.0, 1.0, 0.0]),
];
const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

// Fields are dropped in declaration order, so everything that depends on an object has to be
// declared before it. The driver goes first: dropping it waits for the device to become idle.
pub struct Renderer {
  driver: RenderLoopDriver<Device>,
  command_pool: GraphicsCommandPool,
  _meshes: Vec<Mesh<Device>>,
  _framebuffers: Framebuffers,
  _pipeline: GraphicsPipeline,
  _render_pass: RenderPass,
  chain: PresentationChain<Device>,
  _device: Rc<Device>,
  _surface: Surface,
  _debug_utils: Option<DebugUtils>,
  _instance: Instance,
}

impl Renderer {
  pub fn new(window: &Window, config: &RenderConfig) -> Result<Self, InitializationError> {
    let entry = initialization::get_entry()?;
    let display_handle = window.display_handle()?.as_raw();
    let window_handle = window.window_handle()?.as_raw();

    let instance = Instance::create(entry, display_handle, &config.diagnostics)?;
    let debug_utils = if config.diagnostics.validation {
      log::info!("Enabling validation layers");
      Some(DebugUtils::create(
        instance.entry(),
        &instance,
        &config.diagnostics,
      )?)
    } else {
      None
    };
    let surface = Surface::create(&instance, display_handle, window_handle)?;

    let physical_devices = instance.enumerate_physical_devices()?;
    let selection = device_selection::select_device(
      &surface.probe(&instance),
      &physical_devices,
      &REQUIRED_DEVICE_EXTENSIONS,
    )?;
    let device = Rc::new(Device::create(&instance, &selection)?);

    let capabilities = &selection.surface.capabilities;
    let format = device_selection::choose_surface_format(&selection.surface.formats);
    let present_mode = device_selection::choose_present_mode(&selection.surface.present_modes);
    let window_size = window.inner_size();
    let extent = device_selection::choose_extent(
      capabilities,
      vk::Extent2D {
        width: window_size.width,
        height: window_size.height,
      },
    );

    let chain = PresentationChain::create(
      Rc::clone(&device),
      *surface,
      capabilities,
      format,
      extent,
      present_mode,
      device.graphics_family,
      device.presentation_family,
    )?;

    let render_pass = RenderPass::create(Rc::clone(&device), chain.format().format)?;
    let pipeline =
      GraphicsPipeline::create(Rc::clone(&device), &render_pass, chain.extent(), config)?;
    let framebuffers = Framebuffers::create(
      Rc::clone(&device),
      &render_pass,
      chain.image_views(),
      chain.extent(),
    )?;

    let uploader = TransferUploader::new(Rc::clone(&device));
    let meshes = load_meshes(&uploader)?;
    log::info!(
      "Uploaded {} meshes ({} vertices)",
      meshes.len(),
      meshes.iter().map(|mesh| mesh.vertex_count()).sum::<u32>()
    );

    let command_pool = GraphicsCommandPool::create(Rc::clone(&device), chain.image_count())?;
    command_pool.record(
      &render_pass,
      &framebuffers,
      chain.extent(),
      &pipeline,
      &meshes,
      config.clear_color,
    )?;

    let driver = RenderLoopDriver::new(Rc::clone(&device), config.frames_in_flight)?;

    Ok(Self {
      driver,
      command_pool,
      _meshes: meshes,
      _framebuffers: framebuffers,
      _pipeline: pipeline,
      _render_pass: render_pass,
      chain,
      _device: device,
      _surface: surface,
      _debug_utils: debug_utils,
      _instance: instance,
    })
  }

  pub fn draw_frame(&mut self) -> Result<(), DeviceSubmissionError> {
    self
      .driver
      .draw_frame(&self.chain, self.command_pool.buffers())?;
    Ok(())
  }
}

fn load_meshes(
  uploader: &TransferUploader<Device>,
) -> Result<Vec<Mesh<Device>>, ResourceCreationError> {
  let sources: [&[Vertex]; 2] = [&LEFT_QUAD, &RIGHT_QUAD];

  let mut meshes = Vec::with_capacity(sources.len());
  for vertices in sources {
    let mesh = Mesh::new(uploader, vertices, &QUAD_INDICES)?;

    #[cfg(debug_assertions)]
    mesh.verify(uploader, vertices, &QUAD_INDICES)?;

    meshes.push(mesh);
  }
  Ok(meshes)
}

// Traits the frame-loop core is written against. `initialization::device::Device` implements all
// of them on top of ash and tests use an in-memory double. Handles are raw `vk` handles, owned by
// the types that create them (see device_destroyable).

use ash::{prelude::VkResult, vk};

// Buffer, memory and one-shot transfer operations.
pub trait BufferDevice {
  fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties;

  fn create_buffer(
    &self,
    size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
  ) -> VkResult<vk::Buffer>;
  fn destroy_buffer(&self, buffer: vk::Buffer);
  fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements;

  fn allocate_memory(
    &self,
    size: vk::DeviceSize,
    memory_type_index: u32,
  ) -> VkResult<vk::DeviceMemory>;
  fn free_memory(&self, memory: vk::DeviceMemory);
  fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: vk::DeviceMemory) -> VkResult<()>;

  // Maps `memory`, copies `bytes` to its start and unmaps it.
  // Memory must be host visible and host coherent.
  fn write_memory(&self, memory: vk::DeviceMemory, bytes: &[u8]) -> VkResult<()>;
  // Maps `memory` and copies its first `size` bytes out.
  fn read_memory(&self, memory: vk::DeviceMemory, size: vk::DeviceSize) -> VkResult<Vec<u8>>;

  fn allocate_transfer_command_buffer(&self) -> VkResult<vk::CommandBuffer>;
  fn free_transfer_command_buffer(&self, command_buffer: vk::CommandBuffer);
  // Records a single full-range `src -> dst` copy into a one-time-submit command buffer.
  fn record_buffer_copy(
    &self,
    command_buffer: vk::CommandBuffer,
    src: vk::Buffer,
    dst: vk::Buffer,
    size: vk::DeviceSize,
  ) -> VkResult<()>;
  // Submits to the transfer queue and blocks until the work has completed.
  fn submit_transfer_and_wait(&self, command_buffer: vk::CommandBuffer) -> VkResult<()>;
}

// One graphics queue submission of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSubmission {
  pub command_buffer: vk::CommandBuffer,
  pub wait_semaphore: vk::Semaphore,
  pub wait_stage: vk::PipelineStageFlags,
  pub signal_semaphore: vk::Semaphore,
  pub fence: vk::Fence,
}

// Synchronization primitives and graphics submission.
pub trait SyncDevice {
  fn create_semaphore(&self) -> VkResult<vk::Semaphore>;
  fn destroy_semaphore(&self, semaphore: vk::Semaphore);
  fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence>;
  fn destroy_fence(&self, fence: vk::Fence);

  // Returns `Err(vk::Result::TIMEOUT)` if `fence` was not signaled within `timeout` ns.
  fn wait_for_fence(&self, fence: vk::Fence, timeout: u64) -> VkResult<()>;
  fn reset_fence(&self, fence: vk::Fence) -> VkResult<()>;

  fn submit_graphics(&self, submission: &FrameSubmission) -> VkResult<()>;
  fn wait_idle(&self) -> VkResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSharing {
  Exclusive,
  // [graphics, presentation]
  Concurrent([u32; 2]),
}

#[derive(Debug, Clone, Copy)]
pub struct SwapchainDescriptor {
  pub surface: vk::SurfaceKHR,
  pub min_image_count: u32,
  pub format: vk::SurfaceFormatKHR,
  pub extent: vk::Extent2D,
  pub usage: vk::ImageUsageFlags,
  pub sharing: ImageSharing,
  pub pre_transform: vk::SurfaceTransformFlagsKHR,
  pub present_mode: vk::PresentModeKHR,
}

// Swapchain and presentation operations.
pub trait PresentDevice {
  fn create_swapchain(&self, descriptor: &SwapchainDescriptor) -> VkResult<vk::SwapchainKHR>;
  fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);
  fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>>;

  // 2D, single mip level and array layer, color aspect, identity swizzle.
  fn create_image_view(&self, image: vk::Image, format: vk::Format) -> VkResult<vk::ImageView>;
  fn destroy_image_view(&self, view: vk::ImageView);

  // Returns the image index and whether the swapchain is suboptimal.
  fn acquire_next_image(
    &self,
    swapchain: vk::SwapchainKHR,
    timeout: u64,
    signal: vk::Semaphore,
  ) -> VkResult<(u32, bool)>;
  // Returns whether the swapchain is suboptimal.
  fn queue_present(
    &self,
    swapchain: vk::SwapchainKHR,
    image_index: u32,
    wait: vk::Semaphore,
  ) -> VkResult<bool>;
}

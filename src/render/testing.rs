// In-memory device used by the unit tests.
//
// Buffers and memory are plain byte vectors, command buffers only remember the copy recorded in
// them and queue submissions complete immediately unless `auto_complete` is turned off, in which
// case fences stay unsignaled until `signal_fence` or `wait_idle`.
// Misuse that a real driver would reject (wrong semaphore state, missing buffer usage, mapping
// device local memory) panics so that the test fails at the offending call.

use std::{
  cell::{Cell, RefCell},
  collections::{HashMap, HashSet},
};

use ash::{
  prelude::VkResult,
  vk::{self, Handle},
};

use super::device_api::{
  BufferDevice, FrameSubmission, PresentDevice, SwapchainDescriptor, SyncDevice,
};

pub const HOST_MEMORY_TYPE: u32 = 0;
pub const DEVICE_MEMORY_TYPE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockCall {
  CreateBuffer,
  AllocateMemory,
  BindBufferMemory,
  WriteMemory,
  AllocateCommandBuffer,
  RecordCopy,
  SubmitTransfer,
  CreateSemaphore,
  CreateFence,
  WaitForFence,
  ResetFence,
  SubmitGraphics,
  CreateSwapchain,
  CreateImageView,
  AcquireNextImage,
  QueuePresent,
}

#[derive(Debug, Clone, Copy)]
struct Failure {
  call: MockCall,
  // 0 based index of the call that fails
  nth: usize,
  result: vk::Result,
}

#[derive(Debug)]
struct MockBuffer {
  size: vk::DeviceSize,
  usage: vk::BufferUsageFlags,
  memory: Option<u64>,
}

#[derive(Debug)]
struct MockMemory {
  type_index: u32,
  bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
struct BufferCopy {
  src: u64,
  dst: u64,
  size: vk::DeviceSize,
}

#[derive(Debug)]
struct MockSwapchain {
  images: Vec<vk::Image>,
  next_image: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentRecord {
  pub image_index: u32,
  pub wait_semaphore: vk::Semaphore,
}

#[derive(Default)]
struct State {
  next_handle: u64,
  call_counts: HashMap<MockCall, usize>,
  failures: Vec<Failure>,

  buffers: HashMap<u64, MockBuffer>,
  memories: HashMap<u64, MockMemory>,
  command_buffers: HashMap<u64, Option<BufferCopy>>,
  semaphores: HashMap<u64, bool>,
  fences: HashMap<u64, bool>,
  swapchains: HashMap<u64, MockSwapchain>,
  image_views: HashSet<u64>,

  swapchain_descriptors: Vec<SwapchainDescriptor>,
  submissions: Vec<FrameSubmission>,
  presents: Vec<PresentRecord>,
  transfer_submissions: usize,
  idle_waits: usize,
}

impl State {
  fn new_handle(&mut self) -> u64 {
    self.next_handle += 1;
    self.next_handle
  }

  fn check(&mut self, call: MockCall) -> VkResult<()> {
    let count = self.call_counts.entry(call).or_insert(0);
    let current = *count;
    *count += 1;
    match self
      .failures
      .iter()
      .find(|f| f.call == call && f.nth == current)
    {
      Some(failure) => Err(failure.result),
      None => Ok(()),
    }
  }

  fn memory_of(&self, buffer: u64) -> u64 {
    match self.buffers.get(&buffer).and_then(|b| b.memory) {
      Some(memory) => memory,
      None => panic!("buffer {buffer} has no bound memory"),
    }
  }
}

pub struct MockDevice {
  state: RefCell<State>,
  memory_properties: vk::PhysicalDeviceMemoryProperties,
  // number of images the swapchain returns, None means the requested minimum
  swapchain_image_count: Cell<Option<u32>>,
  pub auto_complete: Cell<bool>,
}

impl MockDevice {
  pub fn new() -> Self {
    let mut memory_properties = vk::PhysicalDeviceMemoryProperties {
      memory_type_count: 2,
      memory_heap_count: 1,
      ..Default::default()
    };
    memory_properties.memory_types[HOST_MEMORY_TYPE as usize] = vk::MemoryType {
      property_flags: vk::MemoryPropertyFlags::HOST_VISIBLE
        | vk::MemoryPropertyFlags::HOST_COHERENT,
      heap_index: 0,
    };
    memory_properties.memory_types[DEVICE_MEMORY_TYPE as usize] = vk::MemoryType {
      property_flags: vk::MemoryPropertyFlags::DEVICE_LOCAL,
      heap_index: 0,
    };
    memory_properties.memory_heaps[0] = vk::MemoryHeap {
      size: 1 << 30,
      flags: vk::MemoryHeapFlags::DEVICE_LOCAL,
    };

    Self::with_memory_properties(memory_properties)
  }

  pub fn with_memory_properties(memory_properties: vk::PhysicalDeviceMemoryProperties) -> Self {
    Self {
      state: RefCell::new(State::default()),
      memory_properties,
      swapchain_image_count: Cell::new(None),
      auto_complete: Cell::new(true),
    }
  }

  pub fn with_swapchain_images(self, count: u32) -> Self {
    self.swapchain_image_count.set(Some(count));
    self
  }

  pub fn fail_on(&self, call: MockCall, nth: usize, result: vk::Result) {
    self
      .state
      .borrow_mut()
      .failures
      .push(Failure { call, nth, result });
  }

  pub fn live_objects(&self) -> usize {
    let state = self.state.borrow();
    state.buffers.len()
      + state.memories.len()
      + state.command_buffers.len()
      + state.semaphores.len()
      + state.fences.len()
      + state.swapchains.len()
      + state.image_views.len()
  }

  pub fn live_buffers(&self) -> usize {
    self.state.borrow().buffers.len()
  }

  pub fn live_image_views(&self) -> usize {
    self.state.borrow().image_views.len()
  }

  pub fn is_fence_signaled(&self, fence: vk::Fence) -> bool {
    self.state.borrow().fences.get(&fence.as_raw()) == Some(&true)
  }

  pub fn signal_fence(&self, fence: vk::Fence) {
    match self.state.borrow_mut().fences.get_mut(&fence.as_raw()) {
      Some(signaled) => *signaled = true,
      None => panic!("signaling unknown fence {:?}", fence),
    }
  }

  pub fn buffer_usage(&self, buffer: vk::Buffer) -> Option<vk::BufferUsageFlags> {
    self
      .state
      .borrow()
      .buffers
      .get(&buffer.as_raw())
      .map(|b| b.usage)
  }

  pub fn buffer_memory_type(&self, buffer: vk::Buffer) -> Option<u32> {
    let state = self.state.borrow();
    let memory = state.buffers.get(&buffer.as_raw())?.memory?;
    state.memories.get(&memory).map(|m| m.type_index)
  }

  pub fn swapchain_descriptors(&self) -> Vec<SwapchainDescriptor> {
    self.state.borrow().swapchain_descriptors.clone()
  }

  pub fn submissions(&self) -> Vec<FrameSubmission> {
    self.state.borrow().submissions.clone()
  }

  pub fn presents(&self) -> Vec<PresentRecord> {
    self.state.borrow().presents.clone()
  }

  pub fn transfer_submissions(&self) -> usize {
    self.state.borrow().transfer_submissions
  }

  pub fn idle_waits(&self) -> usize {
    self.state.borrow().idle_waits
  }
}

impl BufferDevice for MockDevice {
  fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
    &self.memory_properties
  }

  fn create_buffer(
    &self,
    size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
  ) -> VkResult<vk::Buffer> {
    let mut state = self.state.borrow_mut();
    state.check(MockCall::CreateBuffer)?;
    assert!(size > 0, "zero sized buffer");
    let handle = state.new_handle();
    state.buffers.insert(
      handle,
      MockBuffer {
        size,
        usage,
        memory: None,
      },
    );
    Ok(vk::Buffer::from_raw(handle))
  }

  fn destroy_buffer(&self, buffer: vk::Buffer) {
    let removed = self.state.borrow_mut().buffers.remove(&buffer.as_raw());
    assert!(removed.is_some(), "double destroy of {:?}", buffer);
  }

  fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
    let state = self.state.borrow();
    let size = state.buffers[&buffer.as_raw()].size;
    vk::MemoryRequirements {
      size,
      alignment: 4,
      memory_type_bits: (1 << self.memory_properties.memory_type_count) - 1,
    }
  }

  fn allocate_memory(
    &self,
    size: vk::DeviceSize,
    memory_type_index: u32,
  ) -> VkResult<vk::DeviceMemory> {
    let mut state = self.state.borrow_mut();
    state.check(MockCall::AllocateMemory)?;
    assert!(memory_type_index < self.memory_properties.memory_type_count);
    let handle = state.new_handle();
    state.memories.insert(
      handle,
      MockMemory {
        type_index: memory_type_index,
        bytes: vec![0; size as usize],
      },
    );
    Ok(vk::DeviceMemory::from_raw(handle))
  }

  fn free_memory(&self, memory: vk::DeviceMemory) {
    let mut state = self.state.borrow_mut();
    assert!(
      !state
        .buffers
        .values()
        .any(|b| b.memory == Some(memory.as_raw())),
      "memory {:?} freed while a buffer is still bound to it",
      memory
    );
    let removed = state.memories.remove(&memory.as_raw());
    assert!(removed.is_some(), "double free of {:?}", memory);
  }

  fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: vk::DeviceMemory) -> VkResult<()> {
    let mut state = self.state.borrow_mut();
    state.check(MockCall::BindBufferMemory)?;
    let memory_size = state.memories[&memory.as_raw()].bytes.len() as vk::DeviceSize;
    let buffer = state
      .buffers
      .get_mut(&buffer.as_raw())
      .expect("binding unknown buffer");
    assert!(buffer.memory.is_none());
    assert!(buffer.size <= memory_size);
    buffer.memory = Some(memory.as_raw());
    Ok(())
  }

  fn write_memory(&self, memory: vk::DeviceMemory, bytes: &[u8]) -> VkResult<()> {
    let mut state = self.state.borrow_mut();
    state.check(MockCall::WriteMemory)?;
    let memory = state
      .memories
      .get_mut(&memory.as_raw())
      .expect("mapping unknown memory");
    assert_eq!(memory.type_index, HOST_MEMORY_TYPE, "mapping device local memory");
    memory.bytes[..bytes.len()].copy_from_slice(bytes);
    Ok(())
  }

  fn read_memory(&self, memory: vk::DeviceMemory, size: vk::DeviceSize) -> VkResult<Vec<u8>> {
    let state = self.state.borrow();
    let memory = &state.memories[&memory.as_raw()];
    assert_eq!(memory.type_index, HOST_MEMORY_TYPE, "mapping device local memory");
    Ok(memory.bytes[..size as usize].to_vec())
  }

  fn allocate_transfer_command_buffer(&self) -> VkResult<vk::CommandBuffer> {
    let mut state = self.state.borrow_mut();
    state.check(MockCall::AllocateCommandBuffer)?;
    let handle = state.new_handle();
    state.command_buffers.insert(handle, None);
    Ok(vk::CommandBuffer::from_raw(handle))
  }

  fn free_transfer_command_buffer(&self, command_buffer: vk::CommandBuffer) {
    let removed = self
      .state
      .borrow_mut()
      .command_buffers
      .remove(&command_buffer.as_raw());
    assert!(removed.is_some(), "double free of {:?}", command_buffer);
  }

  fn record_buffer_copy(
    &self,
    command_buffer: vk::CommandBuffer,
    src: vk::Buffer,
    dst: vk::Buffer,
    size: vk::DeviceSize,
  ) -> VkResult<()> {
    let mut state = self.state.borrow_mut();
    state.check(MockCall::RecordCopy)?;
    let src_buffer = &state.buffers[&src.as_raw()];
    assert!(src_buffer.usage.contains(vk::BufferUsageFlags::TRANSFER_SRC));
    assert!(size <= src_buffer.size);
    let dst_buffer = &state.buffers[&dst.as_raw()];
    assert!(dst_buffer.usage.contains(vk::BufferUsageFlags::TRANSFER_DST));
    assert!(size <= dst_buffer.size);

    state.command_buffers.insert(
      command_buffer.as_raw(),
      Some(BufferCopy {
        src: src.as_raw(),
        dst: dst.as_raw(),
        size,
      }),
    );
    Ok(())
  }

  fn submit_transfer_and_wait(&self, command_buffer: vk::CommandBuffer) -> VkResult<()> {
    let mut state = self.state.borrow_mut();
    state.check(MockCall::SubmitTransfer)?;
    state.transfer_submissions += 1;
    let copy = match state.command_buffers.get(&command_buffer.as_raw()) {
      Some(Some(copy)) => *copy,
      _ => panic!("submitting an empty or unknown command buffer"),
    };

    let src_memory = state.memory_of(copy.src);
    let dst_memory = state.memory_of(copy.dst);
    let size = copy.size as usize;
    let bytes = state.memories[&src_memory].bytes[..size].to_vec();
    state
      .memories
      .get_mut(&dst_memory)
      .expect("copy destination memory")
      .bytes[..size]
      .copy_from_slice(&bytes);
    Ok(())
  }
}

impl SyncDevice for MockDevice {
  fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
    let mut state = self.state.borrow_mut();
    state.check(MockCall::CreateSemaphore)?;
    let handle = state.new_handle();
    state.semaphores.insert(handle, false);
    Ok(vk::Semaphore::from_raw(handle))
  }

  fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
    let removed = self
      .state
      .borrow_mut()
      .semaphores
      .remove(&semaphore.as_raw());
    assert!(removed.is_some(), "double destroy of {:?}", semaphore);
  }

  fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence> {
    let mut state = self.state.borrow_mut();
    state.check(MockCall::CreateFence)?;
    let handle = state.new_handle();
    state.fences.insert(handle, signaled);
    Ok(vk::Fence::from_raw(handle))
  }

  fn destroy_fence(&self, fence: vk::Fence) {
    let removed = self.state.borrow_mut().fences.remove(&fence.as_raw());
    assert!(removed.is_some(), "double destroy of {:?}", fence);
  }

  fn wait_for_fence(&self, fence: vk::Fence, _timeout: u64) -> VkResult<()> {
    let mut state = self.state.borrow_mut();
    state.check(MockCall::WaitForFence)?;
    // nothing can signal the fence while the caller is blocked, so waits never block
    match state.fences.get(&fence.as_raw()) {
      Some(true) => Ok(()),
      Some(false) => Err(vk::Result::TIMEOUT),
      None => panic!("waiting on unknown fence {:?}", fence),
    }
  }

  fn reset_fence(&self, fence: vk::Fence) -> VkResult<()> {
    let mut state = self.state.borrow_mut();
    state.check(MockCall::ResetFence)?;
    match state.fences.get_mut(&fence.as_raw()) {
      Some(signaled) => *signaled = false,
      None => panic!("resetting unknown fence {:?}", fence),
    }
    Ok(())
  }

  fn submit_graphics(&self, submission: &FrameSubmission) -> VkResult<()> {
    let mut state = self.state.borrow_mut();
    state.check(MockCall::SubmitGraphics)?;

    let wait = submission.wait_semaphore.as_raw();
    assert_eq!(
      state.semaphores.get(&wait),
      Some(&true),
      "submission waits on a semaphore that was never signaled"
    );
    state.semaphores.insert(wait, false);

    let signal = submission.signal_semaphore.as_raw();
    assert_eq!(
      state.semaphores.get(&signal),
      Some(&false),
      "submission signals a semaphore that is already signaled"
    );
    state.semaphores.insert(signal, true);

    let fence = submission.fence.as_raw();
    assert_eq!(
      state.fences.get(&fence),
      Some(&false),
      "submission fence must be unsignaled"
    );
    state.fences.insert(fence, self.auto_complete.get());

    state.submissions.push(*submission);
    Ok(())
  }

  fn wait_idle(&self) -> VkResult<()> {
    let mut state = self.state.borrow_mut();
    state.idle_waits += 1;
    let submitted: Vec<u64> = state.submissions.iter().map(|s| s.fence.as_raw()).collect();
    for fence in submitted {
      if let Some(signaled) = state.fences.get_mut(&fence) {
        *signaled = true;
      }
    }
    Ok(())
  }
}

impl PresentDevice for MockDevice {
  fn create_swapchain(&self, descriptor: &SwapchainDescriptor) -> VkResult<vk::SwapchainKHR> {
    let mut state = self.state.borrow_mut();
    state.check(MockCall::CreateSwapchain)?;
    let count = self
      .swapchain_image_count
      .get()
      .unwrap_or(descriptor.min_image_count);
    let images = (0..count)
      .map(|_| vk::Image::from_raw(state.new_handle()))
      .collect();
    let handle = state.new_handle();
    state.swapchains.insert(
      handle,
      MockSwapchain {
        images,
        next_image: 0,
      },
    );
    state.swapchain_descriptors.push(*descriptor);
    Ok(vk::SwapchainKHR::from_raw(handle))
  }

  fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
    let mut state = self.state.borrow_mut();
    assert!(
      state.image_views.is_empty(),
      "swapchain destroyed before its image views"
    );
    let removed = state.swapchains.remove(&swapchain.as_raw());
    assert!(removed.is_some(), "double destroy of {:?}", swapchain);
  }

  fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
    Ok(self.state.borrow().swapchains[&swapchain.as_raw()].images.clone())
  }

  fn create_image_view(&self, _image: vk::Image, _format: vk::Format) -> VkResult<vk::ImageView> {
    let mut state = self.state.borrow_mut();
    state.check(MockCall::CreateImageView)?;
    let handle = state.new_handle();
    state.image_views.insert(handle);
    Ok(vk::ImageView::from_raw(handle))
  }

  fn destroy_image_view(&self, view: vk::ImageView) {
    let removed = self.state.borrow_mut().image_views.remove(&view.as_raw());
    assert!(removed, "double destroy of {:?}", view);
  }

  fn acquire_next_image(
    &self,
    swapchain: vk::SwapchainKHR,
    _timeout: u64,
    signal: vk::Semaphore,
  ) -> VkResult<(u32, bool)> {
    let mut state = self.state.borrow_mut();
    state.check(MockCall::AcquireNextImage)?;
    assert_eq!(
      state.semaphores.get(&signal.as_raw()),
      Some(&false),
      "acquire signals a semaphore that is already signaled"
    );
    state.semaphores.insert(signal.as_raw(), true);

    let swapchain = state
      .swapchains
      .get_mut(&swapchain.as_raw())
      .expect("acquiring from unknown swapchain");
    let index = swapchain.next_image;
    swapchain.next_image = (index + 1) % swapchain.images.len() as u32;
    Ok((index, false))
  }

  fn queue_present(
    &self,
    _swapchain: vk::SwapchainKHR,
    image_index: u32,
    wait: vk::Semaphore,
  ) -> VkResult<bool> {
    let mut state = self.state.borrow_mut();
    state.check(MockCall::QueuePresent)?;
    assert_eq!(
      state.semaphores.get(&wait.as_raw()),
      Some(&true),
      "present waits on a semaphore that was never signaled"
    );
    state.semaphores.insert(wait.as_raw(), false);
    state.presents.push(PresentRecord {
      image_index,
      wait_semaphore: wait,
    });
    Ok(false)
  }
}

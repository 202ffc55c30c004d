use std::{mem::size_of, rc::Rc};

use ash::vk;
use bytemuck::Pod;

use super::{
  device_api::BufferDevice,
  device_destroyable::Scoped,
  errors::ResourceCreationError,
};
use crate::utility::const_flag_bitor;

const STAGING_MEMORY: vk::MemoryPropertyFlags = const_flag_bitor!(
  vk::MemoryPropertyFlags =>
  vk::MemoryPropertyFlags::HOST_VISIBLE,
  vk::MemoryPropertyFlags::HOST_COHERENT
);
const GEOMETRY_MEMORY: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::DEVICE_LOCAL;

// geometry can be copied back to the host in debug builds
const READ_BACK_USAGE: vk::BufferUsageFlags = if cfg!(debug_assertions) {
  vk::BufferUsageFlags::TRANSFER_SRC
} else {
  vk::BufferUsageFlags::empty()
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryUsage {
  Vertex,
  Index,
}

impl GeometryUsage {
  pub fn buffer_usage(self) -> vk::BufferUsageFlags {
    match self {
      GeometryUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
      GeometryUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
    }
  }
}

// Returns the first memory type allowed by `type_bits` that has all `required` properties.
pub fn find_memory_type(
  properties: &vk::PhysicalDeviceMemoryProperties,
  type_bits: u32,
  required: vk::MemoryPropertyFlags,
) -> Result<u32, ResourceCreationError> {
  properties
    .memory_types
    .iter()
    .take(properties.memory_type_count as usize)
    .enumerate()
    .find(|&(i, memory_type)| {
      type_bits & (1 << i) != 0 && memory_type.property_flags.contains(required)
    })
    .map(|(i, _)| i as u32)
    .ok_or(ResourceCreationError::NoCompatibleMemoryType { required })
}

// whole, non-empty elements whose count fits the u32 used by draw calls
fn element_count(len: usize, stride: usize) -> Result<u32, ResourceCreationError> {
  let invalid = ResourceCreationError::InvalidUploadSize { len, stride };
  if stride == 0 || len == 0 || len % stride != 0 || u32::try_from(stride).is_err() {
    return Err(invalid);
  }
  u32::try_from(len / stride).map_err(|_| invalid)
}

// buffer and its dedicated memory, both released on drop unless taken out
// (buffer is declared first so that it gets destroyed before its memory)
struct BoundBuffer<'d, D: BufferDevice + ?Sized> {
  buffer: Scoped<'d, D, vk::Buffer>,
  memory: Scoped<'d, D, vk::DeviceMemory>,
}

impl<'d, D: BufferDevice + ?Sized> BoundBuffer<'d, D> {
  fn create(
    device: &'d D,
    size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
    required_memory: vk::MemoryPropertyFlags,
  ) -> Result<Self, ResourceCreationError> {
    let buffer = Scoped::new(device, device.create_buffer(size, usage)?);

    let requirements = device.buffer_memory_requirements(*buffer);
    let memory_type = find_memory_type(
      device.memory_properties(),
      requirements.memory_type_bits,
      required_memory,
    )?;
    let memory = Scoped::new(
      device,
      device.allocate_memory(requirements.size, memory_type)?,
    );
    device.bind_buffer_memory(*buffer, *memory)?;

    Ok(Self { buffer, memory })
  }

  fn release(self) -> (vk::Buffer, vk::DeviceMemory) {
    (self.buffer.release(), self.memory.release())
  }
}

fn copy_blocking<D: BufferDevice + ?Sized>(
  device: &D,
  src: vk::Buffer,
  dst: vk::Buffer,
  size: vk::DeviceSize,
) -> Result<(), ResourceCreationError> {
  let command_buffer = Scoped::new(device, device.allocate_transfer_command_buffer()?);
  device.record_buffer_copy(*command_buffer, src, dst, size)?;
  device
    .submit_transfer_and_wait(*command_buffer)
    .map_err(ResourceCreationError::TransferFailed)
}

// Device local vertex or index buffer, owned by whoever uploaded it.
pub struct GeometryBuffer<D: BufferDevice> {
  device: Rc<D>,
  buffer: vk::Buffer,
  memory: vk::DeviceMemory,
  element_count: u32,
  stride: u32,
}

impl<D: BufferDevice> GeometryBuffer<D> {
  pub fn handle(&self) -> vk::Buffer {
    self.buffer
  }

  pub fn element_count(&self) -> u32 {
    self.element_count
  }

  pub fn stride(&self) -> u32 {
    self.stride
  }

  #[cfg(debug_assertions)]
  pub fn size(&self) -> vk::DeviceSize {
    self.element_count as vk::DeviceSize * self.stride as vk::DeviceSize
  }
}

impl<D: BufferDevice> Drop for GeometryBuffer<D> {
  fn drop(&mut self) {
    self.device.destroy_buffer(self.buffer);
    self.device.free_memory(self.memory);
  }
}

// Moves host data into device local buffers through a temporary staging buffer
pub struct TransferUploader<D: BufferDevice> {
  device: Rc<D>,
}

impl<D: BufferDevice> TransferUploader<D> {
  pub fn new(device: Rc<D>) -> Self {
    Self { device }
  }

  pub fn upload<T: Pod>(
    &self,
    data: &[T],
    usage: GeometryUsage,
  ) -> Result<GeometryBuffer<D>, ResourceCreationError> {
    self.upload_bytes(bytemuck::cast_slice(data), size_of::<T>(), usage)
  }

  // Blocks until the copy has completed
  pub fn upload_bytes(
    &self,
    bytes: &[u8],
    stride: usize,
    usage: GeometryUsage,
  ) -> Result<GeometryBuffer<D>, ResourceCreationError> {
    let element_count = element_count(bytes.len(), stride)?;
    let size = bytes.len() as vk::DeviceSize;
    let device = self.device.as_ref();

    let staging = BoundBuffer::create(
      device,
      size,
      vk::BufferUsageFlags::TRANSFER_SRC,
      STAGING_MEMORY,
    )?;
    device.write_memory(*staging.memory, bytes)?;

    let destination = BoundBuffer::create(
      device,
      size,
      vk::BufferUsageFlags::TRANSFER_DST | usage.buffer_usage() | READ_BACK_USAGE,
      GEOMETRY_MEMORY,
    )?;
    copy_blocking(device, *staging.buffer, *destination.buffer, size)?;
    drop(staging);

    let (buffer, memory) = destination.release();
    log::debug!(
      "Uploaded {} {:?} elements ({} bytes) to {:?}",
      element_count,
      usage,
      size,
      buffer
    );

    Ok(GeometryBuffer {
      device: Rc::clone(&self.device),
      buffer,
      memory,
      element_count,
      // range checked by element_count
      stride: stride as u32,
    })
  }

  // Copies the contents of a geometry buffer back to the host.
  #[cfg(debug_assertions)]
  pub fn read_back(&self, geometry: &GeometryBuffer<D>) -> Result<Vec<u8>, ResourceCreationError> {
    let device = self.device.as_ref();
    let size = geometry.size();

    let host = BoundBuffer::create(
      device,
      size,
      vk::BufferUsageFlags::TRANSFER_DST,
      STAGING_MEMORY,
    )?;
    copy_blocking(device, geometry.buffer, *host.buffer, size)?;
    Ok(device.read_memory(*host.memory, size)?)
  }
}

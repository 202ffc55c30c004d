use ash::vk;

use super::{
  device_api::BufferDevice,
  errors::ResourceCreationError,
  upload::{GeometryBuffer, GeometryUsage, TransferUploader},
  vertex::Vertex,
};

pub struct Mesh<D: BufferDevice> {
  vertices: GeometryBuffer<D>,
  indices: GeometryBuffer<D>,
}

impl<D: BufferDevice> Mesh<D> {
  pub fn new(
    uploader: &TransferUploader<D>,
    vertices: &[Vertex],
    indices: &[u32],
  ) -> Result<Self, ResourceCreationError> {
    let vertices = uploader.upload(vertices, GeometryUsage::Vertex)?;
    let indices = uploader.upload(indices, GeometryUsage::Index)?;
    Ok(Self { vertices, indices })
  }

  pub fn vertex_count(&self) -> u32 {
    self.vertices.element_count()
  }

  pub fn index_count(&self) -> u32 {
    self.indices.element_count()
  }

  pub fn vertex_buffer(&self) -> vk::Buffer {
    self.vertices.handle()
  }

  pub fn index_buffer(&self) -> vk::Buffer {
    self.indices.handle()
  }

  pub fn index_type(&self) -> vk::IndexType {
    match self.indices.stride() {
      2 => vk::IndexType::UINT16,
      _ => vk::IndexType::UINT32,
    }
  }

  // compares device contents with the data the mesh was created from
  #[cfg(debug_assertions)]
  pub fn verify(
    &self,
    uploader: &TransferUploader<D>,
    vertices: &[Vertex],
    indices: &[u32],
  ) -> Result<(), ResourceCreationError> {
    if uploader.read_back(&self.vertices)? != bytemuck::cast_slice::<Vertex, u8>(vertices) {
      return Err(ResourceCreationError::ReadBackMismatch(GeometryUsage::Vertex));
    }
    if uploader.read_back(&self.indices)? != bytemuck::cast_slice::<u32, u8>(indices) {
      return Err(ResourceCreationError::ReadBackMismatch(GeometryUsage::Index));
    }
    Ok(())
  }
}

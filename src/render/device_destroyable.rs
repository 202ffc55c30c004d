use std::ops::Deref;

use ash::vk;

use super::device_api::{BufferDevice, PresentDevice, SyncDevice};

// Handles that are released through the device that created them
pub trait DeviceDestroyable<D: ?Sized> {
  fn destroy_with(&self, device: &D);
}

impl<D: BufferDevice + ?Sized> DeviceDestroyable<D> for vk::Buffer {
  fn destroy_with(&self, device: &D) {
    device.destroy_buffer(*self);
  }
}

impl<D: BufferDevice + ?Sized> DeviceDestroyable<D> for vk::DeviceMemory {
  fn destroy_with(&self, device: &D) {
    device.free_memory(*self);
  }
}

impl<D: BufferDevice + ?Sized> DeviceDestroyable<D> for vk::CommandBuffer {
  fn destroy_with(&self, device: &D) {
    device.free_transfer_command_buffer(*self);
  }
}

impl<D: SyncDevice + ?Sized> DeviceDestroyable<D> for vk::Semaphore {
  fn destroy_with(&self, device: &D) {
    device.destroy_semaphore(*self);
  }
}

impl<D: SyncDevice + ?Sized> DeviceDestroyable<D> for vk::Fence {
  fn destroy_with(&self, device: &D) {
    device.destroy_fence(*self);
  }
}

impl<D: PresentDevice + ?Sized> DeviceDestroyable<D> for vk::SwapchainKHR {
  fn destroy_with(&self, device: &D) {
    device.destroy_swapchain(*self);
  }
}

impl<D: PresentDevice + ?Sized> DeviceDestroyable<D> for vk::ImageView {
  fn destroy_with(&self, device: &D) {
    device.destroy_image_view(*self);
  }
}

impl<D: ?Sized, T: DeviceDestroyable<D>> DeviceDestroyable<D> for Vec<T> {
  fn destroy_with(&self, device: &D) {
    for value in self.iter().rev() {
      value.destroy_with(device);
    }
  }
}

// Destroys the held value when dropped, unless it was handed over with `release()`
//
// example:
//    ```
//      let buffer = Scoped::new(device, device.create_buffer(size, usage)?);
//      let memory = Scoped::new(device, device.allocate_memory(size, type_index)?);
//      device.bind_buffer_memory(*buffer, *memory)?; // on error both get destroyed
//      Ok((buffer.release(), memory.release()))
//    ```
pub struct Scoped<'d, D: ?Sized, T: DeviceDestroyable<D>> {
  device: &'d D,
  value: Option<T>,
}

impl<'d, D: ?Sized, T: DeviceDestroyable<D>> Scoped<'d, D, T> {
  pub fn new(device: &'d D, value: T) -> Self {
    Self {
      device,
      value: Some(value),
    }
  }

  pub fn release(mut self) -> T {
    match self.value.take() {
      Some(value) => value,
      // value is only taken here and in drop
      None => unreachable!(),
    }
  }
}

impl<'d, D: ?Sized, T: DeviceDestroyable<D>> Deref for Scoped<'d, D, T> {
  type Target = T;

  fn deref(&self) -> &Self::Target {
    match self.value.as_ref() {
      Some(value) => value,
      None => unreachable!(),
    }
  }
}

impl<'d, D: ?Sized, T: DeviceDestroyable<D>> Drop for Scoped<'d, D, T> {
  fn drop(&mut self) {
    if let Some(value) = self.value.take() {
      value.destroy_with(self.device);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::render::testing::MockDevice;

  #[test]
  fn scoped_destroys_unless_released() {
    let device = MockDevice::new();

    {
      let _fence = Scoped::new(&device, device.create_fence(true).unwrap());
      let _semaphore = Scoped::new(&device, device.create_semaphore().unwrap());
      assert_eq!(device.live_objects(), 2);
    }
    assert_eq!(device.live_objects(), 0);

    let fence = Scoped::new(&device, device.create_fence(false).unwrap()).release();
    assert_eq!(device.live_objects(), 1);
    device.destroy_fence(fence);
    assert_eq!(device.live_objects(), 0);
  }

  #[test]
  fn vec_of_handles_is_destroyed_whole() {
    let device = MockDevice::new();
    let semaphores: Vec<vk::Semaphore> = (0..3)
      .map(|_| device.create_semaphore().unwrap())
      .collect();
    let scoped = Scoped::new(&device, semaphores);
    assert_eq!(scoped.len(), 3);
    drop(scoped);
    assert_eq!(device.live_objects(), 0);
  }
}

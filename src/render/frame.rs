use std::rc::Rc;

use ash::vk;

use super::{device_api::SyncDevice, device_destroyable::Scoped, errors::ResourceCreationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSync {
  // signaled by the queue when the slot's last submission completes
  pub available: vk::Fence,
  pub image_acquired: vk::Semaphore,
  pub render_finished: vk::Semaphore,
}

// contains synchronization objects for one frame
pub struct FrameSlot<D: SyncDevice> {
  device: Rc<D>,
  sync: SlotSync,
}

impl<D: SyncDevice> FrameSlot<D> {
  pub fn new(device: Rc<D>) -> Result<Self, ResourceCreationError> {
    let image_acquired = Scoped::new(device.as_ref(), device.create_semaphore()?);
    let render_finished = Scoped::new(device.as_ref(), device.create_semaphore()?);
    // signaled, so that the first use of the slot doesn't block
    let available = device.create_fence(true)?;

    let sync = SlotSync {
      available,
      image_acquired: image_acquired.release(),
      render_finished: render_finished.release(),
    };
    Ok(Self { device, sync })
  }

  pub fn sync(&self) -> SlotSync {
    self.sync
  }
}

impl<D: SyncDevice> Drop for FrameSlot<D> {
  fn drop(&mut self) {
    self.device.destroy_semaphore(self.sync.image_acquired);
    self.device.destroy_semaphore(self.sync.render_finished);
    self.device.destroy_fence(self.sync.available);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::render::testing::{MockCall, MockDevice};

  #[test]
  fn slot_starts_available() {
    let device = Rc::new(MockDevice::new());
    let slot = FrameSlot::new(Rc::clone(&device)).unwrap();
    let sync = slot.sync();

    assert!(device.is_fence_signaled(sync.available));
    assert_ne!(sync.image_acquired, sync.render_finished);
    assert_eq!(device.live_objects(), 3);

    drop(slot);
    assert_eq!(device.live_objects(), 0);
  }

  #[test]
  fn failed_fence_creation_releases_semaphores() {
    let device = Rc::new(MockDevice::new());
    device.fail_on(MockCall::CreateFence, 0, vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);

    assert!(matches!(
      FrameSlot::new(Rc::clone(&device)),
      Err(ResourceCreationError::OutOfMemory(_))
    ));
    assert_eq!(device.live_objects(), 0);
  }
}

use std::rc::Rc;

use ash::vk;

use super::{
  device_api::SyncDevice,
  errors::{DeviceSubmissionError, ResourceCreationError},
  frame::{FrameSlot, SlotSync},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
  // free to be used by the next frame that lands on it
  Idle,
  // work was submitted and its fence has not been waited for yet
  Submitted,
  // fence was waited for but not reset yet
  Complete,
}

// Ring of frame slots that bounds how many frames the host can be ahead of the device.
// The current slot is `frame_counter % slots.len()`. Before a slot is reused its fence is waited
// for and reset, so at most `slots.len()` submissions are ever in flight.
pub struct FramePacer<D: SyncDevice> {
  device: Rc<D>,
  slots: Box<[FrameSlot<D>]>,
  states: Box<[SlotState]>,
  frame_counter: u64,
}

impl<D: SyncDevice> FramePacer<D> {
  pub fn new(device: Rc<D>, slot_count: usize) -> Result<Self, ResourceCreationError> {
    let slot_count = slot_count.max(1);
    log::debug!("Creating {} frame slots", slot_count);

    // already created slots get dropped if a later one fails
    let slots = (0..slot_count)
      .map(|_| FrameSlot::new(Rc::clone(&device)))
      .collect::<Result<Box<[_]>, _>>()?;

    Ok(Self {
      device,
      slots,
      states: vec![SlotState::Idle; slot_count].into_boxed_slice(),
      frame_counter: 0,
    })
  }

  pub fn current_index(&self) -> usize {
    (self.frame_counter % self.slots.len() as u64) as usize
  }

  pub fn current(&self) -> SlotSync {
    self.slots[self.current_index()].sync()
  }

  pub fn frame_counter(&self) -> u64 {
    self.frame_counter
  }

  #[cfg(test)]
  pub fn state(&self, slot: usize) -> SlotState {
    self.states[slot]
  }

  // Waits up to `timeout` nanoseconds for the current slot to become available.
  // Returns `false` if the timeout expired. On success the slot's fence is reset so it can be
  // signaled by the next submission.
  pub fn try_wait_current(&mut self, timeout: u64) -> Result<bool, DeviceSubmissionError> {
    let slot = self.current_index();
    let fence = self.slots[slot].sync().available;

    match self.device.wait_for_fence(fence, timeout) {
      Ok(()) => {}
      Err(vk::Result::TIMEOUT) => return Ok(false),
      Err(result) => return Err(DeviceSubmissionError::SlotWaitFailed { slot, result }),
    }
    self.states[slot] = SlotState::Complete;
    self
      .device
      .reset_fence(fence)
      .map_err(|result| DeviceSubmissionError::SlotResetFailed { slot, result })?;

    self.states[slot] = SlotState::Idle;
    Ok(true)
  }

  pub fn wait_current(&mut self) -> Result<(), DeviceSubmissionError> {
    if self.try_wait_current(u64::MAX)? {
      Ok(())
    } else {
      Err(DeviceSubmissionError::SlotWaitFailed {
        slot: self.current_index(),
        result: vk::Result::TIMEOUT,
      })
    }
  }

  pub fn mark_submitted(&mut self) {
    let slot = self.current_index();
    debug_assert_eq!(self.states[slot], SlotState::Idle);
    self.states[slot] = SlotState::Submitted;
  }

  pub fn advance(&mut self) {
    self.frame_counter += 1;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::render::testing::{MockCall, MockDevice};

  fn pacer(device: &Rc<MockDevice>) -> FramePacer<MockDevice> {
    FramePacer::new(Rc::clone(device), 2).unwrap()
  }

  #[test]
  fn first_frames_never_block() {
    let device = Rc::new(MockDevice::new());
    let mut pacer = pacer(&device);

    for expected_slot in [0, 1] {
      assert_eq!(pacer.current_index(), expected_slot);
      assert!(pacer.try_wait_current(0).unwrap());
      assert!(!device.is_fence_signaled(pacer.current().available));
      pacer.mark_submitted();
      pacer.advance();
    }
    assert_eq!(pacer.state(0), SlotState::Submitted);
    assert_eq!(pacer.state(1), SlotState::Submitted);
  }

  #[test]
  fn reused_slot_waits_for_its_fence() {
    let device = Rc::new(MockDevice::new());
    let mut pacer = pacer(&device);

    for _ in 0..2 {
      pacer.wait_current().unwrap();
      pacer.mark_submitted();
      pacer.advance();
    }

    // third frame lands on slot 0 again, whose work is still in flight
    assert_eq!(pacer.current_index(), 0);
    assert!(!pacer.try_wait_current(0).unwrap());
    assert_eq!(pacer.state(0), SlotState::Submitted);

    device.signal_fence(pacer.current().available);
    assert!(pacer.try_wait_current(0).unwrap());
    assert_eq!(pacer.state(0), SlotState::Idle);
    assert_eq!(pacer.frame_counter(), 2);
  }

  #[test]
  fn slots_have_distinct_sync_objects() {
    let device = Rc::new(MockDevice::new());
    let mut pacer = pacer(&device);
    let first = pacer.current();
    pacer.advance();
    let second = pacer.current();
    pacer.advance();

    assert_ne!(first, second);
    assert_eq!(pacer.current(), first);
  }

  #[test]
  fn failed_reset_leaves_the_slot_complete() {
    let device = Rc::new(MockDevice::new());
    let mut pacer = pacer(&device);
    device.fail_on(MockCall::ResetFence, 0, vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);

    assert!(matches!(
      pacer.wait_current(),
      Err(DeviceSubmissionError::SlotResetFailed { slot: 0, .. })
    ));
    assert_eq!(pacer.state(0), SlotState::Complete);

    pacer.wait_current().unwrap();
    assert_eq!(pacer.state(0), SlotState::Idle);
  }

  #[test]
  fn zero_slots_are_raised_to_one() {
    let device = Rc::new(MockDevice::new());
    let mut pacer = FramePacer::new(Rc::clone(&device), 0).unwrap();
    assert_eq!(device.live_objects(), 3);

    let first = pacer.current();
    pacer.advance();
    assert_eq!(pacer.current_index(), 0);
    assert_eq!(pacer.current(), first);
  }

  #[test]
  fn wait_failure_names_the_slot() {
    let device = Rc::new(MockDevice::new());
    let mut pacer = pacer(&device);
    pacer.advance();
    device.fail_on(MockCall::WaitForFence, 0, vk::Result::ERROR_DEVICE_LOST);

    assert!(matches!(
      pacer.wait_current(),
      Err(DeviceSubmissionError::SlotWaitFailed {
        slot: 1,
        result: vk::Result::ERROR_DEVICE_LOST
      })
    ));
  }

  #[test]
  fn failed_slot_creation_releases_earlier_slots() {
    let device = Rc::new(MockDevice::new());
    device.fail_on(MockCall::CreateSemaphore, 3, vk::Result::ERROR_OUT_OF_HOST_MEMORY);

    assert!(FramePacer::new(Rc::clone(&device), 2).is_err());
    assert_eq!(device.live_objects(), 0);

    let pacer = FramePacer::new(Rc::clone(&device), 3).unwrap();
    assert_eq!(device.live_objects(), 9);
    drop(pacer);
    assert_eq!(device.live_objects(), 0);
  }
}

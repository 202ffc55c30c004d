use std::rc::Rc;

use ash::vk;

use super::{
  device_api::{FrameSubmission, PresentDevice, SyncDevice},
  errors::{DeviceSubmissionError, ResourceCreationError},
  frame::SlotSync,
  frame_pacer::FramePacer,
  swapchain::PresentationChain,
  ACQUIRE_TIMEOUT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRecord {
  pub slot: usize,
  pub image_index: u32,
  pub sync: SlotSync,
}

pub struct RenderLoopDriver<D: SyncDevice + PresentDevice> {
  device: Rc<D>,
  pacer: FramePacer<D>,
  suboptimal_reported: bool,
}

impl<D: SyncDevice + PresentDevice> RenderLoopDriver<D> {
  pub fn new(device: Rc<D>, frames_in_flight: usize) -> Result<Self, ResourceCreationError> {
    let pacer = FramePacer::new(Rc::clone(&device), frames_in_flight)?;
    Ok(Self {
      device,
      pacer,
      suboptimal_reported: false,
    })
  }

  pub fn frame_counter(&self) -> u64 {
    self.pacer.frame_counter()
  }

  // Renders and presents one frame.
  // `command_buffers` holds one pre-recorded command buffer per presentable image of `chain`.
  // The frame slot and the image index are independent: slots cycle through the pacer ring
  // while images are handed out by the presentation engine.
  pub fn draw_frame(
    &mut self,
    chain: &PresentationChain<D>,
    command_buffers: &[vk::CommandBuffer],
  ) -> Result<FrameRecord, DeviceSubmissionError> {
    self.pacer.wait_current()?;
    let slot = self.pacer.current_index();
    let sync = self.pacer.current();

    let (image_index, suboptimal) = chain
      .acquire_next(ACQUIRE_TIMEOUT, sync.image_acquired)
      .map_err(DeviceSubmissionError::AcquireFailed)?;
    self.report_suboptimal(suboptimal);

    let command_buffer = command_buffers
      .get(image_index as usize)
      .copied()
      .ok_or(DeviceSubmissionError::MissingCommandBuffer { image_index })?;

    self
      .device
      .submit_graphics(&FrameSubmission {
        command_buffer,
        wait_semaphore: sync.image_acquired,
        wait_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        signal_semaphore: sync.render_finished,
        fence: sync.available,
      })
      .map_err(DeviceSubmissionError::SubmitFailed)?;
    self.pacer.mark_submitted();

    let suboptimal = chain
      .present(image_index, sync.render_finished)
      .map_err(|result| DeviceSubmissionError::PresentFailed {
        image_index,
        result,
      })?;
    self.report_suboptimal(suboptimal);

    log::trace!(
      "Frame {} presented image {} from slot {}",
      self.pacer.frame_counter(),
      image_index,
      slot
    );
    self.pacer.advance();

    Ok(FrameRecord {
      slot,
      image_index,
      sync,
    })
  }

  // the chain is never recreated, so a suboptimal chain keeps being used
  fn report_suboptimal(&mut self, suboptimal: bool) {
    if suboptimal && !self.suboptimal_reported {
      log::warn!("Swapchain no longer matches the surface exactly");
      self.suboptimal_reported = true;
    }
  }

  pub fn wait_idle(&self) -> Result<(), DeviceSubmissionError> {
    self
      .device
      .wait_idle()
      .map_err(DeviceSubmissionError::WaitIdleFailed)
  }
}

impl<D: SyncDevice + PresentDevice> Drop for RenderLoopDriver<D> {
  fn drop(&mut self) {
    // slot objects of frames still in flight can't be destroyed before the device is done
    if let Err(err) = self.wait_idle() {
      log::error!("{:?}", err);
    }
    log::debug!(
      "Stopping render loop after {} frames",
      self.frame_counter()
    );
  }
}

use ash::vk;

// one queue per family, all with the same priority
static QUEUE_PRIORITIES: [f32; 1] = [1.0];

// graphics first, presentation only if it is a different family
pub fn unique_families(graphics_family: u32, presentation_family: u32) -> Vec<u32> {
  if graphics_family == presentation_family {
    vec![graphics_family]
  } else {
    vec![graphics_family, presentation_family]
  }
}

#[derive(Debug, Clone, Copy)]
pub struct Queues {
  // also used for one-shot transfers
  pub graphics: vk::Queue,
  pub presentation: vk::Queue,
}

impl Queues {
  pub fn get_queue_create_infos(
    graphics_family: u32,
    presentation_family: u32,
  ) -> Vec<vk::DeviceQueueCreateInfo<'static>> {
    unique_families(graphics_family, presentation_family)
      .into_iter()
      .map(|index| {
        vk::DeviceQueueCreateInfo::default()
          .queue_family_index(index)
          .queue_priorities(&QUEUE_PRIORITIES)
      })
      .collect()
  }

  pub unsafe fn retrieve(
    device: &ash::Device,
    graphics_family: u32,
    presentation_family: u32,
  ) -> Queues {
    let graphics = device.get_device_queue(graphics_family, 0);
    let presentation = if presentation_family == graphics_family {
      graphics
    } else {
      device.get_device_queue(presentation_family, 0)
    };

    Queues {
      graphics,
      presentation,
    }
  }
}

mod device_selector;
mod logical_device;
mod queues;

pub use device_selector::{
  choose_extent, choose_present_mode, choose_surface_format, select_device, DeviceSelection,
  SurfaceQueries,
};
pub use logical_device::Device;
pub use queues::Queues;

pub mod device;
mod entry;
mod instance;
mod surface;
mod validation_layers;

pub use entry::get_entry;
pub use instance::Instance;
pub use surface::Surface;
pub use validation_layers::DebugUtils;

use std::{
  ffi::{c_char, CStr},
  ops::Deref,
};

use ash::vk;
use raw_window_handle::RawDisplayHandle;

use crate::{
  render::{config::DiagnosticsConfig, errors::InitializationError, TARGET_API_VERSION},
  utility, APPLICATION_NAME, APPLICATION_VERSION,
};

use super::{validation_layers, DebugUtils};

// Returns required extensions that are not in `available`
// Names are compared for equality, prefixes or longer names with the same start don't count
pub fn missing_extensions(available: &[vk::ExtensionProperties], required: &[&CStr]) -> Vec<String> {
  required
    .iter()
    .filter(|&&req| {
      !available
        .iter()
        .filter_map(|props| props.extension_name_as_c_str().ok())
        .any(|av| av == req)
    })
    .map(|name| name.to_string_lossy().into_owned())
    .collect()
}

fn check_instance_extension_support(
  entry: &ash::Entry,
  required_extensions: &[&CStr],
) -> Result<(), InitializationError> {
  log::info!(
    "Required Instance extensions by the application: {:?}",
    required_extensions
  );

  let available = unsafe { entry.enumerate_instance_extension_properties(None) }
    .map_err(InitializationError::InstanceCreationFailed)?;
  log::debug!(
    "Available Instance extensions: {:?}",
    available
      .iter()
      .filter_map(|props| props.extension_name_as_c_str().ok())
      .collect::<Vec<_>>()
  );

  let missing = missing_extensions(&available, required_extensions);
  if missing.is_empty() {
    Ok(())
  } else {
    Err(InitializationError::MissingInstanceExtensions(missing))
  }
}

fn check_target_api_version(entry: &ash::Entry) -> Result<(), InitializationError> {
  let max_supported_version = match unsafe { entry.try_enumerate_instance_version() } {
    // Vulkan 1.1+
    Ok(Some(version)) => version,
    // Vulkan 1.0
    Ok(None) | Err(_) => vk::API_VERSION_1_0,
  };

  log::info!(
    "Vulkan library max supported version: {}",
    utility::parse_vulkan_api_version(max_supported_version)
  );

  if max_supported_version < TARGET_API_VERSION {
    return Err(InitializationError::UnsupportedApiVersion {
      supported: utility::parse_vulkan_api_version(max_supported_version),
      targeted: utility::parse_vulkan_api_version(TARGET_API_VERSION),
    });
  }
  Ok(())
}

pub fn required_instance_extensions(
  display_handle: RawDisplayHandle,
  diagnostics: &DiagnosticsConfig,
) -> Result<Vec<&'static CStr>, InitializationError> {
  let mut required = Vec::new();
  if diagnostics.validation {
    required.push(ash::ext::debug_utils::NAME);
  }

  let surface_extensions = ash_window::enumerate_required_extensions(display_handle)
    .map_err(InitializationError::InstanceCreationFailed)?;
  // pointers returned by ash-window are static cstr constants
  required.extend(
    surface_extensions
      .iter()
      .map(|&ptr| unsafe { CStr::from_ptr(ptr) }),
  );

  Ok(required)
}

pub struct Instance {
  inner: ash::Instance,
  // library has to stay loaded while the instance is alive
  entry: ash::Entry,
}

impl Deref for Instance {
  type Target = ash::Instance;

  fn deref(&self) -> &Self::Target {
    &self.inner
  }
}

impl Instance {
  pub fn create(
    entry: ash::Entry,
    display_handle: RawDisplayHandle,
    diagnostics: &DiagnosticsConfig,
  ) -> Result<Self, InitializationError> {
    check_target_api_version(&entry)?;

    let required_extensions = required_instance_extensions(display_handle, diagnostics)?;
    check_instance_extension_support(&entry, &required_extensions)?;
    // required to be alive until the end of instance creation
    let extension_pointers: Vec<*const c_char> =
      required_extensions.iter().map(|v| v.as_ptr()).collect();

    let layer_pointers: Vec<*const c_char> = if diagnostics.validation {
      validation_layers::check_validation_layers(&entry, diagnostics)?;
      diagnostics.layers.iter().map(|name| name.as_ptr()).collect()
    } else {
      Vec::new()
    };

    let app_info = vk::ApplicationInfo::default()
      .application_name(APPLICATION_NAME)
      .application_version(APPLICATION_VERSION)
      .engine_name(c"No Engine")
      .engine_version(vk::make_api_version(0, 1, 0, 0))
      .api_version(TARGET_API_VERSION);

    // covers messages emitted during instance creation and destruction
    let mut debug_create_info = DebugUtils::get_debug_messenger_create_info(diagnostics);

    let mut create_info = vk::InstanceCreateInfo::default()
      .application_info(&app_info)
      .enabled_layer_names(&layer_pointers)
      .enabled_extension_names(&extension_pointers);
    if diagnostics.validation {
      create_info = create_info.push_next(&mut debug_create_info);
    }

    log::debug!("Creating Instance");
    let inner = unsafe { entry.create_instance(&create_info, None) }
      .map_err(InitializationError::InstanceCreationFailed)?;

    Ok(Self { inner, entry })
  }

  pub fn entry(&self) -> &ash::Entry {
    &self.entry
  }

  pub fn enumerate_physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>, InitializationError> {
    unsafe { self.inner.enumerate_physical_devices() }
      .map_err(InitializationError::DeviceEnumerationFailed)
  }
}

impl Drop for Instance {
  fn drop(&mut self) {
    log::debug!("Destroying Instance");
    unsafe {
      self.inner.destroy_instance(None);
    }
  }
}

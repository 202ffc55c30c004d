use std::{
  ffi::{c_void, CStr},
  ptr,
};

use ash::vk;

use crate::render::{config::DiagnosticsConfig, errors::InitializationError};

// returns requested layers that are not in `available`
pub fn missing_layers(available: &[vk::LayerProperties], requested: &[&CStr]) -> Vec<String> {
  requested
    .iter()
    .filter(|&&req| {
      !available
        .iter()
        .filter_map(|av| av.layer_name_as_c_str().ok())
        .any(|av| av == req)
    })
    .map(|name| name.to_string_lossy().into_owned())
    .collect()
}

pub fn check_validation_layers(
  entry: &ash::Entry,
  diagnostics: &DiagnosticsConfig,
) -> Result<(), InitializationError> {
  log::info!("Querying Vulkan instance layers");
  let available = unsafe { entry.enumerate_instance_layer_properties() }
    .map_err(InitializationError::InstanceCreationFailed)?;

  let missing = missing_layers(&available, &diagnostics.layers);
  if !missing.is_empty() {
    return Err(InitializationError::MissingValidationLayers(missing));
  }
  Ok(())
}

unsafe extern "system" fn vulkan_debug_utils_callback(
  message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
  message_type: vk::DebugUtilsMessageTypeFlagsEXT,
  p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
  _p_user_data: *mut c_void,
) -> vk::Bool32 {
  let types = match message_type {
    vk::DebugUtilsMessageTypeFlagsEXT::GENERAL => "[General]",
    vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE => "[Performance]",
    vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION => "[Validation]",
    _ => "[Unknown]",
  };
  let message = if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
    std::borrow::Cow::Borrowed("<no message>")
  } else {
    CStr::from_ptr((*p_callback_data).p_message).to_string_lossy()
  };
  let message = format!("{} {}", types, message);
  match message_severity {
    vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE => log::debug!("{message}"),
    vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => log::warn!("{message}"),
    vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => log::error!("{message}"),
    vk::DebugUtilsMessageSeverityFlagsEXT::INFO => log::info!("{message}"),
    _ => log::warn!("<Unknown>: {message}"),
  }

  vk::FALSE
}

pub struct DebugUtils {
  loader: ash::ext::debug_utils::Instance,
  messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugUtils {
  pub fn create(
    entry: &ash::Entry,
    instance: &ash::Instance,
    diagnostics: &DiagnosticsConfig,
  ) -> Result<Self, InitializationError> {
    let loader = ash::ext::debug_utils::Instance::new(entry, instance);

    let create_info = Self::get_debug_messenger_create_info(diagnostics);
    log::debug!("Creating debug utils messenger");
    let messenger = unsafe { loader.create_debug_utils_messenger(&create_info, None) }
      .map_err(InitializationError::DebugMessengerCreationFailed)?;

    Ok(Self { loader, messenger })
  }

  // also chained into instance creation so that create / destroy instance get reported
  pub fn get_debug_messenger_create_info<'a>(
    diagnostics: &DiagnosticsConfig,
  ) -> vk::DebugUtilsMessengerCreateInfoEXT<'a> {
    vk::DebugUtilsMessengerCreateInfoEXT {
      flags: vk::DebugUtilsMessengerCreateFlagsEXT::empty(),
      message_severity: diagnostics.message_severity,
      message_type: diagnostics.message_type,
      pfn_user_callback: Some(vulkan_debug_utils_callback),
      p_user_data: ptr::null_mut(),
      ..Default::default()
    }
  }
}

impl Drop for DebugUtils {
  fn drop(&mut self) {
    log::debug!("Destroying debug utils messenger");
    unsafe {
      self
        .loader
        .destroy_debug_utils_messenger(self.messenger, None);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::ffi::c_char;

  use super::*;

  fn layer(name: &CStr) -> vk::LayerProperties {
    let mut props = vk::LayerProperties::default();
    for (dst, &src) in props.layer_name.iter_mut().zip(name.to_bytes()) {
      *dst = src as c_char;
    }
    props
  }

  #[test]
  fn requested_layers_need_an_exact_match() {
    let available = [
      layer(c"VK_LAYER_KHRONOS_validation_extra"),
      layer(c"VK_LAYER_MESA_overlay"),
    ];
    assert_eq!(
      missing_layers(&available, &[c"VK_LAYER_KHRONOS_validation"]),
      vec!["VK_LAYER_KHRONOS_validation".to_owned()]
    );

    let available = [layer(c"VK_LAYER_KHRONOS_validation")];
    assert!(missing_layers(&available, &[c"VK_LAYER_KHRONOS_validation"]).is_empty());
  }

  #[test]
  fn messenger_uses_configured_severity() {
    let diagnostics = DiagnosticsConfig {
      message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
      ..DiagnosticsConfig::default()
    };
    let info = DebugUtils::get_debug_messenger_create_info(&diagnostics);
    assert_eq!(
      info.message_severity,
      vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
    );
    assert!(info.pfn_user_callback.is_some());
  }
}

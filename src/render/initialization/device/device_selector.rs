use std::ffi::{CStr, CString};

use ash::vk;

use crate::render::{
  errors::{InitializationError, SurfaceError},
  PREFERRED_PRESENT_MODE, PREFERRED_SURFACE_FORMAT,
};

// Per physical device queries needed to decide if it can render to the surface.
pub trait SurfaceQueries {
  fn device_name(&self, physical_device: vk::PhysicalDevice) -> String;
  fn queue_family_properties(
    &self,
    physical_device: vk::PhysicalDevice,
  ) -> Vec<vk::QueueFamilyProperties>;
  fn supports_presentation(
    &self,
    physical_device: vk::PhysicalDevice,
    family_index: u32,
  ) -> Result<bool, SurfaceError>;
  fn device_extension_names(
    &self,
    physical_device: vk::PhysicalDevice,
  ) -> Result<Vec<CString>, SurfaceError>;
  fn surface_capabilities(
    &self,
    physical_device: vk::PhysicalDevice,
  ) -> Result<vk::SurfaceCapabilitiesKHR, SurfaceError>;
  fn surface_formats(
    &self,
    physical_device: vk::PhysicalDevice,
  ) -> Result<Vec<vk::SurfaceFormatKHR>, SurfaceError>;
  fn present_modes(
    &self,
    physical_device: vk::PhysicalDevice,
  ) -> Result<Vec<vk::PresentModeKHR>, SurfaceError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilySelection {
  pub graphics_family: Option<u32>,
  pub presentation_family: Option<u32>,
}

impl QueueFamilySelection {
  pub fn is_valid(&self) -> bool {
    self.graphics_family.is_some() && self.presentation_family.is_some()
  }

  // (graphics, presentation)
  pub fn pair(&self) -> Option<(u32, u32)> {
    Some((self.graphics_family?, self.presentation_family?))
  }
}

#[derive(Debug, Clone)]
pub struct SurfaceCapabilitySet {
  pub capabilities: vk::SurfaceCapabilitiesKHR,
  pub formats: Vec<vk::SurfaceFormatKHR>,
  pub present_modes: Vec<vk::PresentModeKHR>,
}

#[derive(Debug, Clone)]
pub struct DeviceSelection {
  pub physical_device: vk::PhysicalDevice,
  pub graphics_family: u32,
  pub presentation_family: u32,
  pub surface: SurfaceCapabilitySet,
}

// Families are scanned in index order, the first graphics family and the first family that can
// present are taken independently (they may be the same)
pub fn find_queue_families<Q: SurfaceQueries + ?Sized>(
  probe: &Q,
  physical_device: vk::PhysicalDevice,
) -> Result<QueueFamilySelection, SurfaceError> {
  let mut selection = QueueFamilySelection::default();

  for (i, props) in probe
    .queue_family_properties(physical_device)
    .iter()
    .enumerate()
  {
    if props.queue_count == 0 {
      continue;
    }
    let index = i as u32;

    if selection.graphics_family.is_none() && props.queue_flags.contains(vk::QueueFlags::GRAPHICS)
    {
      selection.graphics_family = Some(index);
    }

    if selection.presentation_family.is_none()
      && probe.supports_presentation(physical_device, index)?
    {
      selection.presentation_family = Some(index);
    }

    if selection.is_valid() {
      break;
    }
  }

  Ok(selection)
}

// returns required extensions that the device does not report
pub fn missing_device_extensions<'a>(
  available: &[CString],
  required: &[&'a CStr],
) -> Vec<&'a CStr> {
  required
    .iter()
    .filter(|req| !available.iter().any(|av| av.as_c_str() == **req))
    .copied()
    .collect()
}

fn query_surface_support<Q: SurfaceQueries + ?Sized>(
  probe: &Q,
  physical_device: vk::PhysicalDevice,
) -> Result<SurfaceCapabilitySet, SurfaceError> {
  Ok(SurfaceCapabilitySet {
    capabilities: probe.surface_capabilities(physical_device)?,
    formats: probe.surface_formats(physical_device)?,
    present_modes: probe.present_modes(physical_device)?,
  })
}

fn check_physical_device<Q: SurfaceQueries + ?Sized>(
  probe: &Q,
  physical_device: vk::PhysicalDevice,
  required_extensions: &[&CStr],
) -> Result<Option<DeviceSelection>, SurfaceError> {
  let families = find_queue_families(probe, physical_device)?;
  let (graphics_family, presentation_family) = match families.pair() {
    Some(pair) => pair,
    None => {
      log::info!("Skipped physical device: Device does not contain required queue families");
      return Ok(None);
    }
  };

  let available = probe.device_extension_names(physical_device)?;
  let missing = missing_device_extensions(&available, required_extensions);
  if !missing.is_empty() {
    log::warn!(
      "Skipped physical device: Device does not support extensions {:?}",
      missing
    );
    return Ok(None);
  }

  let surface = query_surface_support(probe, physical_device)?;
  if surface.formats.is_empty() || surface.present_modes.is_empty() {
    log::warn!("Skipped physical device: Device does not support the surface");
    return Ok(None);
  }

  Ok(Some(DeviceSelection {
    physical_device,
    graphics_family,
    presentation_family,
    surface,
  }))
}

// Devices are checked in the order they are given and the first one that passes is used
pub fn select_device<Q: SurfaceQueries + ?Sized>(
  probe: &Q,
  physical_devices: &[vk::PhysicalDevice],
  required_extensions: &[&CStr],
) -> Result<DeviceSelection, InitializationError> {
  for &physical_device in physical_devices {
    log::info!(
      "Found physical device \"{}\"",
      probe.device_name(physical_device)
    );

    match check_physical_device(probe, physical_device, required_extensions) {
      Ok(Some(selection)) => {
        log::info!(
          "Using physical device \"{}\" (graphics family {}, presentation family {})",
          probe.device_name(physical_device),
          selection.graphics_family,
          selection.presentation_family
        );
        return Ok(selection);
      }
      Ok(None) => {}
      Err(err) => log::error!("Device selection error: {:?}", err),
    }
  }

  Err(InitializationError::NoSuitableDevice)
}

pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
  // a single undefined entry means that any format can be used
  if formats.len() == 1 && formats[0].format == vk::Format::UNDEFINED {
    return PREFERRED_SURFACE_FORMAT;
  }

  for available in formats.iter() {
    if (available.format == vk::Format::R8G8B8A8_UNORM
      || available.format == vk::Format::B8G8R8A8_UNORM)
      && available.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
    {
      return *available;
    }
  }

  formats.first().copied().unwrap_or(PREFERRED_SURFACE_FORMAT)
}

pub fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
  if present_modes.contains(&PREFERRED_PRESENT_MODE) {
    return PREFERRED_PRESENT_MODE;
  }

  // required to be available
  vk::PresentModeKHR::FIFO
}

pub fn choose_extent(
  capabilities: &vk::SurfaceCapabilitiesKHR,
  drawable_size: vk::Extent2D,
) -> vk::Extent2D {
  if capabilities.current_extent.width != u32::MAX {
    return capabilities.current_extent;
  }

  vk::Extent2D {
    width: drawable_size.width.clamp(
      capabilities.min_image_extent.width,
      capabilities.max_image_extent.width,
    ),
    height: drawable_size.height.clamp(
      capabilities.min_image_extent.height,
      capabilities.max_image_extent.height,
    ),
  }
}

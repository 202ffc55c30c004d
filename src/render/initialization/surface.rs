use std::{ffi::CString, ops::Deref};

use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::{
  render::errors::{InitializationError, SurfaceError},
  utility,
};

use super::{device::SurfaceQueries, Instance};

pub struct Surface {
  inner: vk::SurfaceKHR,
  loader: ash::khr::surface::Instance,
}

impl Deref for Surface {
  type Target = vk::SurfaceKHR;

  fn deref(&self) -> &Self::Target {
    &self.inner
  }
}

impl Surface {
  pub fn create(
    instance: &Instance,
    display_handle: RawDisplayHandle,
    window_handle: RawWindowHandle,
  ) -> Result<Self, InitializationError> {
    let loader = ash::khr::surface::Instance::new(instance.entry(), instance);
    log::debug!("Creating window surface");
    let inner = unsafe {
      ash_window::create_surface(
        instance.entry(),
        instance,
        display_handle,
        window_handle,
        None,
      )
    }
    .map_err(InitializationError::SurfaceCreationFailed)?;

    Ok(Self { inner, loader })
  }

  // queries used to select a physical device for this surface
  pub fn probe<'a>(&'a self, instance: &'a ash::Instance) -> SurfaceProbe<'a> {
    SurfaceProbe {
      instance,
      surface: self,
    }
  }
}

impl Drop for Surface {
  fn drop(&mut self) {
    log::debug!("Destroying surface");
    unsafe {
      self.loader.destroy_surface(self.inner, None);
    }
  }
}

pub struct SurfaceProbe<'a> {
  instance: &'a ash::Instance,
  surface: &'a Surface,
}

impl<'a> SurfaceQueries for SurfaceProbe<'a> {
  fn device_name(&self, physical_device: vk::PhysicalDevice) -> String {
    let properties = unsafe {
      self
        .instance
        .get_physical_device_properties(physical_device)
    };
    let name = properties
      .device_name_as_c_str()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_else(|_| "<invalid name>".to_owned());
    let device_type = match properties.device_type {
      vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
      vk::PhysicalDeviceType::DISCRETE_GPU => "Discrete GPU",
      vk::PhysicalDeviceType::VIRTUAL_GPU => "Virtual GPU",
      vk::PhysicalDeviceType::CPU => "CPU",
      _ => "Unknown",
    };

    format!(
      "{} ({}, API {})",
      name,
      device_type,
      utility::parse_vulkan_api_version(properties.api_version)
    )
  }

  fn queue_family_properties(
    &self,
    physical_device: vk::PhysicalDevice,
  ) -> Vec<vk::QueueFamilyProperties> {
    let properties = unsafe {
      self
        .instance
        .get_physical_device_queue_family_properties(physical_device)
    };
    log::debug!("Queue family properties: {:#?}", properties);
    properties
  }

  fn supports_presentation(
    &self,
    physical_device: vk::PhysicalDevice,
    family_index: u32,
  ) -> Result<bool, SurfaceError> {
    unsafe {
      self.surface.loader.get_physical_device_surface_support(
        physical_device,
        family_index,
        self.surface.inner,
      )
    }
    .map_err(SurfaceError::from)
  }

  fn device_extension_names(
    &self,
    physical_device: vk::PhysicalDevice,
  ) -> Result<Vec<CString>, SurfaceError> {
    let properties = unsafe {
      self
        .instance
        .enumerate_device_extension_properties(physical_device)
    }?;

    Ok(
      properties
        .iter()
        .filter_map(|props| props.extension_name_as_c_str().ok())
        .map(CString::from)
        .collect(),
    )
  }

  fn surface_capabilities(
    &self,
    physical_device: vk::PhysicalDevice,
  ) -> Result<vk::SurfaceCapabilitiesKHR, SurfaceError> {
    unsafe {
      self
        .surface
        .loader
        .get_physical_device_surface_capabilities(physical_device, self.surface.inner)
    }
    .map_err(SurfaceError::from)
  }

  fn surface_formats(
    &self,
    physical_device: vk::PhysicalDevice,
  ) -> Result<Vec<vk::SurfaceFormatKHR>, SurfaceError> {
    unsafe {
      self
        .surface
        .loader
        .get_physical_device_surface_formats(physical_device, self.surface.inner)
    }
    .map_err(SurfaceError::from)
  }

  fn present_modes(
    &self,
    physical_device: vk::PhysicalDevice,
  ) -> Result<Vec<vk::PresentModeKHR>, SurfaceError> {
    unsafe {
      self
        .surface
        .loader
        .get_physical_device_surface_present_modes(physical_device, self.surface.inner)
    }
    .map_err(SurfaceError::from)
  }
}

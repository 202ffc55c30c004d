use crate::render::errors::InitializationError;

#[cfg(all(feature = "link", feature = "load"))]
compile_error!(
  "\
    Features \"link\" and \"load\" \
    were included at the same time. \
    Choose between \"load\" to load the Vulkan library \
    at runtime or \"link\" to link it while building the binary."
);

#[allow(unreachable_code)]
pub fn get_entry() -> Result<ash::Entry, InitializationError> {
  #[cfg(feature = "link")]
  return Ok(ash::Entry::linked());

  #[cfg(feature = "load")]
  return match unsafe { ash::Entry::load() } {
    Ok(entry) => Ok(entry),
    Err(ash::LoadingError::MissingEntryPoint(missing_entry_error)) => {
      Err(InitializationError::LibraryLoadFailed(format!(
        "Missing entry point: {}",
        missing_entry_error
      )))
    }
    Err(ash::LoadingError::LibraryLoadFailure(load_error)) => Err(
      InitializationError::LibraryLoadFailed(load_error.to_string()),
    ),
  };

  // only reached if neither feature is enabled
  Err(InitializationError::LibraryLoadFailed(
    "No compile feature was included for accessing the Vulkan library. \
    Choose between \"load\" to load the Vulkan library \
    at runtime or \"link\" to link it while building the binary."
      .to_owned(),
  ))
}

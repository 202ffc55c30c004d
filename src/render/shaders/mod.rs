use std::{ffi::CStr, fs::File, io, path::Path};

use ash::vk;

use super::{config::RenderConfig, errors::OutOfMemoryError};

static MAIN_FN_NAME: &CStr = c"main";

#[derive(thiserror::Error, Debug)]
pub enum ShaderError {
  #[error("\"{1}\" IO error")]
  IOError(#[source] io::Error, String),

  #[error("Failed to create shader module")]
  Invalid(#[source] vk::Result),

  #[error("Not enough memory")]
  NotEnoughMemory(#[source] OutOfMemoryError),
}

// checks the SPIR-V magic number and returns the code as words
pub fn read_spirv(path: &Path) -> Result<Vec<u32>, ShaderError> {
  let to_shader_error = |err| ShaderError::IOError(err, path.display().to_string());
  let mut file = File::open(path).map_err(to_shader_error)?;
  ash::util::read_spv(&mut file).map_err(to_shader_error)
}

fn create_shader_module(device: &ash::Device, code: &[u32]) -> Result<vk::ShaderModule, ShaderError> {
  let create_info = vk::ShaderModuleCreateInfo::default().code(code);

  unsafe { device.create_shader_module(&create_info, None) }.map_err(|vkerr| {
    match OutOfMemoryError::from_result(vkerr) {
      Some(oom) => ShaderError::NotEnoughMemory(oom),
      None => ShaderError::Invalid(vkerr),
    }
  })
}

// vertex and fragment modules, only needed until the pipeline is created
pub struct Shader<'d> {
  device: &'d ash::Device,
  vert: vk::ShaderModule,
  frag: vk::ShaderModule,
}

impl<'d> Shader<'d> {
  pub fn load(device: &'d ash::Device, config: &RenderConfig) -> Result<Self, ShaderError> {
    log::debug!(
      "Loading shaders {:?} and {:?}",
      config.vertex_shader,
      config.fragment_shader
    );
    let vert_code = read_spirv(&config.vertex_shader)?;
    let frag_code = read_spirv(&config.fragment_shader)?;

    let vert = create_shader_module(device, &vert_code)?;
    let frag = match create_shader_module(device, &frag_code) {
      Ok(frag) => frag,
      Err(err) => {
        unsafe { device.destroy_shader_module(vert, None) };
        return Err(err);
      }
    };
    Ok(Self { device, vert, frag })
  }

  pub fn get_pipeline_shader_creation_info(&self) -> [vk::PipelineShaderStageCreateInfo; 2] {
    [
      vk::PipelineShaderStageCreateInfo::default()
        .stage(vk::ShaderStageFlags::VERTEX)
        .module(self.vert)
        .name(MAIN_FN_NAME),
      vk::PipelineShaderStageCreateInfo::default()
        .stage(vk::ShaderStageFlags::FRAGMENT)
        .module(self.frag)
        .name(MAIN_FN_NAME),
    ]
  }
}

impl Drop for Shader<'_> {
  fn drop(&mut self) {
    unsafe {
      self.device.destroy_shader_module(self.vert, None);
      self.device.destroy_shader_module(self.frag, None);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::{fs, path::PathBuf};

  use super::*;

  const SPIRV_MAGIC: u32 = 0x0723_0203;

  fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("{}-{}", std::process::id(), name));
    fs::write(&path, bytes).unwrap();
    path
  }

  #[test]
  fn spirv_words_are_read() {
    let words = [SPIRV_MAGIC, 0x0001_0000, 7];
    let path = temp_file("valid.spv", bytemuck::cast_slice(&words));

    let code = read_spirv(&path).unwrap();
    fs::remove_file(&path).unwrap();
    assert_eq!(code, words);
  }

  #[test]
  fn truncated_or_foreign_files_are_rejected() {
    let truncated = temp_file("truncated.spv", &[0x03, 0x02, 0x23]);
    let result = read_spirv(&truncated);
    fs::remove_file(&truncated).unwrap();
    assert!(matches!(result, Err(ShaderError::IOError(..))));

    let foreign = temp_file("foreign.spv", bytemuck::cast_slice(&[0xdead_beef_u32, 0]));
    let result = read_spirv(&foreign);
    fs::remove_file(&foreign).unwrap();
    assert!(matches!(result, Err(ShaderError::IOError(..))));
  }

  #[test]
  fn missing_file_error_names_the_path() {
    let err = read_spirv(Path::new("./does/not/exist.spv")).unwrap_err();
    assert_eq!(err.to_string(), "\"./does/not/exist.spv\" IO error");
  }
}

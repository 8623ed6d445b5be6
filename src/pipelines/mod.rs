//! Render pipelines ("programs") and their bind group layouts.
//!
//! - `basic` builds the lit forward program and the shared pipeline helper
//! - `transparent` builds the blended program for the light bulb
//! - `shadow` builds the cubemap distance program and the face cameras
//! - `light` holds the uniform blocks every program reads

use std::path::Path;

use crate::{error::RenderError, resources::load_string};

pub mod basic;
pub mod light;
pub mod shadow;
pub mod transparent;

/// Which program a draw runs with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Program {
    Shadow,
    Forward,
    Translucent,
}

impl Program {
    pub const ALL: [Program; 3] = [Program::Shadow, Program::Forward, Program::Translucent];

    /// Vertex and fragment source files, relative to the shader directory.
    pub fn sources(self) -> (&'static str, &'static str) {
        match self {
            Program::Shadow => ("shadow_vertex.wgsl", "shadow_fragment.wgsl"),
            Program::Forward => ("forward_vertex.wgsl", "forward_fragment.wgsl"),
            Program::Translucent => ("translucent_vertex.wgsl", "translucent_fragment.wgsl"),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Program::Shadow => "shadow",
            Program::Forward => "forward",
            Program::Translucent => "translucent",
        }
    }

    /// Bind group index of the per-draw object slot.
    pub fn object_group(self) -> u32 {
        match self {
            Program::Shadow => 1,
            Program::Forward | Program::Translucent => 2,
        }
    }

    /// Bind group index of the material slot, if the program samples one.
    pub fn material_group(self) -> Option<u32> {
        match self {
            Program::Shadow => None,
            Program::Forward | Program::Translucent => Some(1),
        }
    }
}

/// Compiled vertex and fragment stages of one program.
#[derive(Debug)]
pub struct ShaderPair {
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
}

impl ShaderPair {
    pub async fn load(
        device: &wgpu::Device,
        shader_dir: &Path,
        program: Program,
    ) -> Result<Self, RenderError> {
        let (vertex, fragment) = program.sources();
        Ok(Self {
            vertex: compile_shader(device, &shader_dir.join(vertex)).await?,
            fragment: compile_shader(device, &shader_dir.join(fragment)).await?,
        })
    }
}

/// Reads and compiles one WGSL file. Any compiler error is fatal and names
/// the file.
pub async fn compile_shader(
    device: &wgpu::Device,
    path: &Path,
) -> Result<wgpu::ShaderModule, RenderError> {
    let source = load_string(path).await?;
    let label = path.display().to_string();
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let info = module.get_compilation_info().await;
    let errors: Vec<String> = info
        .messages
        .iter()
        .filter(|m| m.message_type == wgpu::CompilationMessageType::Error)
        .map(|m| match &m.location {
            Some(loc) => format!("{}:{}: {}", loc.line_number, loc.line_position, m.message),
            None => m.message.clone(),
        })
        .collect();
    if !errors.is_empty() {
        return Err(RenderError::Shader {
            path: path.to_path_buf(),
            message: errors.join("; "),
        });
    }
    for warning in info.messages.iter() {
        if warning.message_type == wgpu::CompilationMessageType::Warning {
            log::warn!("{}: {}", label, warning.message);
        }
    }
    log::debug!("compiled shader {}", label);
    Ok(module)
}

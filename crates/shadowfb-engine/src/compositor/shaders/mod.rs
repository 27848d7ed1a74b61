//! Embedded upscale shaders and their compilation.
//!
//! Compilation parses the WGSL text with naga and runs the validator; the
//! validated text is what backends receive.

use std::borrow::Cow;
use std::sync::Arc;

use thiserror::Error;

use crate::gpu::{CompiledShader, ShaderStage};

/// Shader blobs the compositor loads at initialization.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderResource {
    VertexUpscaler,
    PixelUpscaler,
}

impl ShaderResource {
    pub const fn stage(self) -> ShaderStage {
        match self {
            ShaderResource::VertexUpscaler => ShaderStage::Vertex,
            ShaderResource::PixelUpscaler => ShaderStage::Pixel,
        }
    }

    pub const fn entry_point(self) -> &'static str {
        match self {
            ShaderResource::VertexUpscaler => "vs_main",
            ShaderResource::PixelUpscaler => "fs_main",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShaderError {
    #[error("shader resource {0:?} is not available")]
    Missing(ShaderResource),

    #[error("failed to parse {resource:?}: {message}")]
    Parse { resource: ShaderResource, message: String },

    #[error("{resource:?} failed validation: {message}")]
    Validation { resource: ShaderResource, message: String },

    #[error("{resource:?} has no {stage:?} entry point `{entry_point}`")]
    MissingEntryPoint {
        resource: ShaderResource,
        stage: ShaderStage,
        entry_point: &'static str,
    },
}

/// Where shader text comes from.
pub trait ShaderSources {
    fn load(&self, resource: ShaderResource) -> Option<Cow<'static, str>>;
}

/// The shaders compiled into this crate.
#[derive(Debug, Copy, Clone, Default)]
pub struct EmbeddedShaders;

impl ShaderSources for EmbeddedShaders {
    fn load(&self, resource: ShaderResource) -> Option<Cow<'static, str>> {
        let src = match resource {
            ShaderResource::VertexUpscaler => include_str!("upscale_vs.wgsl"),
            ShaderResource::PixelUpscaler => include_str!("upscale_fs.wgsl"),
        };
        Some(Cow::Borrowed(src))
    }
}

/// Parses and validates one shader resource.
pub fn compile_shader(resource: ShaderResource, source: &str) -> Result<CompiledShader, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Parse {
        resource,
        message: e.emit_to_string(source),
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| ShaderError::Validation {
        resource,
        message: e.to_string(),
    })?;

    let stage = resource.stage();
    let naga_stage = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Pixel => naga::ShaderStage::Fragment,
    };
    let entry_point = resource.entry_point();
    if !module
        .entry_points
        .iter()
        .any(|ep| ep.name == entry_point && ep.stage == naga_stage)
    {
        return Err(ShaderError::MissingEntryPoint { resource, stage, entry_point });
    }

    Ok(CompiledShader::new(stage, entry_point, Arc::from(source)))
}

/// Loads and compiles both upscale shaders.
pub(crate) fn compile_upscalers(
    sources: &dyn ShaderSources,
) -> Result<(CompiledShader, CompiledShader), ShaderError> {
    let load = |resource: ShaderResource| {
        let src = sources.load(resource).ok_or(ShaderError::Missing(resource))?;
        compile_shader(resource, &src)
    };
    Ok((load(ShaderResource::VertexUpscaler)?, load(ShaderResource::PixelUpscaler)?))
}

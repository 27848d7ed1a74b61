use std::sync::Arc;

use super::types::ShaderStage;

/// Shader source that has passed parsing and validation.
///
/// Only the compositor's shader loader builds these; backends turn them into
/// stage objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledShader {
    stage: ShaderStage,
    entry_point: &'static str,
    source: Arc<str>,
}

impl CompiledShader {
    pub(crate) fn new(stage: ShaderStage, entry_point: &'static str, source: Arc<str>) -> Self {
        Self { stage, entry_point, source }
    }

    #[inline]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    #[inline]
    pub fn entry_point(&self) -> &'static str {
        self.entry_point
    }

    /// Validated WGSL text.
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }
}

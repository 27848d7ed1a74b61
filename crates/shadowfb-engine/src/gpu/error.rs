use thiserror::Error;

use super::types::ShaderStage;

/// Failure reported by a backend object-creation call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GpuError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown {kind} handle {raw}")]
    UnknownHandle { kind: &'static str, raw: u64 },

    #[error("{stage:?} shader rejected: {message}")]
    ShaderRejected { stage: ShaderStage, message: String },

    #[error("out of memory")]
    OutOfMemory,

    #[error("device removed")]
    DeviceRemoved,

    #[error("unsupported: {0}")]
    Unsupported(String),
}

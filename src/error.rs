// knhk-substrate: Closed error taxonomy for the Engine
// Errors are values; there is no unwinding through the Engine.

use thiserror::Error;

/// All errors the Engine can surface. SHACL violations are not errors — they
/// are data in a `ShaclReport` (see `shacl.rs`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EngineError {
    #[error("invalid id: expected a minted, non-zero id, got {0}")]
    InvalidId(u32),

    #[error("unknown id: {0} is not in the reverse interner table")]
    UnknownId(u32),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("malformed template: {0}")]
    MalformedTemplate(String),

    #[error("variable limit exceeded: {0}")]
    VariableLimit(String),

    #[error("render buffer too small: need {needed} bytes, got {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("unknown shape: {0}")]
    UnknownShape(u32),

    #[error("out of memory: {0}")]
    OutOfMemory(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

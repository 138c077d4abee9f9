use thiserror::Error;

/// Errors raised by the simulated host when dispatching a call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("unknown module: {0}")]
    UnknownModule(String),

    #[error("unknown method: {module}.{method}")]
    UnknownMethod { module: String, method: String },

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("encoding failed: {0}")]
    Encoding(String),

    #[error("native call failed: {0}")]
    Native(String),
}

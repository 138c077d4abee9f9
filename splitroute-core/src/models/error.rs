use thiserror::Error;

/// Errors surfaced by routing collaborators and the plugin lifecycle.
///
/// None of these reach the end user: policy paths log them and fall back
/// (empty device list, skipped registration, "not in a call").
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("command failed: {0}")]
    CommandFailed(String),

    #[error("patch failed: {0}")]
    PatchFailed(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("scheduling failed: {0}")]
    SchedulingFailed(String),
}

use crate::models::error::RoutingError;
use crate::models::session_config::SessionConfig;

/// Message channel to the native audio session.
///
/// Fire-and-forget: `Ok` means the payload was handed off, not applied.
pub trait SessionBridge: Send + Sync {
    fn send(&self, config: &SessionConfig) -> Result<(), RoutingError>;
}

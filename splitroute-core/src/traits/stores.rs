use crate::models::device::{User, VoiceState};
use crate::models::error::RoutingError;

/// Source of the signed-in user.
pub trait UserStore: Send + Sync {
    fn current_user(&self) -> Result<Option<User>, RoutingError>;
}

/// Source of per-user voice channel membership.
pub trait VoiceStateStore: Send + Sync {
    fn voice_state_for_user(&self, user_id: &str) -> Result<Option<VoiceState>, RoutingError>;
}

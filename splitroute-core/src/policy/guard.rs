use std::sync::Arc;

use crate::traits::stores::{UserStore, VoiceStateStore};

/// Voice-channel membership check gating session-level overrides.
///
/// Unknown state counts as "not in a call": the override is a quality
/// optimization, so failing closed only costs audio quality.
#[derive(Clone, Default)]
pub struct SessionStateGuard {
    users: Option<Arc<dyn UserStore>>,
    voice_states: Option<Arc<dyn VoiceStateStore>>,
}

impl SessionStateGuard {
    pub fn new(users: Option<Arc<dyn UserStore>>, voice_states: Option<Arc<dyn VoiceStateStore>>) -> Self {
        Self { users, voice_states }
    }

    pub fn is_in_call(&self) -> bool {
        let (Some(users), Some(voice_states)) = (&self.users, &self.voice_states) else {
            return false;
        };

        let user = match users.current_user() {
            Ok(Some(user)) => user,
            Ok(None) => return false,
            Err(e) => {
                log::warn!("Current user lookup failed: {}", e);
                return false;
            }
        };

        match voice_states.voice_state_for_user(&user.id) {
            Ok(Some(state)) => state.channel_id.is_some(),
            Ok(None) => false,
            Err(e) => {
                log::warn!("Voice state lookup for {} failed: {}", user.id, e);
                false
            }
        }
    }
}

use std::collections::HashMap;

use parking_lot::Mutex;

use splitroute_core::{RoutingError, User, UserStore, VoiceState, VoiceStateStore};

/// User and voice-state store backed by memory.
#[derive(Debug, Default)]
pub struct InMemoryVoiceStore {
    user: Mutex<Option<User>>,
    voice_states: Mutex<HashMap<String, VoiceState>>,
    offline: Mutex<bool>,
}

impl InMemoryVoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, user_id: &str) {
        *self.user.lock() = Some(User { id: user_id.to_string() });
    }

    pub fn join_channel(&self, user_id: &str, channel_id: &str) {
        self.voice_states.lock().insert(
            user_id.to_string(),
            VoiceState {
                channel_id: Some(channel_id.to_string()),
            },
        );
    }

    pub fn leave_channel(&self, user_id: &str) {
        self.voice_states.lock().remove(user_id);
    }

    /// Make every lookup fail until set back.
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock() = offline;
    }

    fn check_online(&self) -> Result<(), RoutingError> {
        if *self.offline.lock() {
            return Err(RoutingError::QueryFailed("store offline".into()));
        }
        Ok(())
    }
}

impl UserStore for InMemoryVoiceStore {
    fn current_user(&self) -> Result<Option<User>, RoutingError> {
        self.check_online()?;
        Ok(self.user.lock().clone())
    }
}

impl VoiceStateStore for InMemoryVoiceStore {
    fn voice_state_for_user(&self, user_id: &str) -> Result<Option<VoiceState>, RoutingError> {
        self.check_online()?;
        Ok(self.voice_states.lock().get(user_id).cloned())
    }
}

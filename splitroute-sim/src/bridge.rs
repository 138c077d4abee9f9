use parking_lot::Mutex;

use splitroute_core::{RoutingError, SessionBridge, SessionConfig};

/// Session bridge that keeps every payload it is handed, in order.
#[derive(Debug, Default)]
pub struct RecordingSessionBridge {
    sent: Mutex<Vec<SessionConfig>>,
}

impl RecordingSessionBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SessionConfig> {
        self.sent.lock().clone()
    }

    pub fn last(&self) -> Option<SessionConfig> {
        self.sent.lock().last().cloned()
    }
}

impl SessionBridge for RecordingSessionBridge {
    fn send(&self, config: &SessionConfig) -> Result<(), RoutingError> {
        log::debug!("Native session <- {:?}", config);
        self.sent.lock().push(config.clone());
        Ok(())
    }
}

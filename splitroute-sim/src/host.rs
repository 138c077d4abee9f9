use std::sync::Arc;

use serde_json::Value;

use splitroute_core::{Collaborators, Device, ModuleRef};

use crate::bridge::RecordingSessionBridge;
use crate::error::HostError;
use crate::media_engine::SimulatedMediaEngine;
use crate::modules::{install_audio_session, install_voice_connection};
use crate::runtime::HostRuntime;
use crate::stores::InMemoryVoiceStore;

/// A complete simulated host: runtime, the three patchable modules, stores
/// and the native session bridge.
pub struct SimulatedHost {
    pub runtime: HostRuntime,
    pub media: SimulatedMediaEngine,
    pub store: Arc<InMemoryVoiceStore>,
    pub bridge: Arc<RecordingSessionBridge>,
    pub audio_session: ModuleRef,
    pub voice_connection: ModuleRef,
}

impl SimulatedHost {
    pub fn new(inputs: Vec<Device>, outputs: Vec<Device>) -> Result<Self, HostError> {
        let runtime = HostRuntime::new();
        let media = SimulatedMediaEngine::install(&runtime, inputs, outputs)?;
        let bridge = Arc::new(RecordingSessionBridge::new());
        let audio_session = install_audio_session(&runtime, Arc::clone(&bridge) as _)?;
        let voice_connection = install_voice_connection(&runtime, media.state())?;

        Ok(Self {
            runtime,
            media,
            store: Arc::new(InMemoryVoiceStore::new()),
            bridge,
            audio_session,
            voice_connection,
        })
    }

    /// Phone with built-in mic and speaker plus a pair of AirPods that
    /// expose a hands-free endpoint.
    pub fn with_airpods() -> Result<Self, HostError> {
        Self::new(
            vec![
                Device::input("default", "iPhone Microphone"),
                Device::input("bt-airpods-1", "AirPods"),
            ],
            vec![
                Device::output("speaker", "iPhone Speaker"),
                Device::output("bt-airpods-1", "AirPods"),
                Device::output("bt-airpods-1-hfp", "AirPods Hands-Free"),
            ],
        )
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            resolver: Arc::new(self.runtime.clone()),
            patcher: Arc::new(self.runtime.clone()),
            media_engine: Some(Arc::new(self.media.clone())),
            session_bridge: Some(Arc::clone(&self.bridge) as _),
            users: Some(Arc::clone(&self.store) as _),
            voice_states: Some(Arc::clone(&self.store) as _),
        }
    }

    pub fn configure_session(&self, config: Value) -> Result<Value, HostError> {
        self.runtime
            .invoke(&self.audio_session, "configureAudioSession", vec![config])
    }

    pub fn connect(&self, channel_id: &str) -> Result<Value, HostError> {
        self.runtime
            .invoke(&self.voice_connection, "connect", vec![Value::String(channel_id.to_string())])
    }

    pub fn select_call_input(&self, device_id: &str) -> Result<Value, HostError> {
        self.runtime.invoke(
            &self.voice_connection,
            "setInputDevice",
            vec![Value::String(device_id.to_string())],
        )
    }
}

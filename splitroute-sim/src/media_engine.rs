//! Simulated media engine with platform-style device coupling.
//!
//! Selecting a wireless headset's microphone drags the output along with it,
//! switching to the headset's hands-free endpoint when one is reported. This
//! is the behavior the routing policy works against.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use splitroute_core::{Device, MediaEngine, ModuleRef, RoutingError};

use crate::error::HostError;
use crate::runtime::HostRuntime;

pub const MEDIA_ENGINE_MODULE: &str = "MediaEngine";

/// Devices and active routes of the simulated platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteState {
    pub inputs: Vec<Device>,
    pub outputs: Vec<Device>,
    pub active_input: Option<String>,
    pub active_output: Option<String>,
}

impl RouteState {
    /// Platform coupling: a wireless mic moves output to the same headset,
    /// preferring its hands-free endpoint.
    fn select_input(&mut self, device_id: &str) {
        self.active_input = Some(device_id.to_string());
        let hands_free = format!("{}-hfp", device_id);
        let coupled = self
            .outputs
            .iter()
            .find(|d| d.id == hands_free)
            .or_else(|| self.outputs.iter().find(|d| d.id == device_id))
            .map(|d| d.id.clone());
        if let Some(output) = coupled {
            log::debug!("Platform coupled output to {}", output);
            self.active_output = Some(output);
        }
    }

    /// What the platform does on its own after a voice connection: route
    /// both directions to the first headset that has a microphone.
    pub fn renegotiate(&mut self) {
        let headset = self
            .inputs
            .iter()
            .find(|d| self.outputs.iter().any(|o| o.id == d.id))
            .map(|d| d.id.clone());
        if let Some(id) = headset {
            self.select_input(&id);
        }
    }
}

/// Media engine module installed on a [`HostRuntime`].
///
/// The [`MediaEngine`] impl dispatches through the runtime, so patched
/// methods see the policy's own commands too.
#[derive(Clone)]
pub struct SimulatedMediaEngine {
    host: HostRuntime,
    module: ModuleRef,
    state: Arc<Mutex<RouteState>>,
}

impl SimulatedMediaEngine {
    pub fn install(host: &HostRuntime, inputs: Vec<Device>, outputs: Vec<Device>) -> Result<Self, HostError> {
        let module = host.register_module(
            MEDIA_ENGINE_MODULE,
            &[
                "getAudioInputDevices",
                "getAudioOutputDevices",
                "setAudioInputDevice",
                "setAudioOutputDevice",
            ],
        );
        let state = Arc::new(Mutex::new(RouteState {
            inputs,
            outputs,
            active_input: None,
            active_output: None,
        }));

        let s = Arc::clone(&state);
        host.define_method(
            &module,
            "getAudioInputDevices",
            Arc::new(move |_args: &[Value]| encode_devices(&s.lock().inputs)),
        )?;
        let s = Arc::clone(&state);
        host.define_method(
            &module,
            "getAudioOutputDevices",
            Arc::new(move |_args: &[Value]| encode_devices(&s.lock().outputs)),
        )?;
        let s = Arc::clone(&state);
        host.define_method(
            &module,
            "setAudioInputDevice",
            Arc::new(move |args: &[Value]| -> Result<Value, HostError> {
                let id = device_id_arg(args)?;
                s.lock().select_input(id);
                Ok(Value::Null)
            }),
        )?;
        let s = Arc::clone(&state);
        host.define_method(
            &module,
            "setAudioOutputDevice",
            Arc::new(move |args: &[Value]| -> Result<Value, HostError> {
                let id = device_id_arg(args)?;
                s.lock().active_output = Some(id.to_string());
                Ok(Value::Null)
            }),
        )?;

        Ok(Self {
            host: host.clone(),
            module,
            state,
        })
    }

    pub fn module(&self) -> &ModuleRef {
        &self.module
    }

    pub fn state(&self) -> Arc<Mutex<RouteState>> {
        Arc::clone(&self.state)
    }

    pub fn active_input(&self) -> Option<String> {
        self.state.lock().active_input.clone()
    }

    pub fn active_output(&self) -> Option<String> {
        self.state.lock().active_output.clone()
    }

    /// Select an input the way the host UI would: through the patch chain.
    pub fn select_input(&self, device_id: &str) -> Result<(), HostError> {
        self.host
            .invoke(&self.module, "setAudioInputDevice", vec![Value::String(device_id.to_string())])
            .map(|_| ())
    }

    fn devices(&self, method: &str) -> Result<Vec<Device>, RoutingError> {
        let value = self
            .host
            .invoke(&self.module, method, Vec::new())
            .map_err(|e| RoutingError::QueryFailed(e.to_string()))?;
        serde_json::from_value(value).map_err(|e| RoutingError::QueryFailed(format!("malformed device list: {}", e)))
    }

    fn set(&self, method: &str, device_id: &str) -> Result<(), RoutingError> {
        self.host
            .invoke(&self.module, method, vec![Value::String(device_id.to_string())])
            .map(|_| ())
            .map_err(|e| RoutingError::CommandFailed(e.to_string()))
    }
}

impl MediaEngine for SimulatedMediaEngine {
    fn audio_input_devices(&self) -> Result<Vec<Device>, RoutingError> {
        self.devices("getAudioInputDevices")
    }

    fn audio_output_devices(&self) -> Result<Vec<Device>, RoutingError> {
        self.devices("getAudioOutputDevices")
    }

    fn set_audio_input_device(&self, device_id: &str) -> Result<(), RoutingError> {
        self.set("setAudioInputDevice", device_id)
    }

    fn set_audio_output_device(&self, device_id: &str) -> Result<(), RoutingError> {
        self.set("setAudioOutputDevice", device_id)
    }
}

fn encode_devices(devices: &[Device]) -> Result<Value, HostError> {
    serde_json::to_value(devices).map_err(|e| HostError::Encoding(e.to_string()))
}

pub(crate) fn device_id_arg(args: &[Value]) -> Result<&str, HostError> {
    args.first()
        .and_then(Value::as_str)
        .ok_or_else(|| HostError::InvalidArguments("expected a device id".into()))
}

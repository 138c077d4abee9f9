//! Audio session and voice connection modules.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use splitroute_core::{ModuleRef, SessionBridge, SessionConfig};

use crate::error::HostError;
use crate::media_engine::{device_id_arg, RouteState};
use crate::runtime::HostRuntime;

pub const AUDIO_SESSION_MODULE: &str = "AudioManager";
pub const VOICE_CONNECTION_MODULE: &str = "VoiceConnection";

/// Install the audio session module. `configureAudioSession(config)` forwards
/// the (possibly rewritten) config to the native bridge.
pub fn install_audio_session(host: &HostRuntime, bridge: Arc<dyn SessionBridge>) -> Result<ModuleRef, HostError> {
    let module = host.register_module(AUDIO_SESSION_MODULE, &["configureAudioSession", "setCommunicationModeOn"]);
    host.define_method(
        &module,
        "configureAudioSession",
        Arc::new(move |args: &[Value]| -> Result<Value, HostError> {
            let raw = args
                .first()
                .ok_or_else(|| HostError::InvalidArguments("expected a session config".into()))?;
            let config = SessionConfig::from_value(raw).map_err(|e| HostError::InvalidArguments(e.to_string()))?;
            bridge.send(&config).map_err(|e| HostError::Native(e.to_string()))?;
            Ok(Value::Bool(true))
        }),
    )?;
    host.define_method(
        &module,
        "setCommunicationModeOn",
        Arc::new(|args: &[Value]| -> Result<Value, HostError> {
            Ok(Value::Bool(args.first().and_then(Value::as_bool).unwrap_or(false)))
        }),
    )?;
    Ok(module)
}

/// Install the voice connection module.
///
/// `connect(channel)` renegotiates routes the way the platform does right
/// after connecting. `setInputDevice(id)` switches the in-call microphone
/// without coupling.
pub fn install_voice_connection(host: &HostRuntime, routes: Arc<Mutex<RouteState>>) -> Result<ModuleRef, HostError> {
    let module = host.register_module(VOICE_CONNECTION_MODULE, &["connect", "setInputDevice"]);

    let r = Arc::clone(&routes);
    host.define_method(
        &module,
        "connect",
        Arc::new(move |_args: &[Value]| -> Result<Value, HostError> {
            r.lock().renegotiate();
            Ok(Value::Bool(true))
        }),
    )?;
    host.define_method(
        &module,
        "setInputDevice",
        Arc::new(move |args: &[Value]| -> Result<Value, HostError> {
            let id = device_id_arg(args)?;
            routes.lock().active_input = Some(id.to_string());
            Ok(Value::Null)
        }),
    )?;
    Ok(module)
}

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::RoutingError;
use super::session_config::SessionOverride;

/// Upper bound on the post-connection settle delay.
pub const MAX_SETTLE_DELAY_MS: u64 = 60_000;

/// Configuration for a routing plugin instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfiguration {
    /// Delay before re-enforcing after a voice connection is established
    /// (default: 1000 ms). The platform renegotiates devices during this window.
    pub settle_delay_ms: u64,

    /// Keyword rules for device classification.
    pub classifier: ClassifierRules,

    /// Values forced onto the session config while in a call.
    pub session_override: SessionOverride,

    /// Also pin preferred input/output on the session config while in a call
    /// (default: true).
    pub pin_preferred_devices: bool,

    /// Push the overridden session config through the session bridge after a
    /// connection settles (default: false).
    pub reassert_session_on_connect: bool,

    /// Host modules and methods to intercept.
    pub targets: HookTargets,
}

impl RoutingConfiguration {
    /// Parse a JSON settings blob. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, RoutingError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RoutingError::ConfigurationFailed(format!("invalid settings: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RoutingError> {
        if self.settle_delay_ms > MAX_SETTLE_DELAY_MS {
            return Err(RoutingError::ConfigurationFailed(format!(
                "settle delay {} ms exceeds {} ms",
                self.settle_delay_ms, MAX_SETTLE_DELAY_MS
            )));
        }
        self.classifier.validate()?;
        self.targets.validate()?;
        if self.session_override.category.is_empty() || self.session_override.mode.is_empty() {
            return Err(RoutingError::ConfigurationFailed(
                "session override category and mode must be set".into(),
            ));
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for RoutingConfiguration {
    fn default() -> Self {
        Self {
            settle_delay_ms: 1000,
            classifier: ClassifierRules::default(),
            session_override: SessionOverride::default(),
            pin_preferred_devices: true,
            reassert_session_on_connect: false,
            targets: HookTargets::default(),
        }
    }
}

/// Substring rules used by the device classifier. Keyword and marker
/// matching is case-insensitive; reserved ids match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierRules {
    /// Matched against device ids.
    pub wireless_keywords: Vec<String>,
    /// Matched against device names.
    pub built_in_name_markers: Vec<String>,
    /// Compared for equality against device ids.
    pub built_in_ids: Vec<String>,
    /// Output device names carrying any of these are never selected.
    pub hands_free_markers: Vec<String>,
}

impl ClassifierRules {
    pub fn validate(&self) -> Result<(), RoutingError> {
        let lists = [
            ("wireless_keywords", &self.wireless_keywords),
            ("built_in_name_markers", &self.built_in_name_markers),
            ("built_in_ids", &self.built_in_ids),
            ("hands_free_markers", &self.hands_free_markers),
        ];
        for (name, list) in lists {
            if list.is_empty() {
                return Err(RoutingError::ConfigurationFailed(format!("{} must not be empty", name)));
            }
            if list.iter().any(|s| s.trim().is_empty()) {
                return Err(RoutingError::ConfigurationFailed(format!(
                    "{} contains an empty entry",
                    name
                )));
            }
        }
        Ok(())
    }
}

impl Default for ClassifierRules {
    fn default() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }
        Self {
            wireless_keywords: owned(&[
                "bluetooth",
                "airpods",
                "beats",
                "hfp",
                "a2dp",
                "bose",
                "jabra",
                "sony",
                "sennheiser",
                "jbl",
            ]),
            built_in_name_markers: owned(&["iphone", "built-in"]),
            built_in_ids: owned(&["default", "built-in-mic"]),
            hands_free_markers: owned(&["hands-free"]),
        }
    }
}

/// How to find one host module: by capability set first, then by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleQuery {
    pub capabilities: Vec<String>,
    pub name: Option<String>,
}

/// Host modules and method names for the four interception points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookTargets {
    pub audio_session: ModuleQuery,
    pub media_engine: ModuleQuery,
    pub voice_connection: ModuleQuery,
    /// Media engine method receiving `(device_id, ..)`.
    pub input_device_method: String,
    /// Audio session method receiving `(session_config, ..)`.
    pub session_configure_method: String,
    /// Voice connection method that completes a connection.
    pub connection_method: String,
    /// Voice connection method receiving `(device_id, ..)` during a call.
    pub call_input_method: String,
}

impl HookTargets {
    fn validate(&self) -> Result<(), RoutingError> {
        for (name, query) in [
            ("audio_session", &self.audio_session),
            ("media_engine", &self.media_engine),
            ("voice_connection", &self.voice_connection),
        ] {
            if query.capabilities.is_empty() && query.name.is_none() {
                return Err(RoutingError::ConfigurationFailed(format!(
                    "{} target needs capabilities or a name",
                    name
                )));
            }
        }
        for method in [
            &self.input_device_method,
            &self.session_configure_method,
            &self.connection_method,
            &self.call_input_method,
        ] {
            if method.is_empty() {
                return Err(RoutingError::ConfigurationFailed("empty hook method name".into()));
            }
        }
        Ok(())
    }
}

impl Default for HookTargets {
    fn default() -> Self {
        Self {
            audio_session: ModuleQuery {
                capabilities: vec!["configureAudioSession".into(), "setCommunicationModeOn".into()],
                name: Some("AudioManager".into()),
            },
            media_engine: ModuleQuery {
                capabilities: vec!["setAudioInputDevice".into(), "getAudioInputDevices".into()],
                name: Some("MediaEngine".into()),
            },
            voice_connection: ModuleQuery {
                capabilities: Vec::new(),
                name: Some("VoiceConnection".into()),
            },
            input_device_method: "setAudioInputDevice".into(),
            session_configure_method: "configureAudioSession".into(),
            connection_method: "connect".into(),
            call_input_method: "setInputDevice".into(),
        }
    }
}

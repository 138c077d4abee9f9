use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::RoutingError;

/// Audio session configuration the host passes before applying a session.
///
/// Mirrors the host payload field-for-field. Fields the policy does not know
/// about are carried in `extra` so a rewrite never drops them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_bluetooth: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_bluetooth_a2dp: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_to_speaker: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mix_with_others: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_input: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_output: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionConfig {
    /// Parse a host argument. Only JSON objects are session configs.
    pub fn from_value(value: &Value) -> Result<Self, RoutingError> {
        if !value.is_object() {
            return Err(RoutingError::InvalidArgument(format!(
                "session config must be an object, got {}",
                value
            )));
        }
        serde_json::from_value(value.clone())
            .map_err(|e| RoutingError::InvalidArgument(format!("malformed session config: {}", e)))
    }

    pub fn to_value(&self) -> Result<Value, RoutingError> {
        serde_json::to_value(self)
            .map_err(|e| RoutingError::InvalidArgument(format!("failed to encode session config: {}", e)))
    }
}

/// Values forced onto a [`SessionConfig`] while the user is in a call.
///
/// Defaults permit simultaneous Bluetooth input/output routing and disable
/// speaker fallback and mixing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionOverride {
    pub category: String,
    pub mode: String,
    pub allow_bluetooth: bool,
    pub allow_bluetooth_a2dp: bool,
    pub default_to_speaker: bool,
    pub mix_with_others: bool,
}

impl SessionOverride {
    /// Overwrite the routing fields of `config` in place. Preferred devices
    /// and unknown fields are left alone.
    pub fn apply(&self, config: &mut SessionConfig) {
        config.category = Some(self.category.clone());
        config.mode = Some(self.mode.clone());
        config.allow_bluetooth = Some(self.allow_bluetooth);
        config.allow_bluetooth_a2dp = Some(self.allow_bluetooth_a2dp);
        config.default_to_speaker = Some(self.default_to_speaker);
        config.mix_with_others = Some(self.mix_with_others);
    }
}

impl Default for SessionOverride {
    fn default() -> Self {
        Self {
            category: "playAndRecord".into(),
            mode: "voiceChat".into(),
            allow_bluetooth: true,
            allow_bluetooth_a2dp: true,
            default_to_speaker: false,
            mix_with_others: false,
        }
    }
}

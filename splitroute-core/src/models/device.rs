use serde::{Deserialize, Serialize};

/// Direction of an audio endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceDirection {
    Input,
    Output,
}

/// Routing class of a device, derived from its id and name. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Wireless,
    BuiltIn,
    Other,
}

/// A device as reported by the media engine for a single query.
///
/// Snapshots are never kept across enforcement passes; every pass re-reads
/// the platform's current lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub direction: DeviceDirection,
}

impl Device {
    pub fn input(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            direction: DeviceDirection::Input,
        }
    }

    pub fn output(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            direction: DeviceDirection::Output,
        }
    }
}

/// Signed-in user as reported by the user store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
}

/// Voice membership of a user. `channel_id` is `None` outside a call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VoiceState {
    pub channel_id: Option<String>,
}

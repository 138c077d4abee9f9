use serde::{Deserialize, Serialize};

/// What caused an enforcement pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementTrigger {
    Manual,
    ConnectionEstablished,
    InputRewrite,
}

/// Outcome of one direction of an enforcement pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DirectionOutcome {
    /// A set-device command was issued and accepted.
    Applied { device_id: String },
    /// No device matched the policy; nothing was sent.
    NoCandidate,
    /// The query or the set command failed.
    Failed { reason: String },
    /// The direction is not part of this pass.
    Skipped,
}

impl DirectionOutcome {
    pub fn applied_id(&self) -> Option<&str> {
        match self {
            Self::Applied { device_id } => Some(device_id),
            _ => None,
        }
    }
}

/// Result of one enforcement pass, reported to the delegate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementReport {
    pub id: String,
    pub trigger: EnforcementTrigger,
    pub input: DirectionOutcome,
    pub output: DirectionOutcome,
    pub completed_at: String,
}

impl EnforcementReport {
    pub fn new(trigger: EnforcementTrigger, input: DirectionOutcome, output: DirectionOutcome) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            trigger,
            input,
            output,
            completed_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Counters for debugging a plugin instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingDiagnostics {
    pub enforcement_passes: u64,
    pub input_rewrites: u64,
    pub call_input_rewrites: u64,
    pub session_overrides: u64,
    pub session_overrides_skipped: u64,
    pub deferred_scheduled: u64,
    pub deferred_cancelled: u64,
    pub query_failures: u64,
    pub command_failures: u64,
}

/// Plugin lifecycle state.
///
/// ```text
/// idle → running → stopped
///          ↑          │
///          └──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Idle,
    Running { hooks: usize },
    Stopped,
}

impl PluginState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    /// Number of live interception hooks.
    pub fn hook_count(&self) -> usize {
        match self {
            Self::Running { hooks } => *hooks,
            _ => 0,
        }
    }
}

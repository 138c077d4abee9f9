use crate::models::error::RoutingError;
use crate::models::report::EnforcementReport;
use crate::models::state::PluginState;

/// Event delegate for plugin notifications.
///
/// Enforcement reports from deferred passes arrive on the scheduler thread,
/// everything else on the thread that dispatched the host event.
pub trait RoutingDelegate: Send + Sync {
    fn on_state_changed(&self, state: &PluginState);

    fn on_enforcement(&self, report: &EnforcementReport);

    /// Called for failures the policy swallowed.
    fn on_error(&self, error: &RoutingError);
}

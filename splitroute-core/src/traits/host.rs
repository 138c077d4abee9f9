use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::models::error::RoutingError;

/// Argument list of an intercepted host call.
pub type HookArgs = Vec<Value>;

/// Runs before the host's own implementation. May rewrite `args` in place;
/// the host call receives whatever the hook leaves behind.
pub type BeforeHook = Arc<dyn Fn(&mut HookArgs) + Send + Sync + 'static>;

/// Runs after the host's own implementation with the final arguments and
/// the call's result.
pub type AfterHook = Arc<dyn Fn(&[Value], &Value) + Send + Sync + 'static>;

/// Opaque reference to a resolved host module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleRef {
    id: String,
}

impl ModuleRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Locates host modules. Either lookup may come back empty.
pub trait ModuleResolver: Send + Sync {
    /// Find a module exposing every named capability.
    fn find_by_capabilities(&self, capabilities: &[String]) -> Option<ModuleRef>;

    /// Find a module by its registered name.
    fn find_by_name(&self, name: &str) -> Option<ModuleRef>;
}

/// Attaches hooks to host methods.
pub trait Patcher: Send + Sync {
    fn before(&self, method: &str, target: &ModuleRef, hook: BeforeHook) -> Result<PatchHandle, RoutingError>;

    fn after(&self, method: &str, target: &ModuleRef, hook: AfterHook) -> Result<PatchHandle, RoutingError>;
}

/// Unregistration token for one hook.
///
/// Consumed by [`PatchHandle::unpatch`], so the unregistration runs at most
/// once. A handle dropped while still live unpatches itself.
pub struct PatchHandle {
    label: String,
    unpatch: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl PatchHandle {
    pub fn new(label: impl Into<String>, unpatch: impl FnOnce() + Send + 'static) -> Self {
        Self {
            label: label.into(),
            unpatch: Some(Box::new(unpatch)),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn unpatch(mut self) {
        if let Some(unpatch) = self.unpatch.take() {
            log::debug!("Unpatching {}", self.label);
            unpatch();
        }
    }
}

impl Drop for PatchHandle {
    fn drop(&mut self) {
        if let Some(unpatch) = self.unpatch.take() {
            log::warn!("Patch handle {} dropped while live; unpatching", self.label);
            unpatch();
        }
    }
}

impl fmt::Debug for PatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatchHandle")
            .field("label", &self.label)
            .field("live", &self.unpatch.is_some())
            .finish()
    }
}

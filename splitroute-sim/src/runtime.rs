//! Module registry and patch table.
//!
//! Every call goes through [`HostRuntime::invoke`], which runs `before`
//! hooks (free to rewrite arguments), the native method, then `after`
//! hooks. Hook lists are snapshotted before dispatch so hooks may call back
//! into the runtime.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;

use splitroute_core::{AfterHook, BeforeHook, HookArgs, ModuleRef, ModuleResolver, PatchHandle, Patcher, RoutingError};

use crate::error::HostError;

/// Native implementation of a host method.
pub type NativeMethod = Arc<dyn Fn(&[Value]) -> Result<Value, HostError> + Send + Sync + 'static>;

struct Module {
    capabilities: BTreeSet<String>,
    methods: HashMap<String, NativeMethod>,
}

enum Hook {
    Before(BeforeHook),
    After(AfterHook),
}

struct Patch {
    id: u64,
    hook: Hook,
}

#[derive(Default)]
struct Registry {
    // Insertion order decides capability lookup ties.
    order: Vec<String>,
    modules: HashMap<String, Module>,
    patches: HashMap<(String, String), Vec<Patch>>,
    next_patch_id: u64,
}

/// In-process host: named modules with native methods, patchable per method.
#[derive(Clone, Default)]
pub struct HostRuntime {
    registry: Arc<Mutex<Registry>>,
}

impl HostRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module. Re-registering a name replaces its methods.
    pub fn register_module(&self, name: &str, capabilities: &[&str]) -> ModuleRef {
        let mut registry = self.registry.lock();
        if !registry.modules.contains_key(name) {
            registry.order.push(name.to_string());
        }
        registry.modules.insert(
            name.to_string(),
            Module {
                capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
                methods: HashMap::new(),
            },
        );
        ModuleRef::new(name)
    }

    pub fn define_method(&self, module: &ModuleRef, method: &str, native: NativeMethod) -> Result<(), HostError> {
        let mut registry = self.registry.lock();
        let entry = registry
            .modules
            .get_mut(module.id())
            .ok_or_else(|| HostError::UnknownModule(module.id().to_string()))?;
        entry.methods.insert(method.to_string(), native);
        Ok(())
    }

    /// Call `module.method(args)` through its patch chain.
    pub fn invoke(&self, module: &ModuleRef, method: &str, mut args: HookArgs) -> Result<Value, HostError> {
        let (native, befores, afters) = {
            let registry = self.registry.lock();
            let entry = registry
                .modules
                .get(module.id())
                .ok_or_else(|| HostError::UnknownModule(module.id().to_string()))?;
            let native = entry
                .methods
                .get(method)
                .cloned()
                .ok_or_else(|| HostError::UnknownMethod {
                    module: module.id().to_string(),
                    method: method.to_string(),
                })?;

            let mut befores = Vec::new();
            let mut afters = Vec::new();
            if let Some(patches) = registry.patches.get(&(module.id().to_string(), method.to_string())) {
                for patch in patches {
                    match patch.hook {
                        Hook::Before(ref hook) => befores.push(Arc::clone(hook)),
                        Hook::After(ref hook) => afters.push(Arc::clone(hook)),
                    }
                }
            }
            (native, befores, afters)
        };

        for hook in &befores {
            hook(&mut args);
        }
        let result = native(&args)?;
        for hook in &afters {
            hook(&args, &result);
        }
        Ok(result)
    }

    /// Number of hooks currently attached across all methods.
    pub fn live_patch_count(&self) -> usize {
        self.registry.lock().patches.values().map(Vec::len).sum()
    }

    fn attach(&self, method: &str, target: &ModuleRef, hook: Hook) -> Result<PatchHandle, RoutingError> {
        let id = {
            let mut registry = self.registry.lock();
            let defined = registry
                .modules
                .get(target.id())
                .map(|m| m.methods.contains_key(method))
                .unwrap_or(false);
            if !defined {
                return Err(RoutingError::PatchFailed(format!("{}.{} is not defined", target, method)));
            }
            let id = registry.next_patch_id;
            registry.next_patch_id += 1;
            registry
                .patches
                .entry((target.id().to_string(), method.to_string()))
                .or_default()
                .push(Patch { id, hook });
            id
        };

        let registry: Weak<Mutex<Registry>> = Arc::downgrade(&self.registry);
        let key = (target.id().to_string(), method.to_string());
        Ok(PatchHandle::new(format!("{}.{}#{}", target, method, id), move || {
            if let Some(registry) = registry.upgrade() {
                let mut registry = registry.lock();
                if let Some(patches) = registry.patches.get_mut(&key) {
                    patches.retain(|p| p.id != id);
                    if patches.is_empty() {
                        registry.patches.remove(&key);
                    }
                }
            }
        }))
    }
}

impl ModuleResolver for HostRuntime {
    fn find_by_capabilities(&self, capabilities: &[String]) -> Option<ModuleRef> {
        let registry = self.registry.lock();
        registry
            .order
            .iter()
            .find(|name| {
                registry
                    .modules
                    .get(*name)
                    .map(|m| capabilities.iter().all(|c| m.capabilities.contains(c)))
                    .unwrap_or(false)
            })
            .map(|name| ModuleRef::new(name.clone()))
    }

    fn find_by_name(&self, name: &str) -> Option<ModuleRef> {
        self.registry
            .lock()
            .modules
            .contains_key(name)
            .then(|| ModuleRef::new(name))
    }
}

impl Patcher for HostRuntime {
    fn before(&self, method: &str, target: &ModuleRef, hook: BeforeHook) -> Result<PatchHandle, RoutingError> {
        self.attach(method, target, Hook::Before(hook))
    }

    fn after(&self, method: &str, target: &ModuleRef, hook: AfterHook) -> Result<PatchHandle, RoutingError> {
        self.attach(method, target, Hook::After(hook))
    }
}

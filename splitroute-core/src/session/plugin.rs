use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::config::{HookTargets, ModuleQuery, RoutingConfiguration};
use crate::models::error::RoutingError;
use crate::models::report::{EnforcementReport, RoutingDiagnostics};
use crate::models::state::PluginState;
use crate::policy::classifier::DeviceClassifier;
use crate::policy::guard::SessionStateGuard;
use crate::policy::selector::DeviceSelector;
use crate::traits::host::{ModuleRef, ModuleResolver, PatchHandle, Patcher};
use crate::traits::media_engine::MediaEngine;
use crate::traits::routing_delegate::RoutingDelegate;
use crate::traits::session_bridge::SessionBridge;
use crate::traits::stores::{UserStore, VoiceStateStore};

use super::enforcer::RoutingEnforcer;
use super::interception::{Interceptor, InterceptorSettings};
use super::scheduler::DeferredScheduler;

/// External collaborators supplied by the host.
///
/// Only module resolution and patching are mandatory; every other
/// collaborator degrades to a no-op when absent.
#[derive(Clone)]
pub struct Collaborators {
    pub resolver: Arc<dyn ModuleResolver>,
    pub patcher: Arc<dyn Patcher>,
    pub media_engine: Option<Arc<dyn MediaEngine>>,
    pub session_bridge: Option<Arc<dyn SessionBridge>>,
    pub users: Option<Arc<dyn UserStore>>,
    pub voice_states: Option<Arc<dyn VoiceStateStore>>,
}

/// Host modules resolved at start. A `None` module disables the
/// interception points patched onto it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostContext {
    pub audio_session: Option<ModuleRef>,
    pub media_engine: Option<ModuleRef>,
    pub voice_connection: Option<ModuleRef>,
}

impl HostContext {
    pub fn resolve(resolver: &dyn ModuleResolver, targets: &HookTargets) -> Self {
        Self {
            audio_session: resolve_module(resolver, "audio session", &targets.audio_session),
            media_engine: resolve_module(resolver, "media engine", &targets.media_engine),
            voice_connection: resolve_module(resolver, "voice connection", &targets.voice_connection),
        }
    }
}

fn resolve_module(resolver: &dyn ModuleResolver, label: &str, query: &ModuleQuery) -> Option<ModuleRef> {
    let found = if query.capabilities.is_empty() {
        None
    } else {
        resolver.find_by_capabilities(&query.capabilities)
    };
    let found = found.or_else(|| query.name.as_deref().and_then(|name| resolver.find_by_name(name)));
    match found {
        Some(ref module) => log::debug!("Resolved {} module as {}", label, module),
        None => log::warn!("Could not resolve {} module; its interception points stay inactive", label),
    }
    found
}

/// Routing policy plugin: owns the interception hooks and their lifetime.
///
/// ```text
/// start() → resolve HostContext → patch 4 interception points → Running
/// stop()  → deactivate rules → unpatch every handle → cancel deferred passes → Stopped
/// ```
///
/// Each `start()` builds a fresh [`Interceptor`] with its own scheduler, so
/// nothing from a stopped run can leak into the next.
pub struct RoutingPlugin {
    collaborators: Collaborators,
    config: RoutingConfiguration,
    classifier: DeviceClassifier,
    delegate: Option<Arc<dyn RoutingDelegate>>,
    state: PluginState,
    handles: Vec<PatchHandle>,
    interceptor: Option<Arc<Interceptor>>,
    diagnostics: Arc<Mutex<RoutingDiagnostics>>,
}

impl RoutingPlugin {
    pub fn new(collaborators: Collaborators, config: RoutingConfiguration) -> Result<Self, RoutingError> {
        config.validate()?;
        Ok(Self {
            collaborators,
            classifier: DeviceClassifier::new(&config.classifier),
            config,
            delegate: None,
            state: PluginState::Idle,
            handles: Vec::new(),
            interceptor: None,
            diagnostics: Arc::new(Mutex::new(RoutingDiagnostics::default())),
        })
    }

    /// Takes effect on the next `start()`.
    pub fn set_delegate(&mut self, delegate: Arc<dyn RoutingDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> PluginState {
        self.state
    }

    pub fn hook_count(&self) -> usize {
        self.handles.len()
    }

    pub fn config(&self) -> &RoutingConfiguration {
        &self.config
    }

    pub fn diagnostics(&self) -> RoutingDiagnostics {
        self.diagnostics.lock().clone()
    }

    /// Run one enforcement pass immediately, outside any host event.
    pub fn enforce_now(&self) -> EnforcementReport {
        self.build_enforcer().enforce()
    }

    /// Wait up to `timeout` for deferred passes of the current run to finish.
    /// Returns `true` immediately when the plugin is not running.
    pub fn wait_for_deferred(&self, timeout: Duration) -> bool {
        self.interceptor
            .as_ref()
            .map_or(true, |interceptor| interceptor.wait_for_deferred(timeout))
    }

    /// Register all interception points. Points whose module or patch fails
    /// are skipped; the plugin still starts.
    pub fn start(&mut self) -> Result<(), RoutingError> {
        if self.state.is_running() {
            return Err(RoutingError::InvalidState("plugin already running".into()));
        }

        let context = HostContext::resolve(self.collaborators.resolver.as_ref(), &self.config.targets);
        let interceptor = Arc::new(self.build_interceptor());
        let patcher = Arc::clone(&self.collaborators.patcher);
        let targets = &self.config.targets;

        let mut handles = Vec::with_capacity(4);
        handles.extend(register(
            context.media_engine.as_ref(),
            &targets.input_device_method,
            |method, module| patcher.before(method, module, interceptor.input_device_hook()),
        ));
        handles.extend(register(
            context.audio_session.as_ref(),
            &targets.session_configure_method,
            |method, module| patcher.before(method, module, interceptor.session_configure_hook()),
        ));
        handles.extend(register(
            context.voice_connection.as_ref(),
            &targets.connection_method,
            |method, module| patcher.after(method, module, interceptor.connection_hook()),
        ));
        handles.extend(register(
            context.voice_connection.as_ref(),
            &targets.call_input_method,
            |method, module| patcher.before(method, module, interceptor.call_input_hook()),
        ));

        log::info!("Routing plugin started with {} of 4 interception points", handles.len());
        self.handles = handles;
        self.interceptor = Some(interceptor);
        self.set_state(PluginState::Running {
            hooks: self.handles.len(),
        });
        Ok(())
    }

    /// Unregister every hook exactly once and cancel pending deferred passes.
    /// No handler fires after this returns. Stopping a stopped plugin is a no-op.
    pub fn stop(&mut self) {
        if !self.state.is_running() {
            return;
        }

        // Deactivate first: the host may already be dispatching a hook.
        let interceptor = self.interceptor.take();
        if let Some(ref interceptor) = interceptor {
            interceptor.deactivate();
        }
        for handle in self.handles.drain(..) {
            handle.unpatch();
        }
        let cancelled = interceptor.map_or(0, |interceptor| interceptor.shutdown());
        self.diagnostics.lock().deferred_cancelled += cancelled as u64;

        log::info!("Routing plugin stopped ({} deferred passes cancelled)", cancelled);
        self.set_state(PluginState::Stopped);
    }

    fn build_enforcer(&self) -> RoutingEnforcer {
        RoutingEnforcer::new(
            self.collaborators.media_engine.clone(),
            DeviceSelector::new(self.classifier.clone()),
            self.delegate.clone(),
            Arc::clone(&self.diagnostics),
        )
    }

    fn build_interceptor(&self) -> Interceptor {
        Interceptor::new(
            Arc::new(self.build_enforcer()),
            SessionStateGuard::new(self.collaborators.users.clone(), self.collaborators.voice_states.clone()),
            Arc::new(DeferredScheduler::new()),
            self.collaborators.session_bridge.clone(),
            InterceptorSettings {
                session_override: self.config.session_override.clone(),
                settle_delay: self.config.settle_delay(),
                pin_preferred_devices: self.config.pin_preferred_devices,
                reassert_session_on_connect: self.config.reassert_session_on_connect,
            },
            Arc::clone(&self.diagnostics),
        )
    }

    fn set_state(&mut self, state: PluginState) {
        self.state = state;
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&state);
        }
    }
}

impl Drop for RoutingPlugin {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Patch one interception point, logging instead of failing.
fn register(
    module: Option<&ModuleRef>,
    method: &str,
    attach: impl FnOnce(&str, &ModuleRef) -> Result<PatchHandle, RoutingError>,
) -> Option<PatchHandle> {
    let module = module?;
    match attach(method, module) {
        Ok(handle) => {
            log::debug!("Patched {}.{}", module, method);
            Some(handle)
        }
        Err(e) => {
            log::warn!("Failed to patch {}.{}: {}", module, method, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::report::DirectionOutcome;
    use crate::session::enforcer::tests::FakeEngine;
    use crate::traits::host::{AfterHook, BeforeHook};

    /// Resolver that knows a fixed set of module names.
    struct Names(Vec<&'static str>);

    impl ModuleResolver for Names {
        fn find_by_capabilities(&self, _capabilities: &[String]) -> Option<ModuleRef> {
            None
        }

        fn find_by_name(&self, name: &str) -> Option<ModuleRef> {
            self.0.iter().any(|n| *n == name).then(|| ModuleRef::new(name))
        }
    }

    /// Patcher that counts live hooks and can refuse one method.
    #[derive(Default)]
    struct CountingPatcher {
        live: Arc<Mutex<Vec<String>>>,
        refuse: Option<&'static str>,
    }

    impl CountingPatcher {
        fn attach(&self, method: &str, target: &ModuleRef) -> Result<PatchHandle, RoutingError> {
            if self.refuse == Some(method) {
                return Err(RoutingError::PatchFailed(format!("{} is frozen", method)));
            }
            let label = format!("{}.{}", target, method);
            self.live.lock().push(label.clone());
            let live = Arc::clone(&self.live);
            let key = label.clone();
            Ok(PatchHandle::new(label, move || live.lock().retain(|l| *l != key)))
        }
    }

    impl Patcher for CountingPatcher {
        fn before(&self, method: &str, target: &ModuleRef, _hook: BeforeHook) -> Result<PatchHandle, RoutingError> {
            self.attach(method, target)
        }

        fn after(&self, method: &str, target: &ModuleRef, _hook: AfterHook) -> Result<PatchHandle, RoutingError> {
            self.attach(method, target)
        }
    }

    fn collaborators(resolver: Names, patcher: Arc<CountingPatcher>) -> Collaborators {
        Collaborators {
            resolver: Arc::new(resolver),
            patcher,
            media_engine: Some(Arc::new(FakeEngine::airpods())),
            session_bridge: None,
            users: None,
            voice_states: None,
        }
    }

    fn all_modules() -> Names {
        Names(vec!["AudioManager", "MediaEngine", "VoiceConnection"])
    }

    #[test]
    fn start_registers_four_points_and_stop_removes_them() {
        let patcher = Arc::new(CountingPatcher::default());
        let mut plugin =
            RoutingPlugin::new(collaborators(all_modules(), Arc::clone(&patcher)), RoutingConfiguration::default()).unwrap();

        plugin.start().unwrap();
        assert_eq!(plugin.state(), PluginState::Running { hooks: 4 });
        assert_eq!(patcher.live.lock().len(), 4);

        plugin.stop();
        assert_eq!(plugin.state(), PluginState::Stopped);
        assert_eq!(plugin.hook_count(), 0);
        assert!(patcher.live.lock().is_empty());
    }

    #[test]
    fn double_start_is_rejected() {
        let patcher = Arc::new(CountingPatcher::default());
        let mut plugin =
            RoutingPlugin::new(collaborators(all_modules(), patcher), RoutingConfiguration::default()).unwrap();
        plugin.start().unwrap();
        assert!(matches!(plugin.start(), Err(RoutingError::InvalidState(_))));
    }

    #[test]
    fn restart_after_stop() {
        let patcher = Arc::new(CountingPatcher::default());
        let mut plugin =
            RoutingPlugin::new(collaborators(all_modules(), Arc::clone(&patcher)), RoutingConfiguration::default()).unwrap();
        plugin.start().unwrap();
        plugin.stop();
        plugin.stop();
        plugin.start().unwrap();
        assert_eq!(patcher.live.lock().len(), 4);
        assert!(plugin.interceptor.as_ref().is_some_and(|i| i.is_active()));
    }

    #[test]
    fn stop_deactivates_interceptor_before_unpatching() {
        let patcher = Arc::new(CountingPatcher::default());
        let mut plugin =
            RoutingPlugin::new(collaborators(all_modules(), Arc::clone(&patcher)), RoutingConfiguration::default()).unwrap();
        plugin.start().unwrap();
        let interceptor = plugin.interceptor.clone().unwrap();

        plugin.stop();
        assert!(!interceptor.is_active());
        assert!(plugin.wait_for_deferred(Duration::ZERO));

        // A hook captured before stop reaches the rule afterwards.
        let mut args = vec![serde_json::json!("bt-airpods-1")];
        interceptor.input_device_hook()(&mut args);
        assert_eq!(args, vec![serde_json::json!("bt-airpods-1")]);
        assert_eq!(plugin.diagnostics().input_rewrites, 0);
    }

    #[test]
    fn unresolved_module_skips_its_points() {
        let patcher = Arc::new(CountingPatcher::default());
        let mut plugin = RoutingPlugin::new(
            collaborators(Names(vec!["AudioManager", "MediaEngine"]), Arc::clone(&patcher)),
            RoutingConfiguration::default(),
        )
        .unwrap();
        plugin.start().unwrap();
        assert_eq!(plugin.hook_count(), 2);
    }

    #[test]
    fn failed_patch_is_skipped() {
        let patcher = Arc::new(CountingPatcher {
            refuse: Some("configureAudioSession"),
            ..Default::default()
        });
        let mut plugin =
            RoutingPlugin::new(collaborators(all_modules(), Arc::clone(&patcher)), RoutingConfiguration::default()).unwrap();
        plugin.start().unwrap();
        assert_eq!(plugin.state().hook_count(), 3);
    }

    #[test]
    fn nothing_resolved_leaves_plugin_inert() {
        let patcher = Arc::new(CountingPatcher::default());
        let mut plugin =
            RoutingPlugin::new(collaborators(Names(vec![]), patcher), RoutingConfiguration::default()).unwrap();
        plugin.start().unwrap();
        assert_eq!(plugin.state(), PluginState::Running { hooks: 0 });
    }

    #[test]
    fn drop_unpatches() {
        let patcher = Arc::new(CountingPatcher::default());
        {
            let mut plugin = RoutingPlugin::new(
                collaborators(all_modules(), Arc::clone(&patcher)),
                RoutingConfiguration::default(),
            )
            .unwrap();
            plugin.start().unwrap();
        }
        assert!(patcher.live.lock().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = RoutingConfiguration {
            settle_delay_ms: u64::MAX,
            ..Default::default()
        };
        let result = RoutingPlugin::new(
            collaborators(all_modules(), Arc::new(CountingPatcher::default())),
            config,
        );
        assert!(matches!(result, Err(RoutingError::ConfigurationFailed(_))));
    }

    #[test]
    fn enforce_now_runs_a_pass() {
        let plugin = RoutingPlugin::new(
            collaborators(all_modules(), Arc::new(CountingPatcher::default())),
            RoutingConfiguration::default(),
        )
        .unwrap();
        let report = plugin.enforce_now();
        assert_eq!(report.input, DirectionOutcome::Applied { device_id: "default".into() });
        assert_eq!(plugin.diagnostics().enforcement_passes, 1);
    }

    #[test]
    fn capability_lookup_precedes_name() {
        struct Caps;
        impl ModuleResolver for Caps {
            fn find_by_capabilities(&self, capabilities: &[String]) -> Option<ModuleRef> {
                capabilities
                    .iter()
                    .any(|c| c == "setAudioInputDevice")
                    .then(|| ModuleRef::new("engine#42"))
            }
            fn find_by_name(&self, name: &str) -> Option<ModuleRef> {
                Some(ModuleRef::new(name))
            }
        }

        let context = HostContext::resolve(&Caps, &HookTargets::default());
        assert_eq!(context.media_engine, Some(ModuleRef::new("engine#42")));
        assert_eq!(context.audio_session, Some(ModuleRef::new("AudioManager")));
        assert_eq!(context.voice_connection, Some(ModuleRef::new("VoiceConnection")));
    }
}

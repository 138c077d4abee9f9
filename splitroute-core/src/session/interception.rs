//! Reactions to intercepted host events.
//!
//! Four rules, each independent of the others:
//!
//! ```text
//! before setAudioInputDevice   → wireless id? swap in built-in mic, re-assert wireless output
//! before configureAudioSession → in call? force split-routing session fields
//! after  connect               → re-enforce once the platform has settled
//! before setInputDevice (call) → wireless id? swap in built-in mic
//! ```
//!
//! Corrections never re-trigger the rule that issued them: the rewritten
//! input id is built-in, so it passes rule 1 untouched.
//!
//! Once deactivated, every rule and every pending deferred pass is a no-op,
//! including hooks the host had already dispatched when teardown began.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use crate::models::report::{EnforcementTrigger, RoutingDiagnostics};
use crate::models::session_config::{SessionConfig, SessionOverride};
use crate::policy::guard::SessionStateGuard;
use crate::traits::host::{AfterHook, BeforeHook, HookArgs};
use crate::traits::session_bridge::SessionBridge;

use super::enforcer::RoutingEnforcer;
use super::scheduler::{DeferredScheduler, DeferredTask};

/// Shared state behind the four interception hooks.
pub struct Interceptor {
    enforcer: Arc<RoutingEnforcer>,
    guard: SessionStateGuard,
    scheduler: Arc<DeferredScheduler>,
    bridge: Option<Arc<dyn SessionBridge>>,
    session_override: SessionOverride,
    settle_delay: Duration,
    pin_preferred_devices: bool,
    reassert_session_on_connect: bool,
    diagnostics: Arc<Mutex<RoutingDiagnostics>>,
    active: Arc<AtomicBool>,
}

/// Settings for an [`Interceptor`], taken from the plugin configuration.
#[derive(Debug, Clone)]
pub struct InterceptorSettings {
    pub session_override: SessionOverride,
    pub settle_delay: Duration,
    pub pin_preferred_devices: bool,
    pub reassert_session_on_connect: bool,
}

impl Interceptor {
    pub fn new(
        enforcer: Arc<RoutingEnforcer>,
        guard: SessionStateGuard,
        scheduler: Arc<DeferredScheduler>,
        bridge: Option<Arc<dyn SessionBridge>>,
        settings: InterceptorSettings,
        diagnostics: Arc<Mutex<RoutingDiagnostics>>,
    ) -> Self {
        Self {
            enforcer,
            guard,
            scheduler,
            bridge,
            session_override: settings.session_override,
            settle_delay: settings.settle_delay,
            pin_preferred_devices: settings.pin_preferred_devices,
            reassert_session_on_connect: settings.reassert_session_on_connect,
            diagnostics,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Turn every rule into a no-op. Irreversible.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Deactivate, then cancel pending deferred passes and wait for a running
    /// one. Returns how many passes were cancelled before they ran.
    pub fn shutdown(&self) -> usize {
        self.deactivate();
        self.scheduler.shutdown()
    }

    /// Wait up to `timeout` for scheduled deferred passes to finish.
    pub fn wait_for_deferred(&self, timeout: Duration) -> bool {
        self.scheduler.wait_idle(timeout)
    }

    /// Rule 1: general input-device selection.
    pub fn on_before_input_device(&self, args: &mut HookArgs) {
        if !self.is_active() {
            return;
        }
        if self.rewrite_wireless_input(args) {
            self.diagnostics.lock().input_rewrites += 1;
            // The platform couples directions; pin the output before it follows the input.
            self.enforcer.ensure_wireless_output();
        }
    }

    /// Rule 2: audio session configuration.
    pub fn on_before_session_configure(&self, args: &mut HookArgs) {
        if !self.is_active() {
            return;
        }
        if !self.guard.is_in_call() {
            log::debug!("Not in a call; leaving session config untouched");
            self.diagnostics.lock().session_overrides_skipped += 1;
            return;
        }

        let Some(raw) = args.first_mut() else {
            log::warn!("Session configure called without a config argument");
            return;
        };
        let mut config = match SessionConfig::from_value(raw) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Leaving session config untouched: {}", e);
                return;
            }
        };

        self.apply_session_override(&mut config);
        match config.to_value() {
            Ok(value) => {
                *raw = value;
                self.diagnostics.lock().session_overrides += 1;
                log::info!("Applied in-call session override");
            }
            Err(e) => log::warn!("Failed to rewrite session config: {}", e),
        }
    }

    /// Rule 3: a voice connection completed.
    pub fn on_connection_established(&self, _args: &[Value], _result: &Value) {
        if !self.is_active() {
            log::debug!("Interceptor inactive; connection event ignored");
            return;
        }
        match self
            .scheduler
            .schedule("settle", self.settle_delay, self.deferred_pass())
        {
            Ok(()) => {
                self.diagnostics.lock().deferred_scheduled += 1;
                log::debug!("Re-enforcement scheduled in {:?}", self.settle_delay);
            }
            Err(e) => log::warn!("Failed to schedule re-enforcement: {}", e),
        }
    }

    /// Rule 4: in-call input-device switch. Output is assumed correct here.
    pub fn on_before_call_input_device(&self, args: &mut HookArgs) {
        if !self.is_active() {
            return;
        }
        if self.rewrite_wireless_input(args) {
            self.diagnostics.lock().call_input_rewrites += 1;
        }
    }

    pub fn input_device_hook(self: &Arc<Self>) -> BeforeHook {
        let this = Arc::clone(self);
        Arc::new(move |args: &mut HookArgs| this.on_before_input_device(args))
    }

    pub fn session_configure_hook(self: &Arc<Self>) -> BeforeHook {
        let this = Arc::clone(self);
        Arc::new(move |args: &mut HookArgs| this.on_before_session_configure(args))
    }

    pub fn connection_hook(self: &Arc<Self>) -> AfterHook {
        let this = Arc::clone(self);
        Arc::new(move |args: &[Value], result: &Value| this.on_connection_established(args, result))
    }

    pub fn call_input_hook(self: &Arc<Self>) -> BeforeHook {
        let this = Arc::clone(self);
        Arc::new(move |args: &mut HookArgs| this.on_before_call_input_device(args))
    }

    /// Replace a wireless device id in `args[0]` with the built-in mic id.
    ///
    /// Missing or non-string ids are left for the host to reject.
    fn rewrite_wireless_input(&self, args: &mut HookArgs) -> bool {
        let Some(Value::String(proposed)) = args.first() else {
            return false;
        };
        if !self.enforcer.selector().classifier().is_wireless(proposed) {
            return false;
        }

        let replacement = self.enforcer.resolve_built_in_mic_id();
        log::info!("Redirecting input from {} to {}", proposed, replacement);
        args[0] = Value::String(replacement);
        true
    }

    fn apply_session_override(&self, config: &mut SessionConfig) {
        apply_override(&self.session_override, &self.enforcer, self.pin_preferred_devices, config);
    }

    /// The task run once the connection settles. Captures only what it needs
    /// so a pending task never keeps the scheduler alive.
    fn deferred_pass(&self) -> DeferredTask {
        let enforcer = Arc::clone(&self.enforcer);
        let guard = self.guard.clone();
        let bridge = if self.reassert_session_on_connect {
            self.bridge.clone()
        } else {
            None
        };
        let session_override = self.session_override.clone();
        let pin_preferred_devices = self.pin_preferred_devices;
        let active = Arc::clone(&self.active);

        Box::new(move || {
            if !active.load(Ordering::SeqCst) {
                return;
            }
            enforcer.enforce_for(EnforcementTrigger::ConnectionEstablished);

            let Some(bridge) = bridge else {
                return;
            };
            if !guard.is_in_call() {
                return;
            }
            let mut config = SessionConfig::default();
            apply_override(&session_override, &enforcer, pin_preferred_devices, &mut config);
            if let Err(e) = bridge.send(&config) {
                log::warn!("Failed to reassert session config: {}", e);
            }
        })
    }
}

fn apply_override(
    session_override: &SessionOverride,
    enforcer: &RoutingEnforcer,
    pin_preferred_devices: bool,
    config: &mut SessionConfig,
) {
    session_override.apply(config);
    if pin_preferred_devices {
        config.preferred_input = Some(enforcer.resolve_built_in_mic_id());
        if let Some(output) = enforcer.wireless_output_id() {
            config.preferred_output = Some(output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::models::device::{Device, DeviceDirection, User, VoiceState};
    use crate::models::error::RoutingError;
    use crate::policy::selector::DeviceSelector;
    use crate::session::enforcer::tests::FakeEngine;
    use crate::traits::stores::{UserStore, VoiceStateStore};

    struct Store {
        channel: Option<String>,
    }

    impl UserStore for Store {
        fn current_user(&self) -> Result<Option<User>, RoutingError> {
            Ok(Some(User { id: "u1".into() }))
        }
    }

    impl VoiceStateStore for Store {
        fn voice_state_for_user(&self, _user_id: &str) -> Result<Option<VoiceState>, RoutingError> {
            Ok(Some(VoiceState {
                channel_id: self.channel.clone(),
            }))
        }
    }

    #[derive(Default)]
    struct Bridge {
        sent: Mutex<Vec<SessionConfig>>,
    }

    impl SessionBridge for Bridge {
        fn send(&self, config: &SessionConfig) -> Result<(), RoutingError> {
            self.sent.lock().push(config.clone());
            Ok(())
        }
    }

    struct Fixture {
        engine: Arc<FakeEngine>,
        bridge: Arc<Bridge>,
        interceptor: Arc<Interceptor>,
        diagnostics: Arc<Mutex<RoutingDiagnostics>>,
    }

    fn fixture(engine: FakeEngine, in_call: bool, settings: InterceptorSettings) -> Fixture {
        let engine = Arc::new(engine);
        let diagnostics = Arc::new(Mutex::new(RoutingDiagnostics::default()));
        let enforcer = Arc::new(RoutingEnforcer::new(
            Some(Arc::clone(&engine) as Arc<dyn crate::traits::media_engine::MediaEngine>),
            DeviceSelector::default(),
            None,
            Arc::clone(&diagnostics),
        ));
        let store = Arc::new(Store {
            channel: in_call.then(|| "c1".to_string()),
        });
        let guard = SessionStateGuard::new(
            Some(Arc::clone(&store) as Arc<dyn UserStore>),
            Some(store as Arc<dyn VoiceStateStore>),
        );
        let bridge = Arc::new(Bridge::default());
        let interceptor = Arc::new(Interceptor::new(
            enforcer,
            guard,
            Arc::new(DeferredScheduler::new()),
            Some(Arc::clone(&bridge) as Arc<dyn SessionBridge>),
            settings,
            Arc::clone(&diagnostics),
        ));
        Fixture {
            engine,
            bridge,
            interceptor,
            diagnostics,
        }
    }

    fn settings() -> InterceptorSettings {
        InterceptorSettings {
            session_override: SessionOverride::default(),
            settle_delay: Duration::from_millis(10),
            pin_preferred_devices: true,
            reassert_session_on_connect: false,
        }
    }

    #[test]
    fn wireless_input_is_rewritten_and_output_ensured() {
        let f = fixture(FakeEngine::airpods(), false, settings());
        let mut args = vec![json!("bt-airpods-1")];
        f.interceptor.on_before_input_device(&mut args);

        assert_eq!(args, vec![json!("default")]);
        assert_eq!(
            *f.engine.commands.lock(),
            vec![(DeviceDirection::Output, "bt-airpods-1".to_string())]
        );
        assert_eq!(f.diagnostics.lock().input_rewrites, 1);
    }

    #[test]
    fn rewrite_falls_back_to_default_without_named_mic() {
        let engine = FakeEngine::default();
        *engine.inputs.lock() = vec![Device::input("bt-airpods-1", "AirPods")];
        let f = fixture(engine, false, settings());

        let mut args = vec![json!("bt-airpods-1"), json!({ "source": "user" })];
        f.interceptor.on_before_input_device(&mut args);
        assert_eq!(args[0], json!("default"));
        assert_eq!(args[1], json!({ "source": "user" }));
    }

    #[test]
    fn wired_input_passes_through() {
        let f = fixture(FakeEngine::airpods(), false, settings());
        let mut args = vec![json!("usb-mic")];
        f.interceptor.on_before_input_device(&mut args);

        assert_eq!(args, vec![json!("usb-mic")]);
        assert!(f.engine.commands.lock().is_empty());
    }

    #[test]
    fn malformed_input_args_pass_through() {
        let f = fixture(FakeEngine::airpods(), false, settings());
        let mut empty: HookArgs = Vec::new();
        f.interceptor.on_before_input_device(&mut empty);
        assert!(empty.is_empty());

        let mut numeric = vec![json!(7)];
        f.interceptor.on_before_input_device(&mut numeric);
        assert_eq!(numeric, vec![json!(7)]);
        assert!(f.engine.commands.lock().is_empty());
    }

    #[test]
    fn call_input_rewrite_skips_output() {
        let f = fixture(FakeEngine::airpods(), true, settings());
        let mut args = vec![json!("BT-AIRPODS-1")];
        f.interceptor.on_before_call_input_device(&mut args);

        assert_eq!(args, vec![json!("default")]);
        assert!(f.engine.commands.lock().is_empty());
        assert_eq!(f.diagnostics.lock().call_input_rewrites, 1);
    }

    #[test]
    fn session_config_untouched_outside_call() {
        let f = fixture(FakeEngine::airpods(), false, settings());
        let original = json!({ "category": "playback", "mixWithOthers": true });
        let mut args = vec![original.clone()];
        f.interceptor.on_before_session_configure(&mut args);

        assert_eq!(args, vec![original]);
        assert_eq!(f.diagnostics.lock().session_overrides_skipped, 1);
    }

    #[test]
    fn session_config_overridden_in_call() {
        let f = fixture(FakeEngine::airpods(), true, settings());
        let mut args = vec![json!({
            "category": "playback",
            "defaultToSpeaker": true,
            "mixWithOthers": true,
            "route": "speaker",
        })];
        f.interceptor.on_before_session_configure(&mut args);

        let config = &args[0];
        assert_eq!(config["category"], "playAndRecord");
        assert_eq!(config["mode"], "voiceChat");
        assert_eq!(config["allowBluetooth"], true);
        assert_eq!(config["allowBluetoothA2dp"], true);
        assert_eq!(config["defaultToSpeaker"], false);
        assert_eq!(config["mixWithOthers"], false);
        assert_eq!(config["preferredInput"], "default");
        assert_eq!(config["preferredOutput"], "bt-airpods-1");
        assert_eq!(config["route"], "speaker");
        assert_eq!(f.diagnostics.lock().session_overrides, 1);
    }

    #[test]
    fn session_override_without_pinning() {
        let f = fixture(
            FakeEngine::airpods(),
            true,
            InterceptorSettings {
                pin_preferred_devices: false,
                ..settings()
            },
        );
        let mut args = vec![json!({})];
        f.interceptor.on_before_session_configure(&mut args);

        assert_eq!(args[0]["category"], "playAndRecord");
        assert!(args[0].get("preferredInput").is_none());
        assert!(args[0].get("preferredOutput").is_none());
    }

    #[test]
    fn non_object_session_config_is_left_alone() {
        let f = fixture(FakeEngine::airpods(), true, settings());
        let mut args = vec![json!(null)];
        f.interceptor.on_before_session_configure(&mut args);
        assert_eq!(args, vec![json!(null)]);
    }

    #[test]
    fn connection_schedules_full_enforcement() {
        let f = fixture(FakeEngine::airpods(), true, settings());
        f.interceptor.on_connection_established(&[], &Value::Null);

        assert!(f.engine.commands.lock().is_empty());
        assert!(f.interceptor.wait_for_deferred(Duration::from_secs(10)));
        assert_eq!(
            *f.engine.commands.lock(),
            vec![
                (DeviceDirection::Input, "default".to_string()),
                (DeviceDirection::Output, "bt-airpods-1".to_string()),
            ]
        );
        assert_eq!(f.diagnostics.lock().deferred_scheduled, 1);
        assert!(f.bridge.sent.lock().is_empty());
    }

    #[test]
    fn connection_reasserts_session_when_enabled() {
        let f = fixture(
            FakeEngine::airpods(),
            true,
            InterceptorSettings {
                reassert_session_on_connect: true,
                ..settings()
            },
        );
        f.interceptor.on_connection_established(&[], &Value::Null);
        assert!(f.interceptor.wait_for_deferred(Duration::from_secs(10)));

        let sent = f.bridge.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].category.as_deref(), Some("playAndRecord"));
        assert_eq!(sent[0].preferred_output.as_deref(), Some("bt-airpods-1"));
    }

    #[test]
    fn deactivated_interceptor_ignores_every_rule() {
        let f = fixture(FakeEngine::airpods(), true, settings());
        f.interceptor.deactivate();

        let mut input = vec![json!("bt-airpods-1")];
        f.interceptor.on_before_input_device(&mut input);
        let mut call_input = vec![json!("bt-airpods-1")];
        f.interceptor.on_before_call_input_device(&mut call_input);
        let mut session = vec![json!({ "category": "playback" })];
        f.interceptor.on_before_session_configure(&mut session);
        f.interceptor.on_connection_established(&[], &Value::Null);

        assert_eq!(input, vec![json!("bt-airpods-1")]);
        assert_eq!(call_input, vec![json!("bt-airpods-1")]);
        assert_eq!(session, vec![json!({ "category": "playback" })]);
        assert!(f.engine.commands.lock().is_empty());
        assert_eq!(*f.diagnostics.lock(), RoutingDiagnostics::default());
    }

    #[test]
    fn pending_pass_does_not_run_after_shutdown() {
        let f = fixture(
            FakeEngine::airpods(),
            true,
            InterceptorSettings {
                settle_delay: Duration::from_secs(30),
                ..settings()
            },
        );
        f.interceptor.on_connection_established(&[], &Value::Null);
        assert_eq!(f.interceptor.shutdown(), 1);

        // A hook dispatched before teardown that only now reaches the rule.
        f.interceptor.on_connection_established(&[], &Value::Null);
        assert!(f.engine.commands.lock().is_empty());
        assert_eq!(f.diagnostics.lock().deferred_scheduled, 1);
        assert_eq!(f.diagnostics.lock().enforcement_passes, 0);
    }

    #[test]
    fn deferred_pass_checks_activity_when_it_fires() {
        let f = fixture(FakeEngine::airpods(), true, settings());
        let pass = f.interceptor.deferred_pass();
        f.interceptor.deactivate();
        pass();
        assert!(f.engine.commands.lock().is_empty());
        assert_eq!(f.diagnostics.lock().enforcement_passes, 0);
    }

    #[test]
    fn hooks_delegate_to_rules() {
        let f = fixture(FakeEngine::airpods(), false, settings());
        let hook = f.interceptor.input_device_hook();
        let mut args = vec![json!("bt-airpods-1")];
        hook(&mut args);
        assert_eq!(args, vec![json!("default")]);
    }
}

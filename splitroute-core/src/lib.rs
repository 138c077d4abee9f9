//! # splitroute-core
//!
//! Audio routing policy for live voice sessions: built-in microphone for
//! input, wireless headphones for output, even though the platform tends to
//! move both directions to a wireless headset together.
//!
//! The core never talks to a platform directly. Hosts implement the
//! collaborator traits (module resolution, patching, media engine, stores,
//! session bridge) and hand them to a `RoutingPlugin`.
//!
//! ## Architecture
//!
//! ```text
//! splitroute-core (this crate)
//! ├── traits/    ← ModuleResolver, Patcher, MediaEngine, SessionBridge, UserStore, VoiceStateStore, RoutingDelegate
//! ├── models/    ← Device, SessionConfig, RoutingConfiguration, RoutingError, PluginState, EnforcementReport
//! ├── policy/    ← DeviceClassifier, DeviceSelector, SessionStateGuard
//! └── session/   ← RoutingEnforcer, Interceptor, DeferredScheduler, RoutingPlugin
//! ```

pub mod models;
pub mod policy;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::{ClassifierRules, HookTargets, ModuleQuery, RoutingConfiguration};
pub use models::device::{Device, DeviceClass, DeviceDirection, User, VoiceState};
pub use models::error::RoutingError;
pub use models::report::{DirectionOutcome, EnforcementReport, EnforcementTrigger, RoutingDiagnostics};
pub use models::session_config::{SessionConfig, SessionOverride};
pub use models::state::PluginState;
pub use policy::classifier::DeviceClassifier;
pub use policy::guard::SessionStateGuard;
pub use policy::selector::DeviceSelector;
pub use session::enforcer::{RoutingEnforcer, FALLBACK_INPUT_ID};
pub use session::interception::{Interceptor, InterceptorSettings};
pub use session::plugin::{Collaborators, HostContext, RoutingPlugin};
pub use session::scheduler::{DeferredScheduler, DeferredTask};
pub use traits::host::{AfterHook, BeforeHook, HookArgs, ModuleRef, ModuleResolver, PatchHandle, Patcher};
pub use traits::media_engine::MediaEngine;
pub use traits::routing_delegate::RoutingDelegate;
pub use traits::session_bridge::SessionBridge;
pub use traits::stores::{UserStore, VoiceStateStore};

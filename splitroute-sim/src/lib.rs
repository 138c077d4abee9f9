//! # splitroute-sim
//!
//! In-process host for `splitroute-core`.
//!
//! Provides:
//! - `HostRuntime`: module registry and patch table (`ModuleResolver` + `Patcher`)
//! - `SimulatedMediaEngine`: device lists with platform-style input/output coupling
//! - `InMemoryVoiceStore`: `UserStore` + `VoiceStateStore`
//! - `RecordingSessionBridge`: `SessionBridge` that records payloads
//! - `SimulatedHost`: all of the above wired together
//!
//! ## Usage
//! ```ignore
//! use splitroute_core::{RoutingConfiguration, RoutingPlugin};
//! use splitroute_sim::SimulatedHost;
//!
//! let host = SimulatedHost::with_airpods()?;
//! let mut plugin = RoutingPlugin::new(host.collaborators(), RoutingConfiguration::default())?;
//! plugin.start()?;
//! host.media.select_input("bt-airpods-1")?; // input lands on "default"
//! ```

pub mod bridge;
pub mod error;
pub mod host;
pub mod media_engine;
pub mod modules;
pub mod runtime;
pub mod stores;

pub use bridge::RecordingSessionBridge;
pub use error::HostError;
pub use host::SimulatedHost;
pub use media_engine::{RouteState, SimulatedMediaEngine};
pub use runtime::{HostRuntime, NativeMethod};
pub use stores::InMemoryVoiceStore;

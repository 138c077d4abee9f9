use crate::models::device::Device;
use crate::models::error::RoutingError;

/// Device queries and commands exposed by the host's media engine.
///
/// Hosts differ in which of these they expose; a missing method keeps the
/// default body and reports `CollaboratorUnavailable`, which the enforcer
/// treats as an empty list or a no-op.
pub trait MediaEngine: Send + Sync {
    /// Currently reported input devices, in platform order.
    fn audio_input_devices(&self) -> Result<Vec<Device>, RoutingError> {
        Err(RoutingError::CollaboratorUnavailable("getAudioInputDevices".into()))
    }

    /// Currently reported output devices, in platform order.
    fn audio_output_devices(&self) -> Result<Vec<Device>, RoutingError> {
        Err(RoutingError::CollaboratorUnavailable("getAudioOutputDevices".into()))
    }

    fn set_audio_input_device(&self, _device_id: &str) -> Result<(), RoutingError> {
        Err(RoutingError::CollaboratorUnavailable("setAudioInputDevice".into()))
    }

    fn set_audio_output_device(&self, _device_id: &str) -> Result<(), RoutingError> {
        Err(RoutingError::CollaboratorUnavailable("setAudioOutputDevice".into()))
    }
}

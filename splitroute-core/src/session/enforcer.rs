use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::device::{Device, DeviceDirection};
use crate::models::error::RoutingError;
use crate::models::report::{DirectionOutcome, EnforcementReport, EnforcementTrigger, RoutingDiagnostics};
use crate::policy::selector::DeviceSelector;
use crate::traits::media_engine::MediaEngine;
use crate::traits::routing_delegate::RoutingDelegate;

/// Input id used when no built-in microphone is reported.
pub const FALLBACK_INPUT_ID: &str = "default";

/// Applies the routing split through the media engine.
///
/// Every pass re-reads the device lists; nothing is cached. Corrections are
/// idempotent, so overlapping passes are harmless.
pub struct RoutingEnforcer {
    media: Option<Arc<dyn MediaEngine>>,
    selector: DeviceSelector,
    delegate: Option<Arc<dyn RoutingDelegate>>,
    diagnostics: Arc<Mutex<RoutingDiagnostics>>,
}

impl RoutingEnforcer {
    pub fn new(
        media: Option<Arc<dyn MediaEngine>>,
        selector: DeviceSelector,
        delegate: Option<Arc<dyn RoutingDelegate>>,
        diagnostics: Arc<Mutex<RoutingDiagnostics>>,
    ) -> Self {
        Self {
            media,
            selector,
            delegate,
            diagnostics,
        }
    }

    pub fn selector(&self) -> &DeviceSelector {
        &self.selector
    }

    /// Full pass: built-in mic for input, wireless device for output.
    pub fn enforce(&self) -> EnforcementReport {
        self.enforce_for(EnforcementTrigger::Manual)
    }

    pub fn enforce_for(&self, trigger: EnforcementTrigger) -> EnforcementReport {
        // Each direction is independent; a failure on one side never skips the other.
        let input = self.correct_input();
        let output = self.correct_output();

        self.diagnostics.lock().enforcement_passes += 1;
        let report = EnforcementReport::new(trigger, input, output);
        log::debug!(
            "Enforcement pass {} ({:?}): input={:?} output={:?}",
            report.id,
            report.trigger,
            report.input,
            report.output
        );
        if let Some(ref delegate) = self.delegate {
            delegate.on_enforcement(&report);
        }
        report
    }

    /// Output-only pass, used when only the input side was perturbed.
    pub fn ensure_wireless_output(&self) -> DirectionOutcome {
        self.correct_output()
    }

    /// Id of the preferred built-in microphone, or [`FALLBACK_INPUT_ID`].
    pub fn resolve_built_in_mic_id(&self) -> String {
        let inputs = self.query(DeviceDirection::Input).unwrap_or_default();
        self.selector
            .pick_built_in_mic(&inputs)
            .map(|d| d.id.clone())
            .unwrap_or_else(|| FALLBACK_INPUT_ID.to_string())
    }

    /// Id of the preferred wireless output, if one is reported.
    pub fn wireless_output_id(&self) -> Option<String> {
        let outputs = self.query(DeviceDirection::Output).unwrap_or_default();
        self.selector.pick_wireless_output(&outputs).map(|d| d.id.clone())
    }

    fn correct_input(&self) -> DirectionOutcome {
        let inputs = match self.query(DeviceDirection::Input) {
            Ok(devices) => devices,
            Err(e) => return DirectionOutcome::Failed { reason: e.to_string() },
        };
        match self.selector.pick_built_in_mic(&inputs) {
            Some(mic) => self.command(DeviceDirection::Input, &mic.id),
            None => {
                log::debug!("No built-in microphone among {} inputs", inputs.len());
                DirectionOutcome::NoCandidate
            }
        }
    }

    fn correct_output(&self) -> DirectionOutcome {
        let outputs = match self.query(DeviceDirection::Output) {
            Ok(devices) => devices,
            Err(e) => return DirectionOutcome::Failed { reason: e.to_string() },
        };
        match self.selector.pick_wireless_output(&outputs) {
            Some(output) => self.command(DeviceDirection::Output, &output.id),
            None => {
                log::debug!("No wireless output among {} outputs", outputs.len());
                DirectionOutcome::NoCandidate
            }
        }
    }

    /// Fetch a device list. Failures are logged and counted; callers treat
    /// them as an empty list.
    fn query(&self, direction: DeviceDirection) -> Result<Vec<Device>, RoutingError> {
        let result = match self.media {
            Some(ref media) => match direction {
                DeviceDirection::Input => media.audio_input_devices(),
                DeviceDirection::Output => media.audio_output_devices(),
            },
            None => Err(RoutingError::CollaboratorUnavailable("media engine".into())),
        };
        result.map_err(|e| {
            log::warn!("Failed to query {:?} devices: {}", direction, e);
            self.diagnostics.lock().query_failures += 1;
            self.report_error(&e);
            e
        })
    }

    fn command(&self, direction: DeviceDirection, device_id: &str) -> DirectionOutcome {
        let result = match self.media {
            Some(ref media) => match direction {
                DeviceDirection::Input => media.set_audio_input_device(device_id),
                DeviceDirection::Output => media.set_audio_output_device(device_id),
            },
            None => Err(RoutingError::CollaboratorUnavailable("media engine".into())),
        };
        match result {
            Ok(()) => {
                log::info!("Routed {:?} to {}", direction, device_id);
                DirectionOutcome::Applied {
                    device_id: device_id.to_string(),
                }
            }
            Err(e) => {
                log::warn!("Failed to set {:?} device {}: {}", direction, device_id, e);
                self.diagnostics.lock().command_failures += 1;
                self.report_error(&e);
                DirectionOutcome::Failed { reason: e.to_string() }
            }
        }
    }

    fn report_error(&self, error: &RoutingError) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(error);
        }
    }
}

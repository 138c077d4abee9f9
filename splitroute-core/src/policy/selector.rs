use crate::models::device::Device;

use super::classifier::DeviceClassifier;

/// Picks the policy devices out of a reported device list.
///
/// First match in report order wins; no secondary sort is applied.
#[derive(Debug, Clone, Default)]
pub struct DeviceSelector {
    classifier: DeviceClassifier,
}

impl DeviceSelector {
    pub fn new(classifier: DeviceClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &DeviceClassifier {
        &self.classifier
    }

    /// First built-in microphone, if any. Callers fall back to `"default"`.
    pub fn pick_built_in_mic<'a>(&self, inputs: &'a [Device]) -> Option<&'a Device> {
        inputs.iter().find(|d| self.classifier.is_built_in_microphone(d))
    }

    /// First wireless output that is not a hands-free profile endpoint.
    pub fn pick_wireless_output<'a>(&self, outputs: &'a [Device]) -> Option<&'a Device> {
        outputs
            .iter()
            .find(|d| self.classifier.is_wireless(&d.id) && !self.classifier.is_hands_free(&d.name))
    }
}

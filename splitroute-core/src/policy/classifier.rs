//! Keyword heuristics for telling wireless devices from the built-in mic.
//!
//! Matching is plain substring search on lowercased text. A built-in device
//! whose id happens to contain a wireless keyword is misclassified; that is a
//! known limitation of the heuristic.

use crate::models::config::ClassifierRules;
use crate::models::device::{Device, DeviceClass};

/// Pure device predicates over a fixed rule set.
#[derive(Debug, Clone)]
pub struct DeviceClassifier {
    wireless_keywords: Vec<String>,
    built_in_name_markers: Vec<String>,
    built_in_ids: Vec<String>,
    hands_free_markers: Vec<String>,
}

impl DeviceClassifier {
    pub fn new(rules: &ClassifierRules) -> Self {
        fn lowered(items: &[String]) -> Vec<String> {
            items.iter().map(|s| s.to_lowercase()).collect()
        }
        Self {
            wireless_keywords: lowered(&rules.wireless_keywords),
            built_in_name_markers: lowered(&rules.built_in_name_markers),
            built_in_ids: rules.built_in_ids.clone(),
            hands_free_markers: lowered(&rules.hands_free_markers),
        }
    }

    /// Whether `device_id` names a wireless (Bluetooth-class) device.
    ///
    /// An empty id is never wireless.
    pub fn is_wireless(&self, device_id: &str) -> bool {
        if device_id.is_empty() {
            return false;
        }
        let id = device_id.to_lowercase();
        self.wireless_keywords.iter().any(|k| id.contains(k.as_str()))
    }

    pub fn is_built_in_microphone(&self, device: &Device) -> bool {
        let name = device.name.to_lowercase();
        if self.built_in_name_markers.iter().any(|m| name.contains(m.as_str())) {
            return true;
        }
        // Reserved ids match exactly.
        self.built_in_ids.iter().any(|id| *id == device.id)
    }

    /// Whether `name` denotes a hands-free profile endpoint.
    pub fn is_hands_free(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.hands_free_markers.iter().any(|m| name.contains(m.as_str()))
    }

    pub fn classify(&self, device: &Device) -> DeviceClass {
        if self.is_wireless(&device.id) {
            DeviceClass::Wireless
        } else if self.is_built_in_microphone(device) {
            DeviceClass::BuiltIn
        } else {
            DeviceClass::Other
        }
    }
}

impl Default for DeviceClassifier {
    fn default() -> Self {
        Self::new(&ClassifierRules::default())
    }
}

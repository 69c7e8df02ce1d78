use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::driver::{DriverDate, DriverVersion};

/// Driver currently bound to a device, as reported by the enumerator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledDriver {
    #[serde(default)]
    pub inf_file: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    pub version: DriverVersion,
    #[serde(default)]
    pub date: Option<DriverDate>,
}

/// One hardware entity on the local machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Friendly name.
    pub name: String,
    /// Hardware identifiers, most specific first.
    #[serde(default)]
    pub hardware_ids: Vec<String>,
    /// Currently attached (as opposed to historically seen).
    #[serde(default = "default_present")]
    pub present: bool,
    #[serde(default)]
    pub installed_driver: Option<InstalledDriver>,
}

fn default_present() -> bool {
    true
}

impl Device {
    pub fn new(name: impl Into<String>, hardware_id: impl Into<String>, present: bool) -> Self {
        Self {
            name: name.into(),
            hardware_ids: vec![hardware_id.into()],
            present,
            installed_driver: None,
        }
    }

    /// Non-blank identifiers, trimmed.
    pub fn resolvable_ids(&self) -> impl Iterator<Item = &str> {
        self.hardware_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
    }
}

/// A category inclusion tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFilter {
    #[serde(rename = "Tag")]
    pub tag: String,
}

/// Category section of the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Categories {
    /// Match tags as substrings rather than exact names.
    #[serde(rename = "Wildcard")]
    pub wildcard: bool,
    #[serde(rename = "Include")]
    pub include: Vec<CategoryFilter>,
}

/// A single device entry in the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "HardwareID")]
    pub hardware_id: String,
}

/// Hardware description sent to the catalog for matching.
///
/// `Devices` is always serialized, even when no device qualified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HardwareRequest {
    #[serde(rename = "Categories")]
    pub categories: Categories,
    #[serde(rename = "Devices")]
    pub devices: Vec<DeviceEntry>,
}

impl HardwareRequest {
    /// All hardware identifiers in request order.
    pub fn hardware_ids(&self) -> Vec<&str> {
        self.devices.iter().map(|d| d.hardware_id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Options that shape the request.
#[derive(Debug, Clone, Default)]
pub struct DescribeOptions {
    pub categories: Vec<String>,
    pub wildcard: bool,
    pub hardware_must_be_present: bool,
}

/// Build the catalog request from the enumerated devices.
pub fn build_request(devices: &[Device], options: &DescribeOptions) -> HardwareRequest {
    let mut seen_tags = HashSet::new();
    let include = options
        .categories
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .filter(|c| seen_tags.insert(c.to_string()))
        .map(|c| CategoryFilter { tag: c.to_string() })
        .collect();

    let mut seen_ids = HashSet::new();
    let mut entries = Vec::new();
    for device in devices {
        if options.hardware_must_be_present && !device.present {
            continue;
        }
        for id in device.resolvable_ids() {
            if seen_ids.insert(id.to_ascii_uppercase()) {
                entries.push(DeviceEntry {
                    name: device.name.clone(),
                    hardware_id: id.to_string(),
                });
            }
        }
    }

    HardwareRequest {
        categories: Categories {
            wildcard: options.wildcard,
            include,
        },
        devices: entries,
    }
}

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::{Device, DomainError};
use crate::ports::DeviceEnumerator;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InventoryFile {
    Wrapped { devices: Vec<Device> },
    Bare(Vec<Device>),
}

/// Device enumerator backed by the JSON inventory the platform enumerator
/// exports. This is the full-capability source: it carries presence flags
/// and the drivers bound to each device.
pub struct InventoryFileEnumerator {
    path: PathBuf,
}

impl InventoryFileEnumerator {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl DeviceEnumerator for InventoryFileEnumerator {
    fn enumerate(&self) -> Result<Vec<Device>, DomainError> {
        debug!(path = ?self.path, "Reading device inventory");
        let content = fs::read_to_string(&self.path).map_err(|e| {
            DomainError::Enumeration(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        let inventory: InventoryFile = serde_json::from_str(&content).map_err(|e| {
            DomainError::Enumeration(format!("cannot parse {}: {}", self.path.display(), e))
        })?;
        let devices = match inventory {
            InventoryFile::Wrapped { devices } | InventoryFile::Bare(devices) => devices,
        };
        info!(path = ?self.path, count = devices.len(), "Device inventory loaded");
        Ok(devices)
    }

    fn reports_presence(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "inventory"
    }
}

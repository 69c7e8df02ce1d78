use std::fs;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::domain::{Device, DomainError};
use crate::ports::DeviceEnumerator;

/// Fallback enumerator that scans `modalias` files under a sysfs bus tree.
///
/// It only sees devices the kernel currently exposes and knows nothing about
/// bound driver versions, so it does not report presence.
pub struct ModaliasEnumerator {
    bus_root: PathBuf,
}

impl ModaliasEnumerator {
    pub fn new() -> Self {
        Self::with_root(PathBuf::from("/sys/bus"))
    }

    pub fn with_root(bus_root: PathBuf) -> Self {
        Self { bus_root }
    }

    fn read_device(dir: &std::path::Path) -> Option<Device> {
        let alias = fs::read_to_string(dir.join("modalias")).ok()?;
        let alias = alias.trim();
        if alias.is_empty() {
            return None;
        }
        let name = dir.file_name()?.to_string_lossy().to_string();
        Some(Device::new(name, alias, true))
    }
}

impl Default for ModaliasEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceEnumerator for ModaliasEnumerator {
    fn enumerate(&self) -> Result<Vec<Device>, DomainError> {
        let buses = fs::read_dir(&self.bus_root).map_err(|e| {
            DomainError::Enumeration(format!("cannot read {}: {}", self.bus_root.display(), e))
        })?;

        let mut devices = Vec::new();
        for bus in buses.flatten() {
            let device_dir = bus.path().join("devices");
            let entries = match fs::read_dir(&device_dir) {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                if let Some(device) = Self::read_device(&entry.path()) {
                    debug!(name = %device.name, "Found device");
                    devices.push(device);
                }
            }
        }

        devices.sort_by(|a, b| a.name.cmp(&b.name));
        if devices.is_empty() {
            warn!(root = ?self.bus_root, "No modalias entries found");
        }
        info!(count = devices.len(), "Fallback device scan complete");
        Ok(devices)
    }

    fn reports_presence(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "modalias"
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, warn};

use crate::domain::{CandidateDriver, Device, InstalledComparison};

/// Plain-text table with columns padded to the widest cell.
pub struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<&'static str>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.len()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }

        let line = |cells: Vec<&str>| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = String::new();
        out.push_str(&line(self.headers.clone()));
        out.push('\n');
        let dashes: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&line(dashes.iter().map(String::as_str).collect()));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&line(row.iter().map(String::as_str).collect()));
            out.push('\n');
        }
        out
    }
}

fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

pub fn devices_table(devices: &[Device]) -> Table {
    let mut table = Table::new(vec!["Name", "HardwareID", "Present", "InstalledVersion"]);
    for device in devices {
        let installed = device
            .installed_driver
            .as_ref()
            .map(|d| d.version.to_string())
            .unwrap_or_default();
        let ids = if device.hardware_ids.is_empty() {
            vec![String::new()]
        } else {
            device.hardware_ids.clone()
        };
        for id in ids {
            table.push(vec![device.name.clone(), id, yes_no(device.present), installed.clone()]);
        }
    }
    table
}

pub fn drivers_table(drivers: &[CandidateDriver]) -> Table {
    let mut table = Table::new(vec![
        "CI_ID", "INF", "Date", "Version", "Class", "Provider", "Type", "Signed", "BootCritical",
    ]);
    for driver in drivers {
        table.push(vec![
            driver.ci_id.to_string(),
            driver.inf_file.clone(),
            driver.date.map(|d| d.to_string()).unwrap_or_default(),
            driver.version.to_string(),
            driver.class.clone(),
            driver.provider.clone(),
            driver.driver_type.clone().unwrap_or_default(),
            yes_no(driver.signed),
            yes_no(driver.boot_critical),
        ]);
    }
    table
}

pub fn comparison_table(comparisons: &[InstalledComparison]) -> Table {
    let mut table = Table::new(vec!["CI_ID", "INF", "CatalogVersion", "InstalledVersion", "Device", "Newer"]);
    for c in comparisons {
        table.push(vec![
            c.ci_id.to_string(),
            c.inf_file.clone(),
            c.catalog_version.to_string(),
            c.installed_version.as_ref().map(|v| v.to_string()).unwrap_or_default(),
            c.device.clone().unwrap_or_default(),
            yes_no(c.is_newer),
        ]);
    }
    table
}

/// Writes the audit tables of one run into their own directory.
///
/// Audit output is diagnostic only; write failures are logged and ignored.
pub struct AuditTrail {
    dir: Option<PathBuf>,
}

impl AuditTrail {
    /// Audit directory `<root>/<timestamp>-<id>`.
    pub fn create(root: &Path) -> Self {
        let run_id = format!(
            "{}-{}",
            Local::now().format("%Y%m%d-%H%M%S"),
            &uuid::Uuid::new_v4().simple().to_string()[..8]
        );
        let dir = root.join(run_id);
        match fs::create_dir_all(&dir) {
            Ok(()) => Self { dir: Some(dir) },
            Err(e) => {
                warn!(dir = ?dir, error = %e, "Cannot create audit directory, audit disabled");
                Self { dir: None }
            }
        }
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn record(&self, name: &str, table: &Table) {
        let rendered = table.render();
        debug!(artifact = name, rows = table.len(), "Audit table\n{}", rendered);

        let Some(dir) = &self.dir else { return };
        let path = dir.join(format!("{}.txt", name));
        if let Err(e) = fs::write(&path, rendered) {
            warn!(path = ?path, error = %e, "Failed to write audit artifact");
        }
    }
}

use std::cmp::Ordering;

use serde::Serialize;

use super::device::{Device, InstalledDriver};
use super::driver::{CandidateDriver, DriverVersion};

/// Order candidates so the newest row of each logical driver comes first:
/// INF file ascending, then date descending, then version descending.
///
/// The sort is stable, so rows equal on all three keep catalog order.
pub fn sort_candidates(candidates: &mut [CandidateDriver]) {
    candidates.sort_by(|a, b| {
        let inf = a
            .inf_file
            .to_ascii_lowercase()
            .cmp(&b.inf_file.to_ascii_lowercase());
        // `None` dates are older than any dated row.
        inf.then_with(|| b.date.cmp(&a.date))
            .then_with(|| b.version.cmp(&a.version))
    });
}

/// Reduce candidates to the target set.
///
/// With `find_all` every candidate is kept unchanged. Otherwise the list is
/// sorted and only the first row per (INF file, class, provider) survives.
pub fn select_targets(candidates: Vec<CandidateDriver>, find_all: bool) -> Vec<CandidateDriver> {
    if find_all {
        return candidates;
    }

    let mut sorted = candidates;
    sort_candidates(&mut sorted);

    let mut targets: Vec<CandidateDriver> = Vec::new();
    for candidate in sorted {
        let key = candidate.key();
        if targets.iter().any(|accepted| accepted.key() == key) {
            continue;
        }
        targets.push(candidate);
    }
    targets
}

/// Catalog version versus the driver installed for the same hardware.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstalledComparison {
    pub ci_id: i64,
    pub inf_file: String,
    pub catalog_version: DriverVersion,
    /// Highest version installed on any device the item matched.
    pub installed_version: Option<DriverVersion>,
    /// Device the installed version was read from.
    pub device: Option<String>,
    pub is_newer: bool,
}

impl InstalledComparison {
    fn verdict(candidate: &CandidateDriver, installed: Option<(&Device, &InstalledDriver)>) -> Self {
        let (device, installed_version) = match installed {
            Some((device, driver)) => (Some(device.name.clone()), Some(driver.version.clone())),
            None => (None, None),
        };
        // A device with no driver bound at all always benefits from one.
        let is_newer = installed_version
            .as_ref()
            .map_or(true, |v| candidate.version.cmp(v) == Ordering::Greater);

        Self {
            ci_id: candidate.ci_id,
            inf_file: candidate.inf_file.clone(),
            catalog_version: candidate.version.clone(),
            installed_version,
            device,
            is_newer,
        }
    }
}

/// Compare every target against the drivers installed on the devices it
/// matched. When several matched devices have a driver, the highest
/// installed version is the one to beat.
pub fn compare_with_installed(
    targets: &[CandidateDriver],
    devices: &[Device],
) -> Vec<InstalledComparison> {
    targets
        .iter()
        .map(|candidate| {
            let installed = devices
                .iter()
                .filter(|device| {
                    device.resolvable_ids().any(|id| {
                        candidate
                            .hardware_ids
                            .iter()
                            .any(|h| h.trim().eq_ignore_ascii_case(id))
                    })
                })
                .filter_map(|device| device.installed_driver.as_ref().map(|d| (device, d)))
                .max_by(|(_, a), (_, b)| a.version.cmp(&b.version));
            InstalledComparison::verdict(candidate, installed)
        })
        .collect()
}

/// Keep only the targets whose comparison says the catalog copy is newer.
pub fn retain_newer(
    targets: Vec<CandidateDriver>,
    comparisons: &[InstalledComparison],
) -> Vec<CandidateDriver> {
    targets
        .into_iter()
        .filter(|t| {
            comparisons
                .iter()
                .any(|c| c.ci_id == t.ci_id && c.is_newer)
        })
        .collect()
}

//! End-to-end runs of the staging pipeline against in-memory ports.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use driverstage::domain::config::PolicyConfig;
use driverstage::domain::{
    Capabilities, CompletionCode, Device, DomainError, DriverVersion, FetchedPackage,
    HardwareRequest, InstalledDriver, MatchRow, RawDriverRecord, Stage,
};
use driverstage::infrastructure::AuditTrail;
use driverstage::ports::{CatalogClient, ContentFetcher, DeviceEnumerator, Installer};
use driverstage::{Pipeline, PipelinePorts, PipelineSettings, RunOutcome};

struct FakeEnumerator {
    devices: Option<Vec<Device>>,
    presence: bool,
    name: &'static str,
}

impl FakeEnumerator {
    fn primary(devices: Vec<Device>) -> Self {
        Self {
            devices: Some(devices),
            presence: true,
            name: "inventory",
        }
    }

    fn broken() -> Self {
        Self {
            devices: None,
            presence: true,
            name: "inventory",
        }
    }

    fn fallback(devices: Vec<Device>) -> Self {
        Self {
            devices: Some(devices),
            presence: false,
            name: "modalias",
        }
    }
}

impl DeviceEnumerator for FakeEnumerator {
    fn enumerate(&self) -> Result<Vec<Device>, DomainError> {
        self.devices
            .clone()
            .ok_or_else(|| DomainError::Enumeration("inventory source unavailable".to_string()))
    }

    fn reports_presence(&self) -> bool {
        self.presence
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[derive(Default)]
struct FakeCatalog {
    rows: Vec<MatchRow>,
    records: Vec<RawDriverRecord>,
    content: HashMap<i64, Vec<String>>,
    failing_lookups: HashSet<i64>,
    requests: Mutex<Vec<HardwareRequest>>,
    detail_calls: AtomicUsize,
    lookups: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn match_hardware(&self, request: &HardwareRequest) -> Result<Vec<MatchRow>, DomainError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.rows.clone())
    }

    async fn driver_details(&self, _ci_ids: &[i64]) -> Result<Vec<RawDriverRecord>, DomainError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.clone())
    }

    async fn content_ids(&self, ci_id: i64) -> Result<Vec<String>, DomainError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_lookups.contains(&ci_id) {
            return Err(DomainError::Catalog("HTTP 503 Service Unavailable".to_string()));
        }
        Ok(self.content.get(&ci_id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct FakeFetcher {
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ContentFetcher for FakeFetcher {
    async fn fetch(&self, content_id: &str, target_dir: &Path) -> Result<FetchedPackage, DomainError> {
        self.calls.lock().unwrap().push(content_id.to_string());
        if self.failing.contains(content_id) {
            return Err(DomainError::HttpRequest(format!("HTTP 404 Not Found for {}", content_id)));
        }
        Ok(FetchedPackage {
            content_id: content_id.to_string(),
            path: target_dir.join(content_id),
            size_bytes: 1024,
            sha256: "00".repeat(32),
        })
    }
}

#[derive(Default)]
struct FakeInstaller {
    calls: Mutex<Vec<(usize, bool)>>,
}

#[async_trait]
impl Installer for FakeInstaller {
    async fn install(&self, packages: &[FetchedPackage], allow_restart: bool) -> Result<(), DomainError> {
        self.calls.lock().unwrap().push((packages.len(), allow_restart));
        Ok(())
    }
}

struct Harness {
    catalog: Arc<FakeCatalog>,
    fetcher: Arc<FakeFetcher>,
    installer: Arc<FakeInstaller>,
    primary: FakeEnumerator,
    fallback: Option<FakeEnumerator>,
    policy: PolicyConfig,
    workers: usize,
    elevated: bool,
}

impl Harness {
    fn new(devices: Vec<Device>, catalog: FakeCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            fetcher: Arc::new(FakeFetcher::default()),
            installer: Arc::new(FakeInstaller::default()),
            primary: FakeEnumerator::primary(devices),
            fallback: None,
            policy: PolicyConfig::default(),
            workers: 4,
            elevated: false,
        }
    }

    async fn run_with_audit(self, audit: AuditTrail) -> (RunOutcome, Arc<FakeCatalog>, Arc<FakeFetcher>, Arc<FakeInstaller>) {
        let ports = PipelinePorts {
            enumerator: Arc::new(self.primary),
            fallback: self
                .fallback
                .map(|f| Arc::new(f) as Arc<dyn DeviceEnumerator>),
            catalog: self.catalog.clone(),
            fetcher: self.fetcher.clone(),
            installer: self.installer.clone(),
        };
        let settings = PipelineSettings {
            policy: self.policy,
            workers: self.workers,
            target_dir: PathBuf::from("/staging"),
        };
        let capabilities = Capabilities {
            elevated: self.elevated,
        };

        let outcome = Pipeline::new(ports, settings, capabilities, audit).run().await;
        (outcome, self.catalog, self.fetcher, self.installer)
    }

    async fn run(self) -> (RunOutcome, Arc<FakeCatalog>, Arc<FakeFetcher>, Arc<FakeInstaller>) {
        self.run_with_audit(AuditTrail::disabled()).await
    }
}

fn device(name: &str, hardware_id: &str, present: bool, installed: Option<&str>) -> Device {
    let mut device = Device::new(name, hardware_id, present);
    device.installed_driver = installed.map(|version| InstalledDriver {
        inf_file: None,
        provider: None,
        class: None,
        version: DriverVersion::parse(version),
        date: None,
    });
    device
}

fn item(ci_id: i64, hardware_id: &str) -> MatchRow {
    MatchRow::Item {
        ci_id,
        hardware_id: hardware_id.to_string(),
    }
}

fn record(ci_id: i64, inf: &str, date: &str, version: &str) -> RawDriverRecord {
    RawDriverRecord {
        ci_id: Some(ci_id),
        driver_type: Some("PnP".to_string()),
        inf_file: Some(inf.to_string()),
        date: Some(date.to_string()),
        version: Some(version.to_string()),
        class: Some("Net".to_string()),
        provider: Some("Intel".to_string()),
        signed: Some(true),
        boot_critical: Some(false),
    }
}

fn content(pairs: &[(i64, &[&str])]) -> HashMap<i64, Vec<String>> {
    pairs
        .iter()
        .map(|(ci_id, ids)| (*ci_id, ids.iter().map(|s| s.to_string()).collect()))
        .collect()
}

fn nic() -> Device {
    device("Intel Ethernet", "PCI\\VEN_8086&DEV_15F3", true, Some("12.19.1.37"))
}

fn gpu() -> Device {
    device("NVIDIA GPU", "PCI\\VEN_10DE&DEV_2484", true, Some("31.0.15.1"))
}

#[tokio::test]
async fn newest_row_per_driver_is_staged() {
    let catalog = FakeCatalog {
        rows: vec![item(1, "PCI\\VEN_8086&DEV_15F3"), item(2, "PCI\\VEN_8086&DEV_15F3")],
        records: vec![
            record(1, "a.inf", "2023-01-01", "1.0"),
            record(2, "a.inf", "2024-01-01", "2.0"),
        ],
        content: content(&[(1, &["pkg-old"]), (2, &["pkg-new"])]),
        ..FakeCatalog::default()
    };

    let (outcome, catalog, fetcher, installer) = Harness::new(vec![nic()], catalog).run().await;

    assert_eq!(outcome.code, CompletionCode::Complete);
    assert!(outcome.fault.is_none());
    let report = &outcome.report;
    assert_eq!(report.stage, Stage::Complete);
    assert_eq!(report.targets.len(), 1);
    assert_eq!(report.targets[0].ci_id, 2);
    assert_eq!(report.targets[0].version.as_str(), "2.0");
    assert_eq!(report.content_ids, vec!["pkg-new"]);
    assert_eq!(catalog.lookups.load(Ordering::SeqCst), 1);
    assert_eq!(*fetcher.calls.lock().unwrap(), vec!["pkg-new"]);
    assert_eq!(report.fetched[0].path, PathBuf::from("/staging/pkg-new"));
    assert!(report.visited(Stage::Fetching));
    assert!(!report.visited(Stage::Installing));
    assert!(installer.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn no_drivers_found_stops_cleanly() {
    let catalog = FakeCatalog {
        rows: vec![MatchRow::Marker("NoDriversFound".to_string())],
        ..FakeCatalog::default()
    };

    let (outcome, catalog, fetcher, _) = Harness::new(vec![nic()], catalog).run().await;

    assert_eq!(outcome.code, CompletionCode::NoDriversFound);
    assert_eq!(outcome.code.exit_code(), 3);
    assert!(outcome.fault.is_none());
    assert_eq!(outcome.report.stage, Stage::Complete);
    assert!(outcome.report.visited(Stage::Reconciling));
    assert!(!outcome.report.visited(Stage::Resolving));
    assert_eq!(catalog.detail_calls.load(Ordering::SeqCst), 0);
    assert!(fetcher.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_match_response_means_no_drivers() {
    let (outcome, _, fetcher, _) = Harness::new(vec![nic()], FakeCatalog::default()).run().await;

    assert_eq!(outcome.code, CompletionCode::NoDriversFound);
    assert!(fetcher.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn update_only_without_privilege_is_degraded() {
    let catalog = FakeCatalog {
        rows: vec![item(1, "PCI\\VEN_8086&DEV_15F3"), item(2, "PCI\\VEN_10DE&DEV_2484")],
        records: vec![
            record(1, "e1d.inf", "2023-05-17", "12.19.1.37"),
            record(2, "nv_disp.inf", "2024-02-01", "31.0.15.3"),
        ],
        ..FakeCatalog::default()
    };
    let mut harness = Harness::new(vec![nic(), gpu()], catalog);
    harness.policy.update_only_dated_drivers = true;
    harness.policy.download = false;

    let (outcome, _, _, _) = harness.run().await;

    assert_eq!(outcome.code, CompletionCode::Complete);
    let report = &outcome.report;
    let ids: Vec<i64> = report.targets.iter().map(|t| t.ci_id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert!(report.comparisons.is_none());
    let policy = report.policy.unwrap();
    assert!(!policy.update_only_dated_drivers);
    assert!(!policy.comparison_available);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("Insufficient privilege for installed driver comparison")));
}

#[tokio::test]
async fn update_only_with_privilege_keeps_newer_drivers() {
    let catalog = FakeCatalog {
        rows: vec![item(1, "PCI\\VEN_8086&DEV_15F3"), item(2, "PCI\\VEN_10DE&DEV_2484")],
        records: vec![
            record(1, "e1d.inf", "2023-05-17", "12.19.1.37"),
            record(2, "nv_disp.inf", "2024-02-01", "31.0.15.3"),
        ],
        content: content(&[(1, &["pkg-nic"]), (2, &["pkg-gpu"])]),
        ..FakeCatalog::default()
    };
    let mut harness = Harness::new(vec![nic(), gpu()], catalog);
    harness.policy.update_only_dated_drivers = true;
    harness.elevated = true;

    let (outcome, _, fetcher, _) = harness.run().await;

    let report = &outcome.report;
    assert_eq!(report.targets.len(), 1);
    assert_eq!(report.targets[0].ci_id, 2);
    let comparisons = report.comparisons.as_ref().unwrap();
    assert_eq!(comparisons.len(), 2);
    assert!(comparisons.iter().any(|c| c.ci_id == 1 && !c.is_newer));
    assert_eq!(*fetcher.calls.lock().unwrap(), vec!["pkg-gpu"]);
}

#[tokio::test]
async fn shared_content_id_is_fetched_once() {
    let catalog = FakeCatalog {
        rows: vec![item(1, "PCI\\VEN_8086&DEV_15F3"), item(2, "PCI\\VEN_10DE&DEV_2484")],
        records: vec![
            record(1, "e1d.inf", "2023-05-17", "12.19.1.37"),
            record(2, "nv_disp.inf", "2024-02-01", "31.0.15.3"),
        ],
        content: content(&[(1, &["pkg-shared"]), (2, &["pkg-shared", "pkg-extra"])]),
        ..FakeCatalog::default()
    };

    let (outcome, _, fetcher, _) = Harness::new(vec![nic(), gpu()], catalog).run().await;

    assert_eq!(outcome.report.content_ids, vec!["pkg-extra", "pkg-shared"]);
    let mut calls = fetcher.calls.lock().unwrap().clone();
    calls.sort();
    assert_eq!(calls, vec!["pkg-extra", "pkg-shared"]);
}

#[tokio::test]
async fn failed_enumeration_falls_back_and_relaxes_policy() {
    let catalog = FakeCatalog {
        rows: vec![item(7, "USB\\VID_046D&PID_C52B")],
        records: vec![record(7, "logi.inf", "2022-11-30", "5.10.127")],
        ..FakeCatalog::default()
    };
    let mut harness = Harness::new(Vec::new(), catalog);
    harness.primary = FakeEnumerator::broken();
    harness.fallback = Some(FakeEnumerator::fallback(vec![device(
        "usb",
        "USB\\VID_046D&PID_C52B",
        false,
        None,
    )]));
    harness.policy.hardware_must_be_present = true;
    harness.policy.update_only_dated_drivers = true;
    harness.policy.download = false;
    harness.elevated = true;

    let (outcome, catalog, _, _) = harness.run().await;

    assert_eq!(outcome.code, CompletionCode::Complete);
    let policy = outcome.report.policy.unwrap();
    assert!(policy.used_fallback_enumerator);
    assert!(!policy.hardware_must_be_present);
    assert!(!policy.update_only_dated_drivers);
    assert!(!policy.comparison_available);
    assert!(outcome.report.comparisons.is_none());

    let requests = catalog.requests.lock().unwrap();
    assert_eq!(requests[0].hardware_ids(), vec!["USB\\VID_046D&PID_C52B"]);
    assert!(outcome.report.warnings[0].contains("used modalias"));
}

#[tokio::test]
async fn fallback_with_presence_data_still_relaxes_policy() {
    let catalog = FakeCatalog {
        rows: vec![item(7, "USB\\VID_046D&PID_C52B")],
        records: vec![record(7, "logi.inf", "2022-11-30", "5.10.127")],
        ..FakeCatalog::default()
    };
    let mut harness = Harness::new(Vec::new(), catalog);
    harness.primary = FakeEnumerator::broken();
    let mut fallback = FakeEnumerator::fallback(vec![device(
        "usb",
        "USB\\VID_046D&PID_C52B",
        false,
        Some("5.10.127"),
    )]);
    fallback.presence = true;
    harness.fallback = Some(fallback);
    harness.policy.hardware_must_be_present = true;
    harness.policy.update_only_dated_drivers = true;
    harness.policy.download = false;
    harness.elevated = true;

    let (outcome, catalog, _, _) = harness.run().await;

    assert_eq!(outcome.code, CompletionCode::Complete);
    let policy = outcome.report.policy.unwrap();
    assert!(policy.used_fallback_enumerator);
    assert!(!policy.hardware_must_be_present);
    assert!(!policy.update_only_dated_drivers);
    assert!(!policy.comparison_available);
    assert_eq!(outcome.report.targets.len(), 1);

    let requests = catalog.requests.lock().unwrap();
    assert_eq!(requests[0].hardware_ids(), vec!["USB\\VID_046D&PID_C52B"]);
}

#[tokio::test]
async fn failed_enumeration_without_fallback_fails_describing() {
    let mut harness = Harness::new(Vec::new(), FakeCatalog::default());
    harness.primary = FakeEnumerator::broken();

    let (outcome, catalog, _, _) = harness.run().await;

    assert_eq!(outcome.code, CompletionCode::Failed);
    assert_eq!(outcome.report.stage, Stage::Failed);
    let fault = outcome.fault.unwrap();
    assert_eq!(fault.stage, Stage::Describing);
    assert!(matches!(fault.error, DomainError::Enumeration(_)));
    assert!(catalog.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_driver_record_fails_matching() {
    let mut broken = record(3, "a.inf", "2024-01-01", "1.0");
    broken.version = None;
    let catalog = FakeCatalog {
        rows: vec![item(3, "PCI\\VEN_8086&DEV_15F3")],
        records: vec![broken],
        ..FakeCatalog::default()
    };

    let (outcome, _, _, _) = Harness::new(vec![nic()], catalog).run().await;

    let fault = outcome.fault.unwrap();
    assert_eq!(fault.stage, Stage::Matching);
    assert!(matches!(fault.error, DomainError::DataShape(_)));
    assert_eq!(outcome.code.exit_code(), 2);
}

#[tokio::test]
async fn content_lookups_are_bounded_and_collect_every_failure() {
    let ids: Vec<i64> = (1..=6).collect();
    let catalog = FakeCatalog {
        rows: ids.iter().map(|id| item(*id, "PCI\\VEN_8086&DEV_15F3")).collect(),
        records: ids
            .iter()
            .map(|id| record(*id, &format!("drv{}.inf", id), "2024-01-01", "1.0"))
            .collect(),
        content: ids.iter().map(|id| (*id, vec![format!("pkg-{}", id)])).collect(),
        failing_lookups: [3, 5].into_iter().collect(),
        ..FakeCatalog::default()
    };
    let mut harness = Harness::new(vec![nic()], catalog);
    harness.workers = 2;

    let (outcome, catalog, fetcher, _) = harness.run().await;

    assert_eq!(catalog.lookups.load(Ordering::SeqCst), 6);
    assert!(catalog.max_in_flight.load(Ordering::SeqCst) <= 2);
    let fault = outcome.fault.unwrap();
    assert_eq!(fault.stage, Stage::Resolving);
    match fault.error {
        DomainError::ContentLookup { failures } => {
            let failed: Vec<i64> = failures.iter().map(|(id, _)| *id).collect();
            assert_eq!(failed, vec![3, 5]);
        }
        other => panic!("expected content lookup failure, got {:?}", other),
    }
    assert!(fetcher.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn one_failed_download_does_not_stop_the_others() {
    let catalog = FakeCatalog {
        rows: vec![item(1, "PCI\\VEN_8086&DEV_15F3")],
        records: vec![record(1, "e1d.inf", "2023-05-17", "12.19.1.37")],
        content: content(&[(1, &["pkg-a", "pkg-b", "pkg-c"])]),
        ..FakeCatalog::default()
    };
    let mut harness = Harness::new(vec![nic()], catalog);
    harness.fetcher = Arc::new(FakeFetcher {
        failing: ["pkg-b".to_string()].into_iter().collect(),
        ..FakeFetcher::default()
    });

    let (outcome, _, fetcher, _) = harness.run().await;

    assert_eq!(fetcher.calls.lock().unwrap().len(), 3);
    let fetched: Vec<&str> = outcome
        .report
        .fetched
        .iter()
        .map(|p| p.content_id.as_str())
        .collect();
    assert_eq!(fetched, vec!["pkg-a", "pkg-c"]);
    let fault = outcome.fault.unwrap();
    assert_eq!(fault.stage, Stage::Fetching);
    match fault.error {
        DomainError::Download { failures } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].0, "pkg-b");
        }
        other => panic!("expected download failure, got {:?}", other),
    }
}

#[tokio::test]
async fn install_needs_elevation() {
    let catalog = || FakeCatalog {
        rows: vec![item(1, "PCI\\VEN_8086&DEV_15F3")],
        records: vec![record(1, "e1d.inf", "2024-05-17", "12.20.0.1")],
        content: content(&[(1, &["pkg-nic"])]),
        ..FakeCatalog::default()
    };

    let mut unprivileged = Harness::new(vec![nic()], catalog());
    unprivileged.policy.install = true;
    let (outcome, _, _, installer) = unprivileged.run().await;
    assert_eq!(outcome.code, CompletionCode::Complete);
    assert!(!outcome.report.installed);
    assert!(!outcome.report.visited(Stage::Installing));
    assert!(installer.calls.lock().unwrap().is_empty());
    assert!(outcome
        .report
        .warnings
        .iter()
        .any(|w| w.contains("driver installation")));

    let mut elevated = Harness::new(vec![nic()], catalog());
    elevated.policy.install = true;
    elevated.policy.allow_restart = true;
    elevated.elevated = true;
    let (outcome, _, _, installer) = elevated.run().await;
    assert!(outcome.report.installed);
    assert!(outcome.report.visited(Stage::Installing));
    assert_eq!(*installer.calls.lock().unwrap(), vec![(1, true)]);
}

#[tokio::test]
async fn download_disabled_stops_after_resolving() {
    let catalog = FakeCatalog {
        rows: vec![item(1, "PCI\\VEN_8086&DEV_15F3")],
        records: vec![record(1, "e1d.inf", "2023-05-17", "12.19.1.37")],
        content: content(&[(1, &["pkg-nic"])]),
        ..FakeCatalog::default()
    };
    let mut harness = Harness::new(vec![nic()], catalog);
    harness.policy.download = false;

    let (outcome, _, fetcher, _) = harness.run().await;

    assert_eq!(outcome.report.content_ids, vec!["pkg-nic"]);
    assert_eq!(
        outcome.report.transitions.last(),
        Some(&(Stage::Resolving, Stage::Complete))
    );
    assert!(fetcher.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn skipped_download_reports_skipped_install() {
    let catalog = FakeCatalog {
        rows: vec![item(1, "PCI\\VEN_8086&DEV_15F3")],
        records: vec![record(1, "e1d.inf", "2023-05-17", "12.19.1.37")],
        content: content(&[(1, &["pkg-nic"])]),
        ..FakeCatalog::default()
    };
    let mut harness = Harness::new(vec![nic()], catalog);
    harness.policy.download = false;
    harness.policy.install = true;
    harness.elevated = true;

    let (outcome, _, _, installer) = harness.run().await;

    assert_eq!(outcome.code, CompletionCode::Complete);
    assert!(!outcome.report.installed);
    assert!(outcome
        .report
        .warnings
        .iter()
        .any(|w| w == "Installation skipped: download disabled"));
    assert!(installer.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn find_all_keeps_every_candidate() {
    let catalog = FakeCatalog {
        rows: vec![item(1, "PCI\\VEN_8086&DEV_15F3"), item(2, "PCI\\VEN_8086&DEV_15F3")],
        records: vec![
            record(1, "a.inf", "2023-01-01", "1.0"),
            record(2, "a.inf", "2024-01-01", "2.0"),
        ],
        ..FakeCatalog::default()
    };
    let mut harness = Harness::new(vec![nic()], catalog);
    harness.policy.find_all = true;
    harness.policy.download = false;

    let (outcome, _, _, _) = harness.run().await;

    let ids: Vec<i64> = outcome.report.targets.iter().map(|t| t.ci_id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn audit_trail_records_each_stage() {
    let catalog = FakeCatalog {
        rows: vec![item(1, "PCI\\VEN_8086&DEV_15F3")],
        records: vec![record(1, "e1d.inf", "2024-05-17", "12.20.0.1")],
        ..FakeCatalog::default()
    };
    let root = tempfile::tempdir().unwrap();
    let mut harness = Harness::new(vec![nic()], catalog);
    harness.elevated = true;
    harness.policy.download = false;

    let (outcome, _, _, _) = harness.run_with_audit(AuditTrail::create(root.path())).await;

    let dir = outcome.report.audit_dir.clone().unwrap();
    assert!(dir.starts_with(root.path()));
    for name in ["devices", "candidates", "comparison", "targets"] {
        assert!(dir.join(format!("{}.txt", name)).is_file(), "{} missing", name);
    }
    let devices = std::fs::read_to_string(dir.join("devices.txt")).unwrap();
    assert!(devices.contains("Intel Ethernet"));
}

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::{stream, StreamExt};
use tracing::{debug, error, info, warn};

use crate::domain::config::PolicyConfig;
use crate::domain::content::merge_content_ids;
use crate::domain::device::{build_request, DescribeOptions};
use crate::domain::driver::{distinct_ci_ids, interpret_match_rows, into_candidates};
use crate::domain::reconcile::{compare_with_installed, retain_newer, select_targets};
use crate::domain::{
    AppConfig, CandidateDriver, Capabilities, CompletionCode, ContentMapping, Device, DomainError,
    EffectivePolicy, FetchedPackage, HardwareRequest, PipelineFault, RunReport, Stage,
};
use crate::infrastructure::audit::{comparison_table, devices_table, drivers_table};
use crate::infrastructure::AuditTrail;
use crate::ports::{CatalogClient, ContentFetcher, DeviceEnumerator, Installer};

/// The collaborators a run talks to.
#[derive(Clone)]
pub struct PipelinePorts {
    pub enumerator: Arc<dyn DeviceEnumerator>,
    /// Used when the primary enumerator fails.
    pub fallback: Option<Arc<dyn DeviceEnumerator>>,
    pub catalog: Arc<dyn CatalogClient>,
    pub fetcher: Arc<dyn ContentFetcher>,
    pub installer: Arc<dyn Installer>,
}

/// Configuration the stages read, resolved once before the run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub policy: PolicyConfig,
    pub workers: usize,
    pub target_dir: PathBuf,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, DomainError> {
        let target_dir = config
            .site
            .target_path
            .clone()
            .ok_or_else(|| DomainError::MissingParameters {
                missing: vec!["site.target_path".to_string()],
            })?;
        Ok(Self {
            policy: config.policy.clone(),
            workers: config.transfer.worker_limit(),
            target_dir,
        })
    }
}

/// How a run ended.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub fault: Option<PipelineFault>,
    pub code: CompletionCode,
}

/// Output of the Describing stage.
struct Description {
    devices: Vec<Device>,
    request: HardwareRequest,
    /// Presence and installed versions can be trusted for comparison.
    comparable: bool,
}

/// Runs one staging pass: describe, match, reconcile, resolve, fetch, install.
pub struct Pipeline {
    ports: PipelinePorts,
    settings: PipelineSettings,
    capabilities: Capabilities,
    audit: AuditTrail,
}

impl Pipeline {
    pub fn new(
        ports: PipelinePorts,
        settings: PipelineSettings,
        capabilities: Capabilities,
        audit: AuditTrail,
    ) -> Self {
        Self {
            ports,
            settings,
            capabilities,
            audit,
        }
    }

    /// Run every stage. Faults end the run in `Failed` with the fault
    /// attached; a catalog with nothing to offer ends it in `Complete`.
    pub async fn run(&self) -> RunOutcome {
        let mut report = RunReport::new();
        report.audit_dir = self.audit.dir().map(Path::to_path_buf);

        match self.execute(&mut report).await {
            Ok(code) => {
                info!(code = ?code, targets = report.targets.len(), fetched = report.fetched.len(), "Run finished");
                RunOutcome {
                    report,
                    fault: None,
                    code,
                }
            }
            Err(fault) => {
                error!(stage = %fault.stage, error = %fault.error, "Run failed");
                transition(&mut report, Stage::Failed);
                RunOutcome {
                    report,
                    fault: Some(fault),
                    code: CompletionCode::Failed,
                }
            }
        }
    }

    async fn execute(&self, report: &mut RunReport) -> Result<CompletionCode, PipelineFault> {
        let policy = &self.settings.policy;
        let mut effective = EffectivePolicy {
            hardware_must_be_present: policy.hardware_must_be_present,
            update_only_dated_drivers: policy.update_only_dated_drivers,
            used_fallback_enumerator: false,
            comparison_available: false,
        };

        transition(report, Stage::Describing);
        let description = self
            .describe(report, &mut effective)
            .await
            .map_err(|e| PipelineFault::new(Stage::Describing, e))?;
        report.policy = Some(effective);

        transition(report, Stage::Matching);
        let candidates = self
            .match_drivers(&description.request)
            .await
            .map_err(|e| PipelineFault::new(Stage::Matching, e))?;

        transition(report, Stage::Reconciling);
        if candidates.is_empty() {
            warn!("Catalog returned no drivers for this hardware");
            report.warnings.push(DomainError::NoDriversFound.to_string());
            transition(report, Stage::Complete);
            return Ok(CompletionCode::NoDriversFound);
        }
        let targets = self.reconcile(report, &mut effective, candidates, &description);
        report.targets = targets;
        report.policy = Some(effective);

        transition(report, Stage::Resolving);
        let content_ids = self
            .resolve(&report.targets)
            .await
            .map_err(|e| PipelineFault::new(Stage::Resolving, e))?;
        report.content_ids = content_ids;

        if report.content_ids.is_empty() || !policy.download {
            info!(
                content_ids = report.content_ids.len(),
                download = policy.download,
                "Skipping download"
            );
            if policy.install {
                let reason = if policy.download {
                    "no content to download"
                } else {
                    "download disabled"
                };
                warn!(reason, "Installation skipped");
                report
                    .warnings
                    .push(format!("Installation skipped: {}", reason));
            }
            transition(report, Stage::Complete);
            return Ok(CompletionCode::Complete);
        }

        transition(report, Stage::Fetching);
        let (fetched, failures) = self.fetch(&report.content_ids).await;
        report.fetched = fetched;
        if !failures.is_empty() {
            return Err(PipelineFault::new(
                Stage::Fetching,
                DomainError::Download { failures },
            ));
        }

        if !policy.install || report.fetched.is_empty() {
            transition(report, Stage::Complete);
            return Ok(CompletionCode::Complete);
        }
        if !self.capabilities.elevated {
            let fault = DomainError::Privilege {
                operation: "driver installation".to_string(),
            };
            warn!(error = %fault, "Installation skipped");
            report.warnings.push(fault.to_string());
            transition(report, Stage::Complete);
            return Ok(CompletionCode::Complete);
        }

        transition(report, Stage::Installing);
        self.ports
            .installer
            .install(&report.fetched, policy.allow_restart)
            .await
            .map_err(|e| PipelineFault::new(Stage::Installing, e))?;
        report.installed = true;

        transition(report, Stage::Complete);
        Ok(CompletionCode::Complete)
    }

    async fn describe(
        &self,
        report: &mut RunReport,
        effective: &mut EffectivePolicy,
    ) -> Result<Description, DomainError> {
        let primary = Arc::clone(&self.ports.enumerator);
        let (devices, enumerator) = match enumerate(Arc::clone(&primary)).await {
            Ok(devices) => (devices, primary),
            Err(primary_error) => {
                let Some(fallback) = self.ports.fallback.as_ref().map(Arc::clone) else {
                    return Err(primary_error);
                };
                warn!(
                    primary = primary.name(),
                    fallback = fallback.name(),
                    error = %primary_error,
                    "Primary enumeration failed, using fallback"
                );
                report.warnings.push(format!(
                    "{} enumeration failed ({}), used {}",
                    primary.name(),
                    primary_error,
                    fallback.name()
                ));
                effective.used_fallback_enumerator = true;
                (enumerate(Arc::clone(&fallback)).await?, fallback)
            }
        };

        let reports_presence = enumerator.reports_presence();
        let relax = effective.used_fallback_enumerator || !reports_presence;
        if relax && (effective.hardware_must_be_present || effective.update_only_dated_drivers) {
            warn!(
                enumerator = enumerator.name(),
                fallback = effective.used_fallback_enumerator,
                reports_presence,
                "Presence and update-only policies disabled for this enumerator"
            );
        }
        if relax {
            effective.hardware_must_be_present = false;
            effective.update_only_dated_drivers = false;
        }

        info!(enumerator = enumerator.name(), devices = devices.len(), "Devices enumerated");
        self.audit.record("devices", &devices_table(&devices));

        let request = build_request(
            &devices,
            &DescribeOptions {
                categories: self.settings.policy.categories.clone(),
                wildcard: self.settings.policy.category_wildcard,
                hardware_must_be_present: effective.hardware_must_be_present,
            },
        );
        info!(
            hardware_ids = request.devices.len(),
            categories = request.categories.include.len(),
            "Hardware request built"
        );

        Ok(Description {
            devices,
            request,
            comparable: !relax,
        })
    }

    async fn match_drivers(
        &self,
        request: &HardwareRequest,
    ) -> Result<Vec<CandidateDriver>, DomainError> {
        let rows = self.ports.catalog.match_hardware(request).await?;
        let matched = interpret_match_rows(rows);
        if matched.is_empty() {
            return Ok(Vec::new());
        }

        let ci_ids = distinct_ci_ids(&matched);
        debug!(matches = matched.len(), ci_ids = ci_ids.len(), "Catalog matched hardware");
        let records = self.ports.catalog.driver_details(&ci_ids).await?;
        let candidates = into_candidates(records, &matched)?;

        info!(candidates = candidates.len(), "Candidate drivers received");
        self.audit.record("candidates", &drivers_table(&candidates));
        Ok(candidates)
    }

    fn reconcile(
        &self,
        report: &mut RunReport,
        effective: &mut EffectivePolicy,
        candidates: Vec<CandidateDriver>,
        description: &Description,
    ) -> Vec<CandidateDriver> {
        let received = candidates.len();
        let mut targets = select_targets(candidates, self.settings.policy.find_all);

        if effective.update_only_dated_drivers && !self.capabilities.elevated {
            let fault = DomainError::Privilege {
                operation: "installed driver comparison".to_string(),
            };
            warn!(error = %fault, "Update-only policy disabled");
            report.warnings.push(fault.to_string());
            effective.update_only_dated_drivers = false;
        }

        effective.comparison_available = self.capabilities.elevated && description.comparable;
        if effective.comparison_available {
            let comparisons = compare_with_installed(&targets, &description.devices);
            self.audit.record("comparison", &comparison_table(&comparisons));
            if effective.update_only_dated_drivers {
                targets = retain_newer(targets, &comparisons);
            }
            report.comparisons = Some(comparisons);
        }

        info!(
            received,
            targets = targets.len(),
            find_all = self.settings.policy.find_all,
            update_only = effective.update_only_dated_drivers,
            "Drivers reconciled"
        );
        self.audit.record("targets", &drivers_table(&targets));
        targets
    }

    /// Look up the content ids of every target, at most `workers` at a time.
    async fn resolve(&self, targets: &[CandidateDriver]) -> Result<Vec<String>, DomainError> {
        let ci_ids: BTreeSet<i64> = targets.iter().map(|t| t.ci_id).collect();
        let catalog = self.ports.catalog.as_ref();

        let results: Vec<(i64, Result<Vec<String>, DomainError>)> = stream::iter(ci_ids)
            .map(|ci_id| async move { (ci_id, catalog.content_ids(ci_id).await) })
            .buffer_unordered(self.settings.workers)
            .collect()
            .await;

        let mut mappings = Vec::new();
        let mut failures = Vec::new();
        for (ci_id, result) in results {
            match result {
                Ok(content_ids) => {
                    if content_ids.is_empty() {
                        debug!(ci_id, "No content mapped to catalog item");
                    }
                    mappings.push(ContentMapping { ci_id, content_ids });
                }
                Err(e) => {
                    warn!(ci_id, error = %e, "Content lookup failed");
                    failures.push((ci_id, e.to_string()));
                }
            }
        }

        if !failures.is_empty() {
            failures.sort_by_key(|(ci_id, _)| *ci_id);
            return Err(DomainError::ContentLookup { failures });
        }

        let content_ids = merge_content_ids(&mappings);
        info!(items = mappings.len(), content_ids = content_ids.len(), "Content resolved");
        Ok(content_ids)
    }

    /// Download every package, at most `workers` at a time. Returns the
    /// packages that arrived and the ids that did not.
    async fn fetch(&self, content_ids: &[String]) -> (Vec<FetchedPackage>, Vec<(String, String)>) {
        let fetcher = self.ports.fetcher.as_ref();
        let target_dir = self.settings.target_dir.as_path();

        let results: Vec<(&String, Result<FetchedPackage, DomainError>)> = stream::iter(content_ids)
            .map(|content_id| async move { (content_id, fetcher.fetch(content_id, target_dir).await) })
            .buffer_unordered(self.settings.workers)
            .collect()
            .await;

        let mut fetched = Vec::new();
        let mut failures = Vec::new();
        for (content_id, result) in results {
            match result {
                Ok(package) => fetched.push(package),
                Err(e) => {
                    warn!(content_id = %content_id, error = %e, "Download failed");
                    failures.push((content_id.clone(), e.to_string()));
                }
            }
        }
        fetched.sort_by(|a, b| a.content_id.cmp(&b.content_id));
        failures.sort();

        info!(
            fetched = fetched.len(),
            failed = failures.len(),
            target_dir = ?target_dir,
            "Downloads finished"
        );
        (fetched, failures)
    }
}

fn transition(report: &mut RunReport, next: Stage) {
    let from = report.stage;
    if report.advance(next) {
        info!(from = %from, to = %next, "Stage transition");
    } else {
        warn!(from = %from, to = %next, "Ignored illegal stage transition");
    }
}

/// Enumeration touches the OS synchronously, so it runs on the blocking pool.
async fn enumerate(enumerator: Arc<dyn DeviceEnumerator>) -> Result<Vec<Device>, DomainError> {
    let name = enumerator.name();
    tokio::task::spawn_blocking(move || enumerator.enumerate())
        .await
        .map_err(|e| DomainError::Enumeration(format!("{} enumerator panicked: {}", name, e)))?
}

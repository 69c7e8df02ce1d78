use std::fmt::Write as _;

use serde::Serialize;

use crate::app::{AppController, Elevation, RunOutcome};
use crate::domain::{CompletionCode, DomainError};

/// Run the pipeline once and print its outcome.
///
/// Configuration faults never reach the pipeline and map straight to their
/// own exit code.
pub async fn run(controller: &AppController, elevation: Elevation, json: bool) -> CompletionCode {
    match controller.run(elevation).await {
        Ok(outcome) => {
            if json {
                match serde_json::to_string_pretty(&outcome.report) {
                    Ok(text) => println!("{}", text),
                    Err(e) => eprintln!("Failed to serialize run report: {}", e),
                }
            } else {
                print!("{}", summarize(&outcome));
            }
            if let Some(fault) = &outcome.fault {
                eprintln!("error: {}", fault);
            }
            outcome.code
        }
        Err(e) => {
            eprintln!("error: {}", e);
            CompletionCode::ConfigurationFault
        }
    }
}

/// Human-readable summary of a run.
pub fn summarize(outcome: &RunOutcome) -> String {
    let report = &outcome.report;
    let mut out = String::new();

    let _ = writeln!(out, "Result:      {:?} ({})", outcome.code, report.stage);
    let _ = writeln!(out, "Targets:     {}", report.targets.len());
    for target in &report.targets {
        let date = target.date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "  {:>8}  {}  {}  {}  {}",
            target.ci_id, target.inf_file, target.version, date, target.provider
        );
    }
    let _ = writeln!(out, "Content ids: {}", report.content_ids.len());
    let _ = writeln!(out, "Downloaded:  {}", report.fetched.len());
    if report.installed {
        let _ = writeln!(out, "Installed:   yes");
    }
    for warning in &report.warnings {
        let _ = writeln!(out, "warning: {}", warning);
    }
    if let Some(dir) = &report.audit_dir {
        let _ = writeln!(out, "Audit:       {}", dir.display());
    }
    out
}

/// Render the effective configuration as TOML with secrets masked, saving
/// it first when asked.
pub fn config(controller: &AppController, save: bool) -> Result<String, DomainError> {
    if save {
        controller.save_config()?;
    }
    Ok(toml::to_string_pretty(&controller.config().redacted())?)
}

/// Application paths information.
#[derive(Debug, Serialize)]
pub struct AppPaths {
    pub config_path: String,
    pub logs_dir: String,
    pub audit_dir: String,
}

pub fn paths(controller: &AppController) -> AppPaths {
    AppPaths {
        config_path: controller.config_path().to_string_lossy().to_string(),
        logs_dir: controller.logs_dir().to_string_lossy().to_string(),
        audit_dir: controller.audit_root().to_string_lossy().to_string(),
    }
}

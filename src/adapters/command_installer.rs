use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::domain::config::InstallerConfig;
use crate::domain::{DomainError, FetchedPackage};
use crate::ports::Installer;

/// Installs staged packages by running the OS driver utility once per
/// package directory.
pub struct CommandInstaller {
    config: InstallerConfig,
}

impl CommandInstaller {
    pub fn new(config: InstallerConfig) -> Self {
        Self { config }
    }

    /// Arguments for one package, with `{dir}` substituted.
    fn args_for(&self, dir: &Path, allow_restart: bool) -> Vec<String> {
        let dir = dir.to_string_lossy();
        let mut args: Vec<String> = self
            .config
            .args
            .iter()
            .map(|a| a.replace("{dir}", &dir))
            .collect();
        if allow_restart {
            if let Some(arg) = &self.config.restart_arg {
                args.push(arg.clone());
            }
        }
        args
    }
}

#[async_trait]
impl Installer for CommandInstaller {
    async fn install(&self, packages: &[FetchedPackage], allow_restart: bool) -> Result<(), DomainError> {
        let mut failures = Vec::new();

        for package in packages {
            let args = self.args_for(&package.path, allow_restart);
            debug!(program = %self.config.program, args = ?args, "Running installer");

            let output = Command::new(&self.config.program)
                .args(&args)
                .output()
                .await
                .map_err(|e| DomainError::Install(format!("cannot run {}: {}", self.config.program, e)))?;

            let code = output.status.code();
            match code {
                Some(c) if self.config.success_codes.contains(&c) => {
                    info!(content_id = %package.content_id, exit_code = c, "Drivers installed");
                }
                _ => {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    warn!(
                        content_id = %package.content_id,
                        exit_code = ?code,
                        stderr = %stderr.trim(),
                        "Installer reported failure"
                    );
                    failures.push(format!("{} (exit {:?})", package.content_id, code));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Install(failures.join(", ")))
        }
    }
}

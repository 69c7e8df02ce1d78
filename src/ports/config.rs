use std::path::PathBuf;

use crate::domain::{AppConfig, DomainError};

/// Where staging settings live between runs.
pub trait ConfigStore: Send + Sync {
    /// Read the stored settings, writing defaults first when the file is missing.
    fn load(&self) -> Result<AppConfig, DomainError>;

    fn save(&self, config: &AppConfig) -> Result<(), DomainError>;

    fn config_path(&self) -> PathBuf;

    /// Directory for the rolling run log.
    fn logs_dir(&self) -> PathBuf;

    /// Per-run audit tables are written below this directory.
    fn audit_dir(&self) -> PathBuf {
        self.logs_dir().join("audit")
    }
}

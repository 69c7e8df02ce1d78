use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::domain::DomainError;

/// Environment variables consulted when a site value is not configured.
pub const ENV_TARGET_PATH: &str = "DRIVERSTAGE_TARGET_PATH";
pub const ENV_CATALOG_SERVER: &str = "DRIVERSTAGE_CATALOG_SERVER";
pub const ENV_DATABASE: &str = "DRIVERSTAGE_DATABASE";
pub const ENV_DISTRIBUTION_ENDPOINT: &str = "DRIVERSTAGE_DISTRIBUTION_ENDPOINT";

/// Site identification: where drivers come from and where they are staged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Directory the downloaded packages are staged into.
    pub target_path: Option<PathBuf>,
    /// Base URL of the catalog gateway.
    pub catalog_server: Option<String>,
    /// Catalog database name.
    pub database: Option<String>,
    /// Host (and optional path) serving content packages.
    pub distribution_endpoint: Option<String>,
}

impl SiteConfig {
    /// Fill every unset value from its environment variable.
    pub fn discover_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.target_path.is_none() {
            self.target_path = non_empty(ENV_TARGET_PATH).map(PathBuf::from);
        }
        if self.catalog_server.is_none() {
            self.catalog_server = non_empty(ENV_CATALOG_SERVER);
        }
        if self.database.is_none() {
            self.database = non_empty(ENV_DATABASE);
        }
        if self.distribution_endpoint.is_none() {
            self.distribution_endpoint = non_empty(ENV_DISTRIBUTION_ENDPOINT);
        }
    }

    /// Names of the required values that are still unresolved.
    pub fn missing(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.target_path.is_none() {
            missing.push("site.target_path".to_string());
        }
        if is_blank(&self.catalog_server) {
            missing.push("site.catalog_server".to_string());
        }
        if is_blank(&self.database) {
            missing.push("site.database".to_string());
        }
        if is_blank(&self.distribution_endpoint) {
            missing.push("site.distribution_endpoint".to_string());
        }
        missing
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Driver selection and staging policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Keep every catalog match instead of the newest per logical driver.
    pub find_all: bool,
    /// Only describe devices that are currently attached.
    pub hardware_must_be_present: bool,
    /// Only keep drivers newer than the installed ones (needs privilege).
    pub update_only_dated_drivers: bool,
    /// Category tags to include (OR).
    pub categories: Vec<String>,
    /// Match category tags as substrings.
    pub category_wildcard: bool,
    /// Download resolved content packages.
    pub download: bool,
    /// Install downloaded packages on the running OS.
    pub install: bool,
    /// Let the installer restart the machine.
    pub allow_restart: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            find_all: false,
            hardware_must_be_present: true,
            update_only_dated_drivers: false,
            categories: Vec::new(),
            category_wildcard: false,
            download: true,
            install: false,
            allow_restart: false,
        }
    }
}

/// Credentials for the distribution endpoint. The password is wiped on drop.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Transfer settings shared by catalog lookups and downloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Use HTTPS for the distribution endpoint.
    pub use_ssl: bool,
    /// Optional basic-auth credentials for the distribution endpoint.
    pub credentials: Option<Credentials>,
    /// Upper bound on parallel content lookups and downloads.
    pub workers: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            use_ssl: true,
            credentials: None,
            workers: 4,
            timeout_secs: 300,
        }
    }
}

impl TransferConfig {
    /// Worker limit, never zero.
    pub fn worker_limit(&self) -> usize {
        self.workers.max(1)
    }
}

/// Location of the device inventory exported by the platform enumerator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub path: Option<PathBuf>,
}

/// OS driver installation utility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Program to run.
    pub program: String,
    /// Arguments; `{dir}` is replaced by each package directory.
    pub args: Vec<String>,
    /// Extra argument appended when a restart is allowed.
    pub restart_arg: Option<String>,
    /// Exit codes that mean success (pnputil: 259 nothing to do, 3010 reboot pending).
    pub success_codes: Vec<i32>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            program: "pnputil".to_string(),
            args: vec![
                "/add-driver".to_string(),
                "{dir}\\*.inf".to_string(),
                "/subdirs".to_string(),
                "/install".to_string(),
            ],
            restart_arg: Some("/reboot".to_string()),
            success_codes: vec![0, 259, 3010],
        }
    }
}

/// Audit artifact configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Write tabular dumps of each stage's data.
    pub enabled: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Enable file logging with rotation.
    pub file_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: true,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub policy: PolicyConfig,
    pub transfer: TransferConfig,
    pub inventory: InventoryConfig,
    pub installer: InstallerConfig,
    pub audit: AuditConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Create a new AppConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve unset site values from the process environment.
    pub fn discover(&mut self) {
        self.site.discover_from(|key| std::env::var(key).ok());
    }

    /// Check that every required value is present.
    pub fn validate(&self) -> Result<(), DomainError> {
        let missing = self.site.missing();
        if !missing.is_empty() {
            return Err(DomainError::MissingParameters { missing });
        }
        if self.transfer.timeout_secs == 0 {
            return Err(DomainError::Config(
                "transfer.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Copy of the configuration that is safe to print.
    pub fn redacted(&self) -> AppConfig {
        let mut copy = self.clone();
        if let Some(credentials) = copy.transfer.credentials.as_mut() {
            credentials.password = "<redacted>".to_string();
        }
        copy
    }
}

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::adapters::content_fetcher::distribution_base;
use crate::adapters::{
    CommandInstaller, EndpointGuard, HttpCatalogClient, HttpContentFetcher, InventoryFileEnumerator,
    ModaliasEnumerator, TomlConfigStore,
};
use crate::app::pipeline::{Pipeline, PipelinePorts, PipelineSettings, RunOutcome};
use crate::domain::{AppConfig, Capabilities, DomainError};
use crate::infrastructure::{detect_capabilities, init_logging, AuditTrail, LogGuard};
use crate::ports::{ConfigStore, DeviceEnumerator};

/// Values given on the command line. Each one that is set wins over the
/// configuration file and the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub target_path: Option<PathBuf>,
    pub catalog_server: Option<String>,
    pub database: Option<String>,
    pub distribution_endpoint: Option<String>,
    pub inventory: Option<PathBuf>,
    pub find_all: bool,
    pub update_only_dated: bool,
    pub include_absent: bool,
    pub categories: Vec<String>,
    pub wildcard: bool,
    pub no_download: bool,
    pub install: bool,
    pub allow_restart: bool,
    pub no_ssl: bool,
    pub workers: Option<usize>,
    pub log_level: Option<String>,
}

impl Overrides {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(path) = &self.target_path {
            config.site.target_path = Some(path.clone());
        }
        if let Some(server) = &self.catalog_server {
            config.site.catalog_server = Some(server.clone());
        }
        if let Some(database) = &self.database {
            config.site.database = Some(database.clone());
        }
        if let Some(endpoint) = &self.distribution_endpoint {
            config.site.distribution_endpoint = Some(endpoint.clone());
        }
        if let Some(inventory) = &self.inventory {
            config.inventory.path = Some(inventory.clone());
        }

        let policy = &mut config.policy;
        policy.find_all |= self.find_all;
        policy.update_only_dated_drivers |= self.update_only_dated;
        if self.include_absent {
            policy.hardware_must_be_present = false;
        }
        if !self.categories.is_empty() {
            policy.categories = self.categories.clone();
        }
        policy.category_wildcard |= self.wildcard;
        if self.no_download {
            policy.download = false;
        }
        policy.install |= self.install;
        policy.allow_restart |= self.allow_restart;

        if self.no_ssl {
            config.transfer.use_ssl = false;
        }
        if let Some(workers) = self.workers {
            config.transfer.workers = workers;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

/// Where the elevation flag comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Elevation {
    #[default]
    Detect,
    Assume,
    Deny,
}

/// Loads configuration, sets up logging and wires adapters into a pipeline.
pub struct AppController {
    config: AppConfig,
    config_store: TomlConfigStore,
    _log_guard: LogGuard,
}

impl AppController {
    /// Load configuration from `config_path` (or the default location),
    /// apply `overrides`, fill the rest from the environment and start
    /// logging.
    pub fn new(config_path: Option<PathBuf>, overrides: &Overrides) -> Result<Self, DomainError> {
        let config_store = TomlConfigStore::new(config_path)?;

        let mut config = config_store.load()?;
        overrides.apply(&mut config);
        config.discover();

        let log_guard = init_logging(&config_store.logs_dir(), &config.logging)?;

        info!(
            version = env!("CARGO_PKG_VERSION"),
            config_path = ?config_store.config_path(),
            "driverstage starting up"
        );

        Ok(Self {
            config,
            config_store,
            _log_guard: log_guard,
        })
    }

    /// The effective configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Persist the effective configuration.
    pub fn save_config(&self) -> Result<(), DomainError> {
        self.config_store.save(&self.config)
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_store.config_path()
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.config_store.logs_dir()
    }

    pub fn audit_root(&self) -> PathBuf {
        self.config_store.audit_dir()
    }

    /// Validate the configuration and run the pipeline once.
    ///
    /// Configuration faults are returned before any stage starts.
    pub async fn run(&self, elevation: Elevation) -> Result<RunOutcome, DomainError> {
        self.config.validate()?;
        let settings = PipelineSettings::from_config(&self.config)?;

        let capabilities = match elevation {
            Elevation::Detect => detect_capabilities(),
            Elevation::Assume => Capabilities { elevated: true },
            Elevation::Deny => Capabilities { elevated: false },
        };
        if elevation != Elevation::Detect {
            warn!(elevated = capabilities.elevated, "Privilege detection overridden");
        }

        let ports = self.build_ports()?;
        let audit = if self.config.audit.enabled {
            AuditTrail::create(&self.audit_root())
        } else {
            AuditTrail::disabled()
        };

        let pipeline = Pipeline::new(ports, settings, capabilities, audit);
        Ok(pipeline.run().await)
    }

    fn build_ports(&self) -> Result<PipelinePorts, DomainError> {
        let site = &self.config.site;
        let transfer = &self.config.transfer;

        let server = required(&site.catalog_server, "site.catalog_server")?;
        let database = required(&site.database, "site.database")?;
        let endpoint = required(&site.distribution_endpoint, "site.distribution_endpoint")?;

        let distribution = distribution_base(endpoint, transfer.use_ssl)?;
        let http = Arc::new(EndpointGuard::new(
            &[server, distribution.as_str()],
            Duration::from_secs(transfer.timeout_secs),
        )?);

        let catalog = HttpCatalogClient::new(Arc::clone(&http), server, database)?;
        let fetcher = HttpContentFetcher::new(http, distribution, transfer.credentials.clone());

        let modalias: Arc<dyn DeviceEnumerator> = Arc::new(ModaliasEnumerator::new());
        let (enumerator, fallback) = match &self.config.inventory.path {
            Some(path) => {
                let inventory: Arc<dyn DeviceEnumerator> =
                    Arc::new(InventoryFileEnumerator::new(path.clone()));
                (inventory, Some(modalias))
            }
            None => {
                info!("No device inventory configured, enumerating modalias entries");
                (modalias, None)
            }
        };

        Ok(PipelinePorts {
            enumerator,
            fallback,
            catalog: Arc::new(catalog),
            fetcher: Arc::new(fetcher),
            installer: Arc::new(CommandInstaller::new(self.config.installer.clone())),
        })
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, DomainError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DomainError::MissingParameters {
            missing: vec![name.to_string()],
        })
}

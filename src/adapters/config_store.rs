use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::domain::{AppConfig, DomainError};
use crate::ports::ConfigStore;

/// TOML-based configuration store with OS-specific paths.
pub struct TomlConfigStore {
    config_path: PathBuf,
    logs_dir: PathBuf,
}

impl TomlConfigStore {
    /// Create a store for `config_path`, or for the default location when
    /// no path is given.
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, DomainError> {
        let (config_path, logs_dir) = match config_path {
            Some(path) => {
                let logs = path
                    .parent()
                    .map(|p| p.join("logs"))
                    .unwrap_or_else(|| PathBuf::from("logs"));
                (path, logs)
            }
            None => (Self::default_config_dir()?.join("config.toml"), Self::default_logs_dir()?),
        };

        debug!(config_path = ?config_path, logs_dir = ?logs_dir, "ConfigStore initialized");

        Ok(Self {
            config_path,
            logs_dir,
        })
    }

    /// Get the OS-specific configuration directory.
    /// - macOS: ~/Library/Application Support/driverstage/
    /// - Windows: %APPDATA%\driverstage\
    /// - Linux: ~/.config/driverstage/
    fn default_config_dir() -> Result<PathBuf, DomainError> {
        dirs::config_dir()
            .map(|p| p.join("driverstage"))
            .ok_or_else(|| DomainError::Config("Could not find configuration directory".to_string()))
    }

    /// Get the OS-specific log directory.
    /// - macOS: ~/Library/Application Support/driverstage/logs/
    /// - Windows: %LOCALAPPDATA%\driverstage\logs\
    /// - Linux: ~/.local/share/driverstage/logs/
    fn default_logs_dir() -> Result<PathBuf, DomainError> {
        #[cfg(target_os = "windows")]
        {
            if let Some(local) = dirs::data_local_dir() {
                return Ok(local.join("driverstage").join("logs"));
            }
        }

        dirs::data_dir()
            .map(|p| p.join("driverstage").join("logs"))
            .or_else(|| Self::default_config_dir().ok().map(|p| p.join("logs")))
            .ok_or_else(|| DomainError::Config("Could not find log directory".to_string()))
    }
}

impl ConfigStore for TomlConfigStore {
    fn load(&self) -> Result<AppConfig, DomainError> {
        let config_path = self.config_path();

        if config_path.exists() {
            debug!(path = ?config_path, "Loading configuration");
            let content = fs::read_to_string(&config_path)?;
            let config: AppConfig = toml::from_str(&content)?;
            info!(path = ?config_path, "Configuration loaded");
            Ok(config)
        } else {
            info!(path = ?config_path, "Configuration file not found, creating default");
            let config = AppConfig::new();
            self.save(&config)?;
            Ok(config)
        }
    }

    fn save(&self, config: &AppConfig) -> Result<(), DomainError> {
        let config_path = self.config_path();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&config_path, content)?;

        info!(path = ?config_path, "Configuration saved");
        Ok(())
    }

    fn config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    fn logs_dir(&self) -> PathBuf {
        self.logs_dir.clone()
    }
}

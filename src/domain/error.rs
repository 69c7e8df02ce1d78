use thiserror::Error;

use crate::domain::pipeline::Stage;

/// Domain-level errors for driverstage.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Required site parameters are still missing after auto-discovery.
    #[error("Configuration error: unresolved {}", missing.join(", "))]
    MissingParameters { missing: Vec<String> },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Device enumeration failed: {0}")]
    Enumeration(String),

    #[error("Catalog returned no matching drivers")]
    NoDriversFound,

    #[error("Catalog returned malformed driver data: {0}")]
    DataShape(String),

    #[error("Insufficient privilege for {operation}")]
    Privilege { operation: String },

    #[error("Catalog request failed: {0}")]
    Catalog(String),

    #[error("Content lookup failed for {} catalog item(s): {}", failures.len(), format_failures(failures))]
    ContentLookup { failures: Vec<(i64, String)> },

    #[error("Download failed for {} package(s): {}", failures.len(), format_failures(failures))]
    Download { failures: Vec<(String, String)> },

    #[error("Package verification failed for {file}: expected {expected}, got {actual}")]
    PackageVerification {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("HTTP request failed: {0}")]
    HttpRequest(String),

    #[error("Installer failed: {0}")]
    Install(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),
}

fn format_failures<K: std::fmt::Display>(failures: &[(K, String)]) -> String {
    failures
        .iter()
        .map(|(key, reason)| format!("{key} ({reason})"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for DomainError {
    fn from(err: toml::de::Error) -> Self {
        DomainError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DomainError {
    fn from(err: toml::ser::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

/// A fault that stopped the pipeline, tagged with the stage it happened in.
#[derive(Error, Debug)]
#[error("{stage} stage failed: {error}")]
pub struct PipelineFault {
    pub stage: Stage,
    #[source]
    pub error: DomainError,
}

impl PipelineFault {
    pub fn new(stage: Stage, error: DomainError) -> Self {
        Self { stage, error }
    }
}

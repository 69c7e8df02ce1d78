pub mod config;
pub mod content;
pub mod device;
pub mod driver;
pub mod error;
pub mod pipeline;
pub mod reconcile;

pub use config::{AppConfig, Credentials};
pub use content::{ContentMapping, FetchedPackage};
pub use device::{Device, HardwareRequest, InstalledDriver};
pub use driver::{CandidateDriver, DriverDate, DriverVersion, MatchRow, MatchedItem, RawDriverRecord};
pub use error::{DomainError, PipelineFault};
pub use pipeline::{Capabilities, CompletionCode, EffectivePolicy, RunReport, Stage};
pub use reconcile::InstalledComparison;

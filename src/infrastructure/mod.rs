pub mod audit;
pub mod logging;
pub mod privilege;

pub use audit::AuditTrail;
pub use logging::{init_logging, LogGuard};
pub use privilege::detect_capabilities;

use crate::domain::{Device, DomainError};

/// Port for local device enumeration.
///
/// The primary enumerator reports presence and installed drivers. A fallback
/// enumerator may not, which is what `reports_presence` signals.
pub trait DeviceEnumerator: Send + Sync {
    /// Enumerate every device the platform knows about, attached or not.
    fn enumerate(&self) -> Result<Vec<Device>, DomainError>;

    /// Whether presence flags and installed driver versions are meaningful.
    fn reports_presence(&self) -> bool;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

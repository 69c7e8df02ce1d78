use async_trait::async_trait;

use crate::domain::{DomainError, FetchedPackage};

/// Port for applying downloaded drivers to the running OS.
///
/// Callers check privilege before invoking it.
#[async_trait]
pub trait Installer: Send + Sync {
    async fn install(&self, packages: &[FetchedPackage], allow_restart: bool) -> Result<(), DomainError>;
}

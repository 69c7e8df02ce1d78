use std::path::Path;

use async_trait::async_trait;

use crate::domain::{DomainError, FetchedPackage};

/// Port for downloading content packages from the distribution endpoint.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Download one content package into `target_dir/<content_id>/`.
    async fn fetch(&self, content_id: &str, target_dir: &Path) -> Result<FetchedPackage, DomainError>;
}

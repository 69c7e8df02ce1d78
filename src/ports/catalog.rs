use async_trait::async_trait;

use crate::domain::{DomainError, HardwareRequest, MatchRow, RawDriverRecord};

/// Port for the driver catalog.
///
/// The transport owns serialization; the core only shapes typed queries and
/// validates what comes back.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Match hardware against the catalog.
    ///
    /// Returns raw rows; an empty list or a leading sentinel means nothing
    /// matched.
    async fn match_hardware(&self, request: &HardwareRequest) -> Result<Vec<MatchRow>, DomainError>;

    /// Fetch driver details for a set of catalog item ids.
    async fn driver_details(&self, ci_ids: &[i64]) -> Result<Vec<RawDriverRecord>, DomainError>;

    /// Look up the content package ids for one catalog item.
    ///
    /// Items without downloadable content return an empty list.
    async fn content_ids(&self, ci_id: i64) -> Result<Vec<String>, DomainError>;
}

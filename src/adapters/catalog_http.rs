use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::domain::{DomainError, HardwareRequest, MatchRow, RawDriverRecord};
use crate::ports::{CatalogClient, HttpClient};

#[derive(Debug, Deserialize)]
struct MatchResponse {
    #[serde(default)]
    rows: Vec<MatchRow>,
}

#[derive(Debug, Serialize)]
struct DriverDetailsQuery<'a> {
    ci_ids: &'a [i64],
}

#[derive(Debug, Deserialize)]
struct DriverDetailsResponse {
    #[serde(default)]
    drivers: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    content_ids: Vec<String>,
}

/// Catalog client speaking JSON to the catalog gateway.
///
/// Endpoints, relative to `{server}/api/v1/{database}/`:
/// - `POST match` with the hardware request
/// - `POST drivers` with `{"ci_ids": [...]}`
/// - `GET items/{ci_id}/content`
pub struct HttpCatalogClient<C: HttpClient> {
    http: Arc<C>,
    base: Url,
}

impl<C: HttpClient> HttpCatalogClient<C> {
    pub fn new(http: Arc<C>, server: &str, database: &str) -> Result<Self, DomainError> {
        let mut base = Url::parse(server)
            .map_err(|e| DomainError::Config(format!("Invalid catalog server '{}': {}", server, e)))?;
        base.path_segments_mut()
            .map_err(|_| DomainError::Config(format!("Catalog server '{}' cannot be a base URL", server)))?
            .pop_if_empty()
            .extend(["api", "v1", database]);

        info!(base = %base, "Catalog client configured");
        Ok(Self { http, base })
    }

    fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url.to_string()
    }
}

#[async_trait]
impl<C: HttpClient + 'static> CatalogClient for HttpCatalogClient<C> {
    async fn match_hardware(&self, request: &HardwareRequest) -> Result<Vec<MatchRow>, DomainError> {
        let url = self.endpoint(&["match"]);
        debug!(url = %url, devices = request.devices.len(), "Querying catalog matches");

        let response: MatchResponse = self
            .http
            .post_json(&url, request)
            .await
            .map_err(|e| DomainError::Catalog(format!("match query failed: {}", e)))?;
        Ok(response.rows)
    }

    async fn driver_details(&self, ci_ids: &[i64]) -> Result<Vec<RawDriverRecord>, DomainError> {
        let url = self.endpoint(&["drivers"]);
        debug!(url = %url, count = ci_ids.len(), "Querying driver details");

        let response: DriverDetailsResponse = self
            .http
            .post_json(&url, &DriverDetailsQuery { ci_ids })
            .await
            .map_err(|e| DomainError::Catalog(format!("driver detail query failed: {}", e)))?;

        // Rows that are not records at all are a shape fault, not a transport one
        response
            .drivers
            .into_iter()
            .map(|row| {
                serde_json::from_value::<RawDriverRecord>(row)
                    .map_err(|e| DomainError::DataShape(format!("unreadable driver row: {}", e)))
            })
            .collect()
    }

    async fn content_ids(&self, ci_id: i64) -> Result<Vec<String>, DomainError> {
        let url = self.endpoint(&["items", &ci_id.to_string(), "content"]);
        let response: ContentResponse = self
            .http
            .get_json(&url, None)
            .await
            .map_err(|e| DomainError::Catalog(format!("content lookup for {} failed: {}", ci_id, e)))?;
        Ok(response.content_ids)
    }
}

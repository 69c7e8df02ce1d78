use std::path::Path;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::{Credentials, DomainError};

/// HTTP client port for all network requests.
/// All network traffic must go through this interface.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform a GET request and deserialize the response as JSON.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        auth: Option<&Credentials>,
    ) -> Result<T, DomainError>;

    /// Perform a POST request with JSON body.
    async fn post_json<T: Serialize + Send + Sync, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<R, DomainError>;

    /// Download a file to a specified path. Returns bytes written and the
    /// SHA-256 of the content.
    async fn download_file(
        &self,
        url: &str,
        path: &Path,
        auth: Option<&Credentials>,
    ) -> Result<(u64, String), DomainError>;

    /// Hosts requests may go to.
    fn allowed_hosts(&self) -> Vec<String>;
}

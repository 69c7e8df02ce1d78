use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::{Credentials, DomainError};
use crate::ports::HttpClient;

/// EndpointGuard is the single HTTP client of a run.
///
/// Requests are only allowed to the hosts of the configured catalog server
/// and distribution endpoint; anything else is refused before it leaves the
/// process.
pub struct EndpointGuard {
    client: Client,
    allowed_hosts: Vec<String>,
}

impl EndpointGuard {
    /// Create a guard that allows the hosts of the given base URLs.
    pub fn new(base_urls: &[&str], timeout: Duration) -> Result<Self, DomainError> {
        let allowed_hosts = base_urls
            .iter()
            .map(|u| host_of(u))
            .collect::<Result<Vec<_>, _>>()?;
        Self::with_hosts(allowed_hosts, timeout)
    }

    fn with_hosts(allowed_hosts: Vec<String>, timeout: Duration) -> Result<Self, DomainError> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .user_agent(format!("driverstage/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DomainError::HttpRequest(format!("Failed to create HTTP client: {}", e)))?;

        info!(allowed_hosts = ?allowed_hosts, "EndpointGuard initialized");

        Ok(Self {
            client,
            allowed_hosts,
        })
    }

    /// Check if a URL targets one of the allowed hosts.
    fn is_url_allowed(&self, url: &str) -> Result<(), DomainError> {
        let host = host_of(url)?;
        if !self.allowed_hosts.iter().any(|h| h.eq_ignore_ascii_case(&host)) {
            warn!(url = url, host = %host, "Request blocked: host is not a configured endpoint");
            return Err(DomainError::HttpRequest(format!(
                "Host '{}' is not a configured endpoint",
                host
            )));
        }
        debug!(url = url, "Request allowed");
        Ok(())
    }

    async fn send(request: RequestBuilder, url: &str) -> Result<Response, DomainError> {
        let response = request
            .send()
            .await
            .map_err(|e| DomainError::HttpRequest(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::HttpRequest(format!(
                "HTTP {} for {}",
                status, url
            )));
        }
        Ok(response)
    }
}

fn with_auth(request: RequestBuilder, auth: Option<&Credentials>) -> RequestBuilder {
    match auth {
        Some(c) => request.basic_auth(&c.username, Some(&c.password)),
        None => request,
    }
}

/// Host part of a URL, lower-cased.
pub fn host_of(url: &str) -> Result<String, DomainError> {
    let parsed = Url::parse(url).map_err(|e| DomainError::HttpRequest(format!("{}: {}", url, e)))?;
    parsed
        .host_str()
        .map(|h| h.to_ascii_lowercase())
        .ok_or_else(|| DomainError::HttpRequest(format!("Invalid URL: no host in {}", url)))
}

#[async_trait]
impl HttpClient for EndpointGuard {
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        auth: Option<&Credentials>,
    ) -> Result<T, DomainError> {
        self.is_url_allowed(url)?;

        let response = Self::send(with_auth(self.client.get(url), auth), url).await?;
        response
            .json()
            .await
            .map_err(|e| DomainError::HttpRequest(e.to_string()))
    }

    async fn post_json<T: Serialize + Send + Sync, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<R, DomainError> {
        self.is_url_allowed(url)?;

        let response = Self::send(self.client.post(url).json(body), url).await?;
        response
            .json()
            .await
            .map_err(|e| DomainError::HttpRequest(e.to_string()))
    }

    async fn download_file(
        &self,
        url: &str,
        path: &Path,
        auth: Option<&Credentials>,
    ) -> Result<(u64, String), DomainError> {
        use futures_util::StreamExt;
        use tokio::io::AsyncWriteExt;

        self.is_url_allowed(url)?;

        let response = Self::send(with_auth(self.client.get(url), auth), url).await?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write to temp file first, then rename atomically
        let temp_path = path.with_extension("download");

        let cleanup_temp = || {
            let temp = temp_path.clone();
            async move { let _ = tokio::fs::remove_file(&temp).await; }
        };

        let mut file = match tokio::fs::File::create(&temp_path).await {
            Ok(f) => f,
            Err(e) => {
                cleanup_temp().await;
                return Err(DomainError::Io(e.to_string()));
            }
        };

        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    drop(file);
                    cleanup_temp().await;
                    return Err(DomainError::HttpRequest(e.to_string()));
                }
            };

            if let Err(e) = file.write_all(&chunk).await {
                drop(file);
                cleanup_temp().await;
                return Err(DomainError::Io(e.to_string()));
            }

            hasher.update(&chunk);
            downloaded += chunk.len() as u64;
        }

        if let Err(e) = file.flush().await {
            drop(file);
            cleanup_temp().await;
            return Err(DomainError::Io(e.to_string()));
        }
        drop(file);

        if let Err(e) = tokio::fs::rename(&temp_path, path).await {
            cleanup_temp().await;
            return Err(DomainError::Io(e.to_string()));
        }

        let digest = format!("{:x}", hasher.finalize());
        debug!(path = ?path, size = downloaded, sha256 = %digest, "File downloaded");
        Ok((downloaded, digest))
    }

    fn allowed_hosts(&self) -> Vec<String> {
        self.allowed_hosts.clone()
    }
}

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use crate::domain::{Credentials, DomainError, FetchedPackage};
use crate::ports::{ContentFetcher, HttpClient};

#[derive(Debug, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    files: Vec<ManifestFile>,
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    name: String,
    #[serde(default)]
    sha256: Option<String>,
}

/// Build the distribution base URL. Endpoints without a scheme get
/// `https` or `http` depending on `use_ssl`.
pub fn distribution_base(endpoint: &str, use_ssl: bool) -> Result<Url, DomainError> {
    let endpoint = endpoint.trim().trim_end_matches('/');
    let full = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        let scheme = if use_ssl { "https" } else { "http" };
        format!("{}://{}", scheme, endpoint)
    };
    Url::parse(&full)
        .map_err(|e| DomainError::Config(format!("Invalid distribution endpoint '{}': {}", endpoint, e)))
}

/// Relative path of a manifest entry, refusing anything that would escape
/// the package directory.
fn safe_relative_path(name: &str) -> Option<PathBuf> {
    let path = Path::new(name.trim());
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if clean.as_os_str().is_empty() {
        None
    } else {
        Some(clean)
    }
}

/// Directory name for a content id. Only a single plain path component is
/// accepted so every package lands directly under the staging directory.
fn package_dir_name(content_id: &str) -> Option<PathBuf> {
    safe_relative_path(content_id).filter(|path| path.components().count() == 1)
}

/// Downloads content packages from the distribution endpoint.
///
/// A package is a directory; `{base}/{content_id}/manifest.json` lists its
/// files, each fetched from `{base}/{content_id}/{name}`.
pub struct HttpContentFetcher<C: HttpClient> {
    http: Arc<C>,
    base: Url,
    credentials: Option<Credentials>,
}

impl<C: HttpClient> HttpContentFetcher<C> {
    pub fn new(http: Arc<C>, base: Url, credentials: Option<Credentials>) -> Self {
        Self {
            http,
            base,
            credentials,
        }
    }

    fn file_url(&self, content_id: &str, name: &str) -> Result<String, DomainError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| DomainError::Config(format!("Distribution endpoint '{}' cannot be a base URL", self.base)))?
            .pop_if_empty()
            .push(content_id)
            .extend(name.split('/'));
        Ok(url.to_string())
    }
}

#[async_trait]
impl<C: HttpClient + 'static> ContentFetcher for HttpContentFetcher<C> {
    async fn fetch(&self, content_id: &str, target_dir: &Path) -> Result<FetchedPackage, DomainError> {
        let dir_name = package_dir_name(content_id).ok_or_else(|| {
            DomainError::DataShape(format!("content id '{}' is not a plain directory name", content_id))
        })?;
        let manifest_url = self.file_url(content_id, "manifest.json")?;
        let manifest: PackageManifest = self
            .http
            .get_json(&manifest_url, self.credentials.as_ref())
            .await?;

        let package_dir = target_dir.join(dir_name);
        let mut total: u64 = 0;
        let mut digests = Vec::with_capacity(manifest.files.len());

        for file in &manifest.files {
            let relative = safe_relative_path(&file.name).ok_or_else(|| {
                DomainError::HttpRequest(format!(
                    "package {} lists unsafe file name '{}'",
                    content_id, file.name
                ))
            })?;
            let url_name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            let url = self.file_url(content_id, &url_name)?;
            let destination = package_dir.join(&relative);

            let (size, sha256) = self
                .http
                .download_file(&url, &destination, self.credentials.as_ref())
                .await?;

            if let Some(expected) = &file.sha256 {
                if !expected.eq_ignore_ascii_case(&sha256) {
                    warn!(content_id, file = %file.name, expected = %expected, actual = %sha256, "Checksum mismatch");
                    let _ = tokio::fs::remove_file(&destination).await;
                    return Err(DomainError::PackageVerification {
                        file: format!("{}/{}", content_id, file.name),
                        expected: expected.clone(),
                        actual: sha256,
                    });
                }
            }

            total += size;
            digests.push(sha256);
        }

        // Package digest: hash over the per-file digests in manifest order
        let package_sha256 = {
            use sha2::{Digest, Sha256};
            let mut hasher = Sha256::new();
            for digest in &digests {
                hasher.update(digest.as_bytes());
            }
            format!("{:x}", hasher.finalize())
        };

        info!(
            content_id,
            files = manifest.files.len(),
            size_bytes = total,
            "Content package downloaded"
        );

        Ok(FetchedPackage {
            content_id: content_id.to_string(),
            path: package_dir,
            size_bytes: total,
            sha256: package_sha256,
        })
    }
}

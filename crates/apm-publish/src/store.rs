//! Content-addressed storage of release directories
//!
//! [`ContentAddressStore`] uploads a release directory and resolves a
//! published release back into its documents. Both halves sit behind
//! traits so the pipeline never talks HTTP directly.

use crate::content_uri::ContentUri;
use crate::error::{PublishError, TransportError};
use crate::ignore::IgnorePatterns;
use apm_artifact::{RepoContent, ARTIFACT_NAME, FLAT_CODE_NAME, MANIFEST_NAME};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One file of an upload, addressed by its release-relative path
///
/// Contents stay on disk until the transport streams them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// `/`-joined path inside the release
    pub path: String,
    /// Location of the file on disk
    pub source: PathBuf,
    /// Size in bytes when the release was walked
    pub size: u64,
}

/// Write side of a content-addressed store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentTransport: Send + Sync {
    /// Probe the store; returns its reported version
    async fn version(&self) -> Result<String, TransportError>;

    /// Add files as one directory; returns the directory's root hash
    async fn add(&self, files: Vec<UploadFile>) -> Result<String, TransportError>;
}

/// Read side: plain text over a gateway
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, TransportError>;
}

/// Uploads and resolves releases
#[derive(Clone)]
pub struct ContentAddressStore {
    transport: Arc<dyn ContentTransport>,
    fetcher: Arc<dyn ContentFetcher>,
}

impl std::fmt::Debug for ContentAddressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentAddressStore").finish_non_exhaustive()
    }
}

impl ContentAddressStore {
    #[must_use]
    pub fn new(transport: Arc<dyn ContentTransport>, fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self { transport, fetcher }
    }

    /// Check the store answers before doing any work
    ///
    /// # Errors
    /// Returns transport error if the store is unreachable
    pub async fn ensure_available(&self) -> Result<(), PublishError> {
        let version = self.transport.version().await?;
        tracing::debug!(%version, "content store available");
        Ok(())
    }

    /// Upload every non-ignored file under `dir`
    ///
    /// Returns the root hash of the uploaded directory.
    ///
    /// # Errors
    /// Returns error if the directory cannot be read or the upload fails
    pub async fn upload(&self, dir: &Path, ignore: &IgnorePatterns) -> Result<String, PublishError> {
        let files = ignore.collect_files(dir)?;
        if files.is_empty() {
            return Err(PublishError::configuration(format!(
                "nothing to upload in {}",
                dir.display()
            )));
        }
        let count = files.len();
        let bytes: u64 = files.iter().map(|f| f.size).sum();
        let hash = self.transport.add(files).await?;
        tracing::info!(dir = %dir.display(), files = count, bytes, %hash, "uploaded release");
        Ok(hash)
    }

    /// Fetch artifact, manifest and flattened source of a published release
    ///
    /// # Errors
    /// Returns error if any document is unreachable or malformed
    pub async fn resolve(
        &self,
        uri: &ContentUri,
        gateway: Option<&str>,
    ) -> Result<RepoContent, PublishError> {
        let base = uri.fetch_url(gateway)?;
        let base = base.trim_end_matches('/');
        let url = |name: &str| format!("{base}/{name}");

        let (artifact_url, manifest_url, code_url) =
            (url(ARTIFACT_NAME), url(MANIFEST_NAME), url(FLAT_CODE_NAME));
        let (artifact, manifest, flat_code) = futures::try_join!(
            self.fetcher.fetch_text(&artifact_url),
            self.fetcher.fetch_text(&manifest_url),
            self.fetcher.fetch_text(&code_url),
        )?;

        tracing::debug!(%uri, "resolved release content");
        Ok(RepoContent::from_documents(&artifact, &manifest, flat_code)?)
    }
}

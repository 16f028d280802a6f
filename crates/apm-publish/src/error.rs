//! Error types for the publish pipeline
//!
//! Provides error handling for:
//! - Pre-flight checks (configuration, permissions, versions)
//! - Artifact generation and validation
//! - Content addressing and transport
//! - External collaborators (deployment, frontend build)

use crate::content_uri::ContentUriError;
use crate::ignore::IgnoreError;
use crate::validator::ValidationReport;
use crate::version::VersionError;
use apm_artifact::{AppNameError, ArtifactError};
use apm_introspect::ParseError;
use std::path::PathBuf;

/// Main publish error type
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Required configuration missing or malformed
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Sender lacks the on-chain permission to publish
    #[error("permission denied: {0}")]
    Permission(String),

    /// Unparsable or non-increasing version
    #[error("invalid version: {0}")]
    InvalidVersion(#[from] VersionError),

    /// Contract source could not be parsed
    #[error("contract parse failed: {0}")]
    Parse(#[from] ParseError),

    /// Artifact, manifest and source disagree
    #[error("validation failed:\n{0}")]
    Validation(ValidationReport),

    /// Malformed content URI or missing gateway
    #[error("content uri error: {0}")]
    ContentUri(#[from] ContentUriError),

    /// Content store, gateway, pinning or chain RPC failure
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Document read/write failure
    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    /// Contract deployment failed
    #[error("deployment failed: {0}")]
    Deployment(String),

    /// Frontend build script failed
    #[error("frontend build failed: {0}")]
    FrontendBuild(String),
}

impl PublishError {
    /// Check if error happened before any expensive work
    #[inline]
    #[must_use]
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Permission(_) | Self::InvalidVersion(_)
        )
    }

    /// Create configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

impl From<AppNameError> for PublishError {
    fn from(err: AppNameError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<IgnoreError> for PublishError {
    fn from(err: IgnoreError) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Failures talking to an external service
///
/// Shared by the content store, gateway, pinning service and chain RPC.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Request could not be sent or completed
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// Service answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Response body was not what the protocol promises
    #[error("unexpected response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    /// Local file could not be read for upload
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Chain RPC failure
    #[error("chain rpc error: {0}")]
    Chain(String),
}

impl TransportError {
    /// Create request error for url
    pub fn request(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Request {
            url: url.into(),
            message: err.to_string(),
        }
    }

    /// Create invalid response error for url
    pub fn invalid_response(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

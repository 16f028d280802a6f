//! Chain collaborator interfaces
//!
//! The pipeline reads registry state through [`ChainReader`] and submits
//! transactions through [`ChainWriter`]. Neither signs anything; key
//! management lives entirely behind the writer.

use crate::content_uri::ContentUri;
use crate::encoder::PublishTransaction;
use crate::error::TransportError;
use apm_artifact::{Address, Digest32, SemanticVersion};
use async_trait::async_trait;
use once_cell::sync::Lazy;

/// Role a sender needs on an existing repo to publish a version
pub static CREATE_VERSION_ROLE: Lazy<Digest32> = Lazy::new(|| Digest32::id("CREATE_VERSION_ROLE"));

/// Role a sender needs on a registry to create a repo
pub static CREATE_REPO_ROLE: Lazy<Digest32> = Lazy::new(|| Digest32::id("CREATE_REPO_ROLE"));

/// Latest version published in a repo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub version: SemanticVersion,
    pub contract_address: Address,
    pub content_uri: ContentUri,
}

/// Read-only registry access
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Resolve an ENS name; `None` when the name is unregistered
    async fn resolve_name(&self, name: &str) -> Result<Option<Address>, TransportError>;

    /// Latest version of the repo at `repo`; `None` for an empty repo
    async fn latest_version(&self, repo: Address) -> Result<Option<VersionRecord>, TransportError>;

    /// Whether `who` holds `role` on `target`
    async fn can_perform(
        &self,
        target: Address,
        who: Address,
        role: Digest32,
    ) -> Result<bool, TransportError>;

    async fn chain_id(&self) -> Result<u64, TransportError>;

    /// Number of transactions sent from `address` (its next nonce)
    async fn transaction_count(&self, address: Address) -> Result<u64, TransportError>;
}

/// Submits an encoded transaction; returns its hash
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainWriter: Send + Sync {
    async fn send(&self, transaction: &PublishTransaction) -> Result<Digest32, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_digests() {
        assert_eq!(*CREATE_VERSION_ROLE, Digest32::id("CREATE_VERSION_ROLE"));
        assert_ne!(*CREATE_VERSION_ROLE, *CREATE_REPO_ROLE);
    }
}

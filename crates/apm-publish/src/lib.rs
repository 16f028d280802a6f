//! APM Publish Pipeline
//!
//! Publishes a new version of an application to an APM registry: resolves
//! the next version, settles the contract address, builds and validates the
//! release documents, uploads them to content-addressed storage and encodes
//! the registry transaction.
//!
//! # Core Concepts
//!
//! - [`VersionResolver`]: next version from a bump keyword or explicit version
//! - [`ContentUri`]: the `protocol:location` content URI scheme
//! - [`ContentAddressStore`]: uploads releases and resolves them back
//! - [`ArtifactBuilder`]: generates `artifact.json` from contract source
//! - [`ArtifactValidator`]: cross-checks manifest, artifact and source
//! - [`PublishEncoder`]: permission check and registry call encoding
//! - [`Publisher`]: the whole pipeline over injected collaborators
//!
//! # Example
//!
//! ```rust,ignore
//! use apm_publish::{Collaborators, PublishConfig, PublishRequest, Publisher};
//!
//! let config = PublishConfig::load(&root)?;
//! let publisher = Publisher::new(config, &root, collaborators)
//!     .with_deployer(deployer)
//!     .with_pinning(pinning);
//!
//! let outcome = publisher
//!     .publish(&PublishRequest::new("minor", "rinkeby", sender))
//!     .await?;
//! println!("published {} at {}", outcome.next_version, outcome.content_hash);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod builder;
pub mod chain;
pub mod config;
pub mod content_uri;
pub mod deploy;
pub mod encoder;
pub mod error;
pub mod frontend;
pub mod ignore;
pub mod ipfs;
pub mod pinning;
pub mod pipeline;
pub mod store;
pub mod validator;
pub mod version;

pub use builder::ArtifactBuilder;
pub use chain::{ChainReader, ChainWriter, VersionRecord, CREATE_REPO_ROLE, CREATE_VERSION_ROLE};
pub use config::{AppConfig, AppManifest, Environment, IpfsConfig, PinataConfig, PublishConfig};
pub use content_uri::{ContentUri, ContentUriError, Protocol};
pub use deploy::{
    predict_contract_address, ContractDeployer, ContractPlan, ContractSource, ContractVerifier,
    FileContractSource,
};
pub use encoder::{explorer_tx_url, PublishCall, PublishEncoder, PublishTransaction, VersionInfo};
pub use error::{PublishError, TransportError};
pub use frontend::{FrontendBuilder, NpmScriptBuilder};
pub use ignore::{IgnoreError, IgnorePatterns};
pub use ipfs::{HttpFetcher, IpfsHttpClient};
pub use pinning::{pin_label, PinataClient, PinningService};
pub use pipeline::{
    best_effort, Collaborators, PublishOutcome, PublishRequest, Publisher, SideEffect,
    SideEffectOutcome,
};
pub use store::{ContentAddressStore, ContentFetcher, ContentTransport, UploadFile};
pub use validator::{ArtifactValidator, ValidationFinding, ValidationReport};
pub use version::{Bump, Resolution, VersionError, VersionResolver};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

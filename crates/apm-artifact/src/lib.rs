//! APM Artifact Model
//!
//! Data model shared by every stage of the publish pipeline.
//!
//! # Core Concepts
//!
//! - [`Digest32`]: 32-byte keccak-256 value (role ids, app ids, selectors)
//! - [`Address`]: 20-byte account address
//! - [`SemanticVersion`]: `major.minor.patch` with `u16` components
//! - [`AppName`]: `short.registry` ENS application name
//! - [`Artifact`], [`Manifest`], [`RepoContent`]: the documents of a release
//! - [`abi`]: ABI fragments and call encoding
//!
//! # Example
//!
//! ```rust,ignore
//! use apm_artifact::{AppName, RoleDeclaration};
//!
//! let name = AppName::parse("finance.aragonpm.eth")?;
//! let role = RoleDeclaration::new("CREATE_PAYMENTS_ROLE", "Create payments", vec![]).with_hash();
//! println!("{} {}", name.app_id(), role.bytes);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod app_name;
mod artifact;
mod content;
mod hash;
mod manifest;
mod version;

pub mod abi;

pub use abi::{AbiError, AbiFragment, AbiParam, FragmentKind};
pub use app_name::{AppName, AppNameError};
pub use artifact::{
    Artifact, ArtifactError, ArtifactFunction, Dependency, RequiredPermission, RoleDeclaration,
    RoleWithHash, FLATTENED_CODE_PATH,
};
pub use content::{RepoContent, ARTIFACT_NAME, FLAT_CODE_NAME, MANIFEST_NAME};
pub use hash::{namehash, Address, Digest32, HashError};
pub use manifest::{Icon, Manifest, Screenshot};
pub use version::{BumpKind, SemanticVersion, VersionParseError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

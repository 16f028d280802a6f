//! The `artifact.json` document
//!
//! Describes a contract's callable surface, the permission roles it
//! declares and the metadata clients need to render transactions. An
//! [`Artifact`] is content-addressed downstream, so serialization must be
//! deterministic: field order is fixed by declaration and every map is a
//! `BTreeMap`.

use crate::abi::AbiFragment;
use crate::hash::Digest32;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Relative location of the flattened source inside a release
pub const FLATTENED_CODE_PATH: &str = "./code.sol";

/// A permission role declared by the application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDeclaration {
    /// Human-readable description (`Create new payments`)
    pub name: String,
    /// Identifier used in contract code (`CREATE_PAYMENTS_ROLE`)
    pub id: String,
    /// Descriptions of the role's permission parameters
    #[serde(default)]
    pub params: Vec<String>,
}

impl RoleDeclaration {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            params,
        }
    }

    /// Attach the on-chain role digest
    #[must_use]
    pub fn with_hash(self) -> RoleWithHash {
        let bytes = Digest32::id(&self.id);
        RoleWithHash { role: self, bytes }
    }
}

/// A declared role plus `keccak256(id)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleWithHash {
    #[serde(flatten)]
    pub role: RoleDeclaration,
    pub bytes: Digest32,
}

/// One callable entry point of the contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactFunction {
    /// Role ids required to call this function
    pub roles: Vec<String>,
    /// Normalized signature (`newPayment(address,uint256)`)
    pub sig: String,
    /// NatSpec `@notice`, if any
    pub notice: Option<String>,
    /// Matching ABI entry, `null` when the ABI has none for `sig`
    pub abi: Option<AbiFragment>,
}

/// A permission this app needs on another installed app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredPermission {
    pub name: String,
    pub params: String,
}

/// Another app this app depends on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    /// `vault.aragonpm.eth`
    pub app_name: String,
    /// Version range (`^4.0.0`)
    pub version: String,
    /// Initialization parameter name (`_vault`)
    pub init_param: String,
    /// State variable holding the dependency (`vault`)
    pub state: String,
    #[serde(default)]
    pub required_permissions: Vec<RequiredPermission>,
}

/// The complete artifact document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub roles: Vec<RoleWithHash>,
    pub abi: Vec<AbiFragment>,
    /// State-changing public surface, `initialize()` included
    pub functions: Vec<ArtifactFunction>,
    /// Functions no longer available, keyed by the version that removed them
    #[serde(default)]
    pub deprecated_functions: BTreeMap<String, Vec<ArtifactFunction>>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    /// Where the flattened source lives inside the release
    #[serde(rename = "flattenedCode")]
    pub flattened_code_path: String,
    pub app_id: Digest32,
    pub app_name: String,
}

impl Artifact {
    /// Look up a declared role by id
    #[must_use]
    pub fn role(&self, id: &str) -> Option<&RoleWithHash> {
        self.roles.iter().find(|r| r.role.id == id)
    }

    /// Ids of every declared role, in declaration order
    pub fn declared_role_ids(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(|r| r.role.id.as_str())
    }

    /// Canonical bytes: pretty JSON with a trailing newline
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_canonical_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        canonical_json(self)
    }
}

pub(crate) fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Errors reading or writing publish documents
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// IO failure on a document path
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON document
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ArtifactError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create JSON error for path
    pub fn json_error(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

//! Next-version resolution

use apm_artifact::{BumpKind, SemanticVersion, VersionParseError};
use std::fmt::{self, Display, Formatter};

/// How the next version was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bump {
    /// Relative increment of one component
    Kind(BumpKind),
    /// Version given verbatim
    Explicit,
}

impl Display for Bump {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind(kind) => Display::fmt(kind, f),
            Self::Explicit => f.write_str("explicit"),
        }
    }
}

/// Outcome of [`VersionResolver::resolve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub bump: Bump,
    pub next_version: SemanticVersion,
}

impl Resolution {
    /// Whether this release needs a freshly deployed contract
    ///
    /// True for a first publish, a major bump, or an explicit version
    /// whose major component is above the previous one.
    #[must_use]
    pub fn requires_deployment(&self, previous: Option<SemanticVersion>) -> bool {
        let Some(previous) = previous else {
            return true;
        };
        match self.bump {
            Bump::Kind(BumpKind::Major) => true,
            Bump::Kind(_) => false,
            Bump::Explicit => self.next_version.major > previous.major,
        }
    }
}

/// Errors when resolving the next version
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// Neither a bump keyword nor a version
    #[error("'{0}' is not a bump keyword (major, minor, patch) or a semantic version")]
    UnknownBump(String),

    /// Looked like a version but is not a valid one
    #[error(transparent)]
    Malformed(#[from] VersionParseError),

    /// Explicit version does not exceed the published one
    #[error("version {requested} must be greater than the latest published version {previous}")]
    NotIncreasing {
        requested: SemanticVersion,
        previous: SemanticVersion,
    },
}

/// Computes the next version from a bump keyword or explicit version
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionResolver;

impl VersionResolver {
    /// Resolve `input` against the latest published version
    ///
    /// A missing previous version counts as `0.0.0`.
    ///
    /// # Errors
    /// Returns error for unknown keywords, malformed versions and explicit
    /// versions that do not strictly increase
    pub fn resolve(
        &self,
        input: &str,
        previous: Option<SemanticVersion>,
    ) -> Result<Resolution, VersionError> {
        let input = input.trim();

        if let Some(kind) = BumpKind::from_keyword(input) {
            let base = previous.unwrap_or_default();
            return Ok(Resolution {
                bump: Bump::Kind(kind),
                next_version: base.bump(kind)?,
            });
        }

        if !input.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(VersionError::UnknownBump(input.to_string()));
        }

        let requested: SemanticVersion = input.parse()?;
        if let Some(previous) = previous {
            if requested <= previous {
                return Err(VersionError::NotIncreasing {
                    requested,
                    previous,
                });
            }
        }

        Ok(Resolution {
            bump: Bump::Explicit,
            next_version: requested,
        })
    }
}

//! Semantic versions as stored by the registry
//!
//! The registry keeps versions as `uint16[3]`, so every component is a
//! `u16` and pre-release or build metadata is rejected.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Which component of a version to increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpKind {
    Major,
    Minor,
    Patch,
}

impl BumpKind {
    /// Parse a bump keyword (`major`, `minor`, `patch`)
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "major" => Some(Self::Major),
            "minor" => Some(Self::Minor),
            "patch" => Some(Self::Patch),
            _ => None,
        }
    }

    /// Keyword form
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
        }
    }
}

impl Display for BumpKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `major.minor.patch` version, totally ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SemanticVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl SemanticVersion {
    /// Create a version from its components
    #[inline]
    #[must_use]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Version from the registry's array form
    #[inline]
    #[must_use]
    pub const fn from_array(parts: [u16; 3]) -> Self {
        Self::new(parts[0], parts[1], parts[2])
    }

    /// Registry array form `[major, minor, patch]`
    #[inline]
    #[must_use]
    pub const fn to_array(self) -> [u16; 3] {
        [self.major, self.minor, self.patch]
    }

    /// Increment one component and reset every lower-order component
    ///
    /// # Errors
    /// Returns error if the incremented component overflows `u16`
    pub fn bump(self, kind: BumpKind) -> Result<Self, VersionParseError> {
        let overflow = || VersionParseError::ComponentOverflow(format!("{self} + {kind}"));
        Ok(match kind {
            BumpKind::Major => Self::new(self.major.checked_add(1).ok_or_else(overflow)?, 0, 0),
            BumpKind::Minor => {
                Self::new(self.major, self.minor.checked_add(1).ok_or_else(overflow)?, 0)
            }
            BumpKind::Patch => Self::new(
                self.major,
                self.minor,
                self.patch.checked_add(1).ok_or_else(overflow)?,
            ),
        })
    }
}

impl Display for SemanticVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SemanticVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = semver::Version::parse(s.trim())
            .map_err(|e| VersionParseError::Invalid(s.to_string(), e.to_string()))?;

        if !parsed.pre.is_empty() || !parsed.build.is_empty() {
            return Err(VersionParseError::Invalid(
                s.to_string(),
                "pre-release and build metadata are not supported".to_string(),
            ));
        }

        let component = |value: u64| {
            u16::try_from(value).map_err(|_| VersionParseError::ComponentOverflow(s.to_string()))
        };

        Ok(Self::new(
            component(parsed.major)?,
            component(parsed.minor)?,
            component(parsed.patch)?,
        ))
    }
}

impl Serialize for SemanticVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemanticVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors when parsing semantic versions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    /// Not a strict `x.y.z` version
    #[error("invalid semantic version '{0}': {1}")]
    Invalid(String, String),

    /// A component does not fit the registry's `uint16`
    #[error("version component out of range: {0}")]
    ComponentOverflow(String),
}

//! Registry application names
//!
//! An application is addressed by its full ENS name, `short.registry`
//! (e.g. `finance.aragonpm.eth`): the first label is the repo name inside
//! the registry named by the remaining labels.

use crate::hash::{namehash, Digest32};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Fully-qualified application name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppName {
    full: String,
    split: usize,
}

impl AppName {
    /// Parse a fully-qualified name
    ///
    /// # Errors
    /// Returns error if the name has fewer than two labels or an empty label
    pub fn parse(name: &str) -> Result<Self, AppNameError> {
        let full = name.trim().to_lowercase();
        if full.split('.').any(str::is_empty) {
            return Err(AppNameError::EmptyLabel(name.to_string()));
        }
        let split = full
            .find('.')
            .ok_or_else(|| AppNameError::MissingRegistry(name.to_string()))?;
        Ok(Self { full, split })
    }

    /// Full ENS name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.full
    }

    /// Repo name inside the registry (`finance`)
    #[inline]
    #[must_use]
    pub fn short_name(&self) -> &str {
        &self.full[..self.split]
    }

    /// Registry ENS name (`aragonpm.eth`)
    #[inline]
    #[must_use]
    pub fn registry_name(&self) -> &str {
        &self.full[self.split + 1..]
    }

    /// Deterministic application id: namehash of the full name
    #[inline]
    #[must_use]
    pub fn app_id(&self) -> Digest32 {
        namehash(&self.full)
    }
}

impl Display for AppName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl FromStr for AppName {
    type Err = AppNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Errors when parsing application names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppNameError {
    #[error("app name '{0}' has no registry part (expected <name>.<registry>)")]
    MissingRegistry(String),

    #[error("app name '{0}' contains an empty label")]
    EmptyLabel(String),
}

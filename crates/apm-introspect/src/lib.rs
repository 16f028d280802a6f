//! APM Contract Introspection
//!
//! Static analysis of Solidity source, limited to what a publish artifact
//! needs: the state-changing entry points of a contract, the permission
//! roles guarding them and their NatSpec notices.
//!
//! # Core Concepts
//!
//! - [`ContractIntrospector`]: the capability the publish pipeline depends on
//! - [`SolidityIntrospector`]: tree-sitter implementation
//! - [`RoleGuardStrategy`]: decides which modifiers denote role requirements
//!
//! # Example
//!
//! ```rust,ignore
//! use apm_introspect::{ContractIntrospector, ExtractOptions, SolidityIntrospector};
//!
//! let functions = SolidityIntrospector::default()
//!     .extract(&flat_code, "Finance", ExtractOptions::only_target())?;
//! for f in &functions {
//!     println!("{} {:?}", f.signature, f.roles);
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod functions;
mod guards;
mod natspec;
mod state;
mod syntax;
mod types;

pub use error::ParseError;
pub use functions::{ContractFunction, ExtractOptions};
pub use guards::{AuthModifierGuards, ModifierInvocation, RoleGuardStrategy, RoleRequirement};

use std::sync::Arc;
use syntax::ParsedSource;

/// Extracts the callable surface of a contract from its source
///
/// Every method is a pure function of the source text.
pub trait ContractIntrospector: Send + Sync {
    /// State-changing entry points of `target`
    ///
    /// # Errors
    /// Fails on malformed source or when `target` is not declared
    fn extract(
        &self,
        source: &str,
        target: &str,
        options: ExtractOptions,
    ) -> Result<Vec<ContractFunction>, ParseError>;

    /// Whether any contract in the source declares a constructor
    ///
    /// # Errors
    /// Fails on malformed source
    fn has_constructor(&self, source: &str) -> Result<bool, ParseError>;

    /// Names of state variables initialized at declaration
    ///
    /// # Errors
    /// Fails on malformed source
    fn find_initialized_state_variables(&self, source: &str) -> Result<Vec<String>, ParseError>;
}

/// Tree-sitter based introspector
#[derive(Debug, Clone)]
pub struct SolidityIntrospector {
    guards: Arc<dyn RoleGuardStrategy>,
}

impl SolidityIntrospector {
    /// Introspector with a custom role guard strategy
    #[must_use]
    pub fn with_guards(guards: Arc<dyn RoleGuardStrategy>) -> Self {
        Self { guards }
    }
}

impl Default for SolidityIntrospector {
    fn default() -> Self {
        Self::with_guards(Arc::new(AuthModifierGuards))
    }
}

impl ContractIntrospector for SolidityIntrospector {
    fn extract(
        &self,
        source: &str,
        target: &str,
        options: ExtractOptions,
    ) -> Result<Vec<ContractFunction>, ParseError> {
        let parsed = ParsedSource::parse(source)?;
        let functions = functions::extract_functions(&parsed, target, options, self.guards.as_ref())?;
        tracing::debug!(
            contract = target,
            only_target = options.only_target_contract,
            count = functions.len(),
            "extracted contract functions"
        );
        Ok(functions)
    }

    fn has_constructor(&self, source: &str) -> Result<bool, ParseError> {
        let parsed = ParsedSource::parse(source)?;
        Ok(state::has_constructor(&parsed))
    }

    fn find_initialized_state_variables(&self, source: &str) -> Result<Vec<String>, ParseError> {
        let parsed = ParsedSource::parse(source)?;
        Ok(state::initialized_state_variables(&parsed))
    }
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Artifact generation

use apm_artifact::{
    AbiFragment, AppName, Artifact, ArtifactFunction, Dependency, FragmentKind, RoleDeclaration,
    FLATTENED_CODE_PATH,
};
use apm_introspect::{ContractIntrospector, ExtractOptions, ParseError};
use std::collections::BTreeMap;
use std::sync::Arc;

const FALLBACK_SIGNATURE: &str = "fallback()";

/// Builds `artifact.json` from source, ABI and declared roles
#[derive(Clone)]
pub struct ArtifactBuilder {
    introspector: Arc<dyn ContractIntrospector>,
}

impl std::fmt::Debug for ArtifactBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactBuilder").finish_non_exhaustive()
    }
}

impl ArtifactBuilder {
    #[must_use]
    pub fn new(introspector: Arc<dyn ContractIntrospector>) -> Self {
        Self { introspector }
    }

    /// Build the artifact for `contract_name` declared in `flat_code`
    ///
    /// Only functions declared directly on the contract are listed. Each
    /// is paired with the ABI entry of the same signature; a `fallback()`
    /// missing from the ABI gets a synthetic payable entry. Every declared
    /// role is hashed whether or not code uses it.
    ///
    /// # Errors
    /// Returns error if the source cannot be parsed or lacks the contract
    pub fn build(
        &self,
        app_name: &AppName,
        contract_name: &str,
        roles: &[RoleDeclaration],
        dependencies: &[Dependency],
        abi: &[AbiFragment],
        flat_code: &str,
    ) -> Result<Artifact, ParseError> {
        let extracted =
            self.introspector
                .extract(flat_code, contract_name, ExtractOptions::only_target())?;
        let index = callable_index(abi);

        let functions = extracted
            .into_iter()
            .map(|function| {
                let abi = index.get(function.signature.as_str()).map(|f| (*f).clone()).or_else(|| {
                    (function.signature == FALLBACK_SIGNATURE).then(AbiFragment::payable_fallback)
                });
                ArtifactFunction {
                    roles: function.role_ids().map(str::to_string).collect(),
                    sig: function.signature,
                    notice: function.notice,
                    abi,
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            app = %app_name,
            contract = contract_name,
            functions = functions.len(),
            roles = roles.len(),
            "built artifact"
        );

        Ok(Artifact {
            roles: roles.iter().cloned().map(RoleDeclaration::with_hash).collect(),
            abi: abi.to_vec(),
            functions,
            deprecated_functions: BTreeMap::new(),
            dependencies: dependencies.to_vec(),
            flattened_code_path: FLATTENED_CODE_PATH.to_string(),
            app_id: app_name.app_id(),
            app_name: app_name.to_string(),
        })
    }
}

fn callable_index(abi: &[AbiFragment]) -> BTreeMap<String, &AbiFragment> {
    abi.iter()
        .filter(|f| {
            matches!(
                f.kind,
                FragmentKind::Function
                    | FragmentKind::Constructor
                    | FragmentKind::Fallback
                    | FragmentKind::Receive
            )
        })
        .map(|f| (f.signature(), f))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use apm_artifact::{AbiParam, Digest32};
    use apm_introspect::SolidityIntrospector;
    use pretty_assertions::assert_eq;

    const COUNTER: &str = r"
pragma solidity ^0.8.0;

contract Base {
    function baseOnly() external {}
}

contract Counter is Base {
    bytes32 public constant INCREMENT_ROLE = keccak256('INCREMENT_ROLE');
    uint256 public value;

    /// @notice Increment the counter by `step`
    function increment(uint256 step) external auth(INCREMENT_ROLE) {
        value += step;
    }

    function reset() external {}

    fallback() external payable {}
}
";

    fn builder() -> ArtifactBuilder {
        ArtifactBuilder::new(Arc::new(SolidityIntrospector::default()))
    }

    fn app() -> AppName {
        AppName::parse("counter.aragonpm.eth").unwrap()
    }

    fn abi() -> Vec<AbiFragment> {
        vec![
            AbiFragment::function("increment", vec![AbiParam::new("step", "uint256")], "nonpayable"),
            AbiFragment::function("value", Vec::new(), "view"),
        ]
    }

    fn roles() -> Vec<RoleDeclaration> {
        vec![
            RoleDeclaration::new("INCREMENT_ROLE", "Increment the counter", Vec::new()),
            RoleDeclaration::new("UNUSED_ROLE", "Never checked", Vec::new()),
        ]
    }

    #[test]
    fn pairs_functions_with_abi() {
        let artifact = builder()
            .build(&app(), "Counter", &roles(), &[], &abi(), COUNTER)
            .unwrap();

        let sigs: Vec<_> = artifact.functions.iter().map(|f| f.sig.as_str()).collect();
        assert_eq!(sigs, vec!["increment(uint256)", "reset()", "fallback()"]);

        let increment = &artifact.functions[0];
        assert_eq!(increment.roles, vec!["INCREMENT_ROLE"]);
        assert_eq!(increment.notice.as_deref(), Some("Increment the counter by `step`"));
        assert_eq!(increment.abi.as_ref().map(AbiFragment::signature).as_deref(), Some("increment(uint256)"));

        assert!(artifact.functions[1].abi.is_none());
        assert_eq!(artifact.functions[2].abi, Some(AbiFragment::payable_fallback()));
    }

    #[test]
    fn hashes_every_declared_role() {
        let artifact = builder()
            .build(&app(), "Counter", &roles(), &[], &abi(), COUNTER)
            .unwrap();
        assert_eq!(artifact.roles.len(), 2);
        assert_eq!(artifact.roles[1].bytes, Digest32::id("UNUSED_ROLE"));
        assert_eq!(artifact.app_id, app().app_id());
        assert_eq!(artifact.app_name, "counter.aragonpm.eth");
        assert_eq!(artifact.flattened_code_path, "./code.sol");
        assert!(artifact.deprecated_functions.is_empty());
    }

    #[test]
    fn builds_are_byte_identical() {
        let a = builder()
            .build(&app(), "Counter", &roles(), &[], &abi(), COUNTER)
            .unwrap();
        let b = builder()
            .build(&app(), "Counter", &roles(), &[], &abi(), COUNTER)
            .unwrap();
        assert_eq!(a.to_canonical_json().unwrap(), b.to_canonical_json().unwrap());
    }

    #[test]
    fn parse_failures_propagate() {
        let err = builder()
            .build(&app(), "Counter", &roles(), &[], &abi(), "contract Counter {")
            .unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }
}

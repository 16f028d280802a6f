//! Cross-checks of a release directory
//!
//! The manifest, the artifact and the flattened source are edited
//! independently. [`ArtifactValidator`] reports every way they disagree in
//! one pass: files the manifest references but the release lacks, roles the
//! code checks but the artifact does not declare, declared roles no code
//! checks, and roles whose declared parameters disagree with the guard.

use crate::error::PublishError;
use apm_artifact::RepoContent;
use apm_introspect::{ContractIntrospector, ExtractOptions, ParseError};
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::sync::Arc;

/// One disagreement between release documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFinding {
    /// Manifest references a file absent from the release
    MissingFile { id: String, path: String },
    /// Code checks a role the artifact does not declare
    UndeclaredRole { role: String, function: String },
    /// Artifact declares a role no function checks
    UnusedRole { role: String },
    /// Guard passes a different number of parameters than declared
    ParamCountMismatch {
        role: String,
        declared: usize,
        used: usize,
        function: String,
    },
}

impl ValidationFinding {
    /// Short stable identifier of the finding
    #[must_use]
    pub fn id(&self) -> String {
        match self {
            Self::MissingFile { id, .. } => format!("missing-file:{id}"),
            Self::UndeclaredRole { role, .. } => format!("undeclared-role:{role}"),
            Self::UnusedRole { role } => format!("unused-role:{role}"),
            Self::ParamCountMismatch { role, .. } => format!("role-params:{role}"),
        }
    }

    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::MissingFile { id, path } => {
                format!("manifest {id} references '{path}', which is not in the release")
            }
            Self::UndeclaredRole { role, function } => {
                format!("{function} requires role {role}, which is not declared in arapp.json")
            }
            Self::UnusedRole { role } => {
                format!("role {role} is declared but no function requires it")
            }
            Self::ParamCountMismatch {
                role,
                declared,
                used,
                function,
            } => format!(
                "role {role} declares {declared} params but {function} passes {used}"
            ),
        }
    }
}

impl Display for ValidationFinding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id(), self.message())
    }
}

/// All findings of one validation run, in check order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    findings: Vec<ValidationFinding>,
}

impl ValidationReport {
    #[must_use]
    pub fn new(findings: Vec<ValidationFinding>) -> Self {
        Self { findings }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    #[must_use]
    pub fn findings(&self) -> &[ValidationFinding] {
        &self.findings
    }

    /// Turn a non-empty report into an error
    ///
    /// # Errors
    /// Returns [`PublishError::Validation`] when any finding is present
    pub fn into_result(self) -> Result<(), PublishError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(PublishError::Validation(self))
        }
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, finding) in self.findings.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {finding}")?;
        }
        Ok(())
    }
}

/// Validates release directories against their contract source
#[derive(Clone)]
pub struct ArtifactValidator {
    introspector: Arc<dyn ContractIntrospector>,
}

impl fmt::Debug for ArtifactValidator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactValidator").finish_non_exhaustive()
    }
}

impl ArtifactValidator {
    #[must_use]
    pub fn new(introspector: Arc<dyn ContractIntrospector>) -> Self {
        Self { introspector }
    }

    /// Validate the release in `dist`
    ///
    /// Reads but never writes. An empty report means the release passed.
    ///
    /// # Errors
    /// Returns error if the release documents cannot be read or the
    /// flattened source cannot be parsed
    pub fn validate(
        &self,
        dist: &Path,
        contract: &str,
        has_frontend: bool,
    ) -> Result<ValidationReport, PublishError> {
        let content = RepoContent::read_from(dist)?;
        let mut findings = missing_files(&content, dist, has_frontend);
        findings.extend(self.role_mismatches(&content, contract)?);

        let report = ValidationReport::new(findings);
        if report.is_empty() {
            tracing::info!(dist = %dist.display(), "release validated");
        } else {
            tracing::debug!(findings = report.findings().len(), "release has validation findings");
        }
        Ok(report)
    }

    fn role_mismatches(
        &self,
        content: &RepoContent,
        contract: &str,
    ) -> Result<Vec<ValidationFinding>, ParseError> {
        // Inherited functions enforce roles on the deployed contract too
        let functions =
            self.introspector
                .extract(&content.flat_code, contract, ExtractOptions::default())?;
        let artifact = &content.artifact;

        let mut findings = Vec::new();
        let mut used = HashSet::new();
        let mut mismatched = HashSet::new();

        for function in &functions {
            for requirement in &function.roles {
                let first_use = used.insert(requirement.id.clone());
                match artifact.role(&requirement.id) {
                    None if first_use => findings.push(ValidationFinding::UndeclaredRole {
                        role: requirement.id.clone(),
                        function: function.signature.clone(),
                    }),
                    None => {}
                    Some(declared) => {
                        let declared_count = declared.role.params.len();
                        if let Some(used_count) = requirement.param_count {
                            if used_count != declared_count && mismatched.insert(requirement.id.clone()) {
                                findings.push(ValidationFinding::ParamCountMismatch {
                                    role: requirement.id.clone(),
                                    declared: declared_count,
                                    used: used_count,
                                    function: function.signature.clone(),
                                });
                            }
                        }
                    }
                }
            }
        }

        findings.extend(
            artifact
                .declared_role_ids()
                .filter(|id| !used.contains(*id))
                .map(|id| ValidationFinding::UnusedRole { role: id.to_string() }),
        );
        Ok(findings)
    }

    /// Log upgrade-safety hazards in `flat_code`
    ///
    /// Proxied contracts never run constructors or declaration
    /// initializers, so both usually indicate a bug. Returns the warnings
    /// that were logged.
    ///
    /// # Errors
    /// Returns error if the source cannot be parsed
    pub fn upgrade_warnings(&self, flat_code: &str) -> Result<Vec<String>, ParseError> {
        let mut warnings = Vec::new();
        if self.introspector.has_constructor(flat_code)? {
            warnings.push(
                "contract declares a constructor; it will not run behind a proxy".to_string(),
            );
        }
        for name in self.introspector.find_initialized_state_variables(flat_code)? {
            warnings.push(format!(
                "state variable '{name}' is initialized at declaration; it will not be set behind a proxy"
            ));
        }
        for warning in &warnings {
            tracing::warn!("{warning}");
        }
        Ok(warnings)
    }
}

fn missing_files(content: &RepoContent, dist: &Path, has_frontend: bool) -> Vec<ValidationFinding> {
    content
        .manifest
        .referenced_files(has_frontend)
        .into_iter()
        .filter(|(_, path)| !dist.join(path).exists())
        .map(|(id, path)| ValidationFinding::MissingFile { id, path })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use apm_artifact::{Artifact, Digest32, Manifest, RoleDeclaration, Screenshot, FLATTENED_CODE_PATH};
    use apm_introspect::SolidityIntrospector;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::fs;

    const SOURCE: &str = r"
contract Voting {
    function newVote(bytes _script) external auth(CREATE_VOTES_ROLE) {}
    function setQuorum(uint64 _q) external authP(MODIFY_QUORUM_ROLE, arr(_q)) {}
    function vote(uint256 _id) external {}
}
";

    fn write_release(dir: &Path, roles: Vec<RoleDeclaration>, manifest: Manifest) {
        write_release_with_source(dir, roles, manifest, SOURCE);
    }

    fn write_release_with_source(
        dir: &Path,
        roles: Vec<RoleDeclaration>,
        manifest: Manifest,
        source: &str,
    ) {
        let artifact = Artifact {
            roles: roles.into_iter().map(RoleDeclaration::with_hash).collect(),
            abi: Vec::new(),
            functions: Vec::new(),
            deprecated_functions: BTreeMap::new(),
            dependencies: Vec::new(),
            flattened_code_path: FLATTENED_CODE_PATH.into(),
            app_id: Digest32::ZERO,
            app_name: "voting.aragonpm.eth".into(),
        };
        RepoContent::new(artifact, manifest, source).write_to(dir).unwrap();
    }

    fn validator() -> ArtifactValidator {
        ArtifactValidator::new(Arc::new(SolidityIntrospector::default()))
    }

    fn matching_roles() -> Vec<RoleDeclaration> {
        vec![
            RoleDeclaration::new("CREATE_VOTES_ROLE", "Create votes", Vec::new()),
            RoleDeclaration::new("MODIFY_QUORUM_ROLE", "Modify quorum", vec!["New quorum".into()]),
        ]
    }

    #[test]
    fn consistent_release_passes() {
        let dir = tempfile::tempdir().unwrap();
        write_release(dir.path(), matching_roles(), Manifest::default());
        let report = validator().validate(dir.path(), "Voting", true).unwrap();
        assert!(report.is_empty(), "{report}");
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn role_checks_run_in_both_directions() {
        let dir = tempfile::tempdir().unwrap();
        let roles = vec![
            RoleDeclaration::new("MODIFY_QUORUM_ROLE", "Modify quorum", Vec::new()),
            RoleDeclaration::new("MODIFY_SUPPORT_ROLE", "Modify support", Vec::new()),
        ];
        write_release(dir.path(), roles, Manifest::default());

        let report = validator().validate(dir.path(), "Voting", true).unwrap();
        assert_eq!(
            report.findings(),
            &[
                ValidationFinding::UndeclaredRole {
                    role: "CREATE_VOTES_ROLE".into(),
                    function: "newVote(bytes)".into(),
                },
                ValidationFinding::ParamCountMismatch {
                    role: "MODIFY_QUORUM_ROLE".into(),
                    declared: 0,
                    used: 1,
                    function: "setQuorum(uint64)".into(),
                },
                ValidationFinding::UnusedRole {
                    role: "MODIFY_SUPPORT_ROLE".into()
                },
            ]
        );
        assert!(matches!(report.into_result(), Err(PublishError::Validation(_))));
    }

    #[test]
    fn inherited_functions_count_as_role_users() {
        const INHERITING: &str = r"
contract BaseApp {
    function recover() external auth(RECOVER_ROLE) {}
    function pause() external auth(PAUSE_ROLE) {}
}

contract Finance is BaseApp {
    function setPeriod(uint64 _period) external auth(CHANGE_PERIOD_ROLE) {}
}
";
        let dir = tempfile::tempdir().unwrap();
        let roles = vec![
            RoleDeclaration::new("CHANGE_PERIOD_ROLE", "Change period", Vec::new()),
            RoleDeclaration::new("RECOVER_ROLE", "Recover funds", Vec::new()),
        ];
        write_release_with_source(dir.path(), roles, Manifest::default(), INHERITING);

        let report = validator().validate(dir.path(), "Finance", true).unwrap();
        assert_eq!(
            report.findings(),
            &[ValidationFinding::UndeclaredRole {
                role: "PAUSE_ROLE".into(),
                function: "pause()".into(),
            }]
        );
    }

    #[test]
    fn missing_files_skip_assets_without_frontend() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest {
            screenshots: vec![Screenshot {
                src: "/shot.png".into(),
            }],
            start_url: Some("/index.html".into()),
            ..Manifest::default()
        };
        write_release(dir.path(), matching_roles(), manifest);

        let with_frontend = validator().validate(dir.path(), "Voting", true).unwrap();
        let ids: Vec<_> = with_frontend.findings().iter().map(ValidationFinding::id).collect();
        assert_eq!(ids, vec!["missing-file:screenshots[0]", "missing-file:start_url"]);

        fs::write(dir.path().join("index.html"), "<html/>").unwrap();
        let without = validator().validate(dir.path(), "Voting", false).unwrap();
        assert!(without.is_empty(), "{without}");
    }

    #[test]
    fn report_display_lists_findings() {
        let report = ValidationReport::new(vec![
            ValidationFinding::UnusedRole { role: "A_ROLE".into() },
            ValidationFinding::MissingFile {
                id: "script".into(),
                path: "script.js".into(),
            },
        ]);
        assert_eq!(
            report.to_string(),
            "  - [unused-role:A_ROLE] role A_ROLE is declared but no function requires it\n  - [missing-file:script] manifest script references 'script.js', which is not in the release"
        );
    }

    #[test]
    fn upgrade_warnings_are_reported() {
        let source = "contract App { uint256 public fee = 10; constructor() {} }";
        let warnings = validator().upgrade_warnings(source).unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[1].contains("'fee'"));
        assert!(validator().upgrade_warnings(SOURCE).unwrap().is_empty());
    }
}

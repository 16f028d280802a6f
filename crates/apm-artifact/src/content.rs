//! The three-document release bundle

use crate::artifact::{canonical_json, Artifact, ArtifactError};
use crate::manifest::Manifest;
use std::fs;
use std::path::Path;

/// File name of the artifact document inside a release
pub const ARTIFACT_NAME: &str = "artifact.json";
/// File name of the manifest document inside a release
pub const MANIFEST_NAME: &str = "manifest.json";
/// File name of the flattened contract source inside a release
pub const FLAT_CODE_NAME: &str = "code.sol";

/// Artifact, manifest and flattened source, published together
#[derive(Debug, Clone, PartialEq)]
pub struct RepoContent {
    pub artifact: Artifact,
    pub manifest: Manifest,
    pub flat_code: String,
}

impl RepoContent {
    #[must_use]
    pub fn new(artifact: Artifact, manifest: Manifest, flat_code: impl Into<String>) -> Self {
        Self {
            artifact,
            manifest,
            flat_code: flat_code.into(),
        }
    }

    /// Build from the raw text of the three documents
    ///
    /// # Errors
    /// Returns error if either JSON document is malformed
    pub fn from_documents(
        artifact_json: &str,
        manifest_json: &str,
        flat_code: impl Into<String>,
    ) -> Result<Self, ArtifactError> {
        let artifact = serde_json::from_str(artifact_json)
            .map_err(|e| ArtifactError::json_error(ARTIFACT_NAME, e))?;
        let manifest = serde_json::from_str(manifest_json)
            .map_err(|e| ArtifactError::json_error(MANIFEST_NAME, e))?;
        Ok(Self::new(artifact, manifest, flat_code))
    }

    /// Write the three documents into `dir`, overwriting existing files
    ///
    /// # Errors
    /// Returns error on serialization or IO failure
    pub fn write_to(&self, dir: &Path) -> Result<(), ArtifactError> {
        let artifact_path = dir.join(ARTIFACT_NAME);
        let artifact = self
            .artifact
            .to_canonical_json()
            .map_err(|e| ArtifactError::json_error(&artifact_path, e))?;
        fs::write(&artifact_path, artifact).map_err(|e| ArtifactError::io_error(&artifact_path, e))?;

        let manifest_path = dir.join(MANIFEST_NAME);
        let manifest =
            canonical_json(&self.manifest).map_err(|e| ArtifactError::json_error(&manifest_path, e))?;
        fs::write(&manifest_path, manifest).map_err(|e| ArtifactError::io_error(&manifest_path, e))?;

        let code_path = dir.join(FLAT_CODE_NAME);
        fs::write(&code_path, &self.flat_code).map_err(|e| ArtifactError::io_error(&code_path, e))?;

        Ok(())
    }

    /// Read the three documents back from `dir`
    ///
    /// # Errors
    /// Returns error if a file is missing or a document is malformed
    pub fn read_from(dir: &Path) -> Result<Self, ArtifactError> {
        let read = |name: &str| {
            let path = dir.join(name);
            fs::read_to_string(&path).map_err(|e| ArtifactError::io_error(path, e))
        };

        let artifact = read(ARTIFACT_NAME)?;
        let manifest = read(MANIFEST_NAME)?;
        let flat_code = read(FLAT_CODE_NAME)?;

        let artifact = serde_json::from_str(&artifact)
            .map_err(|e| ArtifactError::json_error(dir.join(ARTIFACT_NAME), e))?;
        let manifest = serde_json::from_str(&manifest)
            .map_err(|e| ArtifactError::json_error(dir.join(MANIFEST_NAME), e))?;

        Ok(Self::new(artifact, manifest, flat_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::FLATTENED_CODE_PATH;
    use crate::hash::Digest32;
    use std::collections::BTreeMap;

    fn content() -> RepoContent {
        let artifact = Artifact {
            roles: Vec::new(),
            abi: Vec::new(),
            functions: Vec::new(),
            deprecated_functions: BTreeMap::new(),
            dependencies: Vec::new(),
            flattened_code_path: FLATTENED_CODE_PATH.into(),
            app_id: Digest32::ZERO,
            app_name: "counter.open.aragonpm.eth".into(),
        };
        let manifest = Manifest {
            name: Some("Counter".into()),
            ..Manifest::default()
        };
        RepoContent::new(artifact, manifest, "pragma solidity ^0.8.0;\n")
    }

    #[test]
    fn write_then_read_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let original = content();
        original.write_to(dir.path()).unwrap();

        assert!(dir.path().join(ARTIFACT_NAME).is_file());
        assert!(dir.path().join(MANIFEST_NAME).is_file());
        assert!(dir.path().join(FLAT_CODE_NAME).is_file());
        assert_eq!(RepoContent::read_from(dir.path()).unwrap(), original);
    }

    #[test]
    fn identical_content_writes_identical_bytes() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        content().write_to(a.path()).unwrap();
        content().write_to(b.path()).unwrap();

        for name in [ARTIFACT_NAME, MANIFEST_NAME, FLAT_CODE_NAME] {
            assert_eq!(
                fs::read(a.path().join(name)).unwrap(),
                fs::read(b.path().join(name)).unwrap()
            );
        }
    }

    #[test]
    fn read_from_missing_directory_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = RepoContent::read_from(dir.path()).unwrap_err();
        assert!(err.to_string().contains(ARTIFACT_NAME));
    }

    #[test]
    fn from_documents_rejects_bad_manifest() {
        let artifact = String::from_utf8(content().artifact.to_canonical_json().unwrap()).unwrap();
        let err = RepoContent::from_documents(&artifact, "{not json", "").unwrap_err();
        assert!(matches!(err, ArtifactError::Json { .. }));
    }
}

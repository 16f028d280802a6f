//! Frontend build step

use crate::error::PublishError;
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Builds the app frontend into the release directory
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FrontendBuilder: Send + Sync {
    async fn build(&self, src_dir: &Path, script: &str) -> Result<(), PublishError>;
}

/// Runs `npm run <script>` in the frontend source directory
#[derive(Debug, Clone)]
pub struct NpmScriptBuilder {
    program: String,
}

impl Default for NpmScriptBuilder {
    fn default() -> Self {
        Self {
            program: "npm".to_string(),
        }
    }
}

impl NpmScriptBuilder {
    /// Use another npm-compatible executable (`pnpm`, `yarn`)
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl FrontendBuilder for NpmScriptBuilder {
    async fn build(&self, src_dir: &Path, script: &str) -> Result<(), PublishError> {
        tracing::info!(dir = %src_dir.display(), script, "building frontend");
        let output = Command::new(&self.program)
            .arg("run")
            .arg(script)
            .current_dir(src_dir)
            .output()
            .await
            .map_err(|e| PublishError::FrontendBuild(format!("cannot run {}: {e}", self.program)))?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(PublishError::FrontendBuild(format!(
            "`{} run {script}` exited with {}: {}",
            self.program,
            output.status,
            stderr.trim()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_frontend_error() {
        let dir = tempfile::tempdir().unwrap();
        let builder = NpmScriptBuilder::with_program("definitely-not-an-npm-binary");
        let err = builder.build(dir.path(), "build").await.unwrap_err();
        assert!(matches!(err, PublishError::FrontendBuild(_)));
    }
}

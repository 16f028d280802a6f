//! Upload ignore rules
//!
//! Patterns come from `.ipfsignore` and `.gitignore` in the configured
//! ignore-file directory. Each pattern follows gitignore's basic shape:
//! a leading or inner `/` anchors it to the release root, a trailing `/`
//! restricts it to directories, anything else matches at any depth.
//! Negation (`!`) is not supported.

use crate::store::UploadFile;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Ignore files read, in order
pub const IGNORE_FILE_NAMES: [&str; 2] = [".ipfsignore", ".gitignore"];

/// Compiled ignore patterns
#[derive(Debug, Clone)]
pub struct IgnorePatterns {
    set: GlobSet,
    patterns: Vec<String>,
}

impl Default for IgnorePatterns {
    fn default() -> Self {
        Self {
            set: GlobSet::empty(),
            patterns: Vec::new(),
        }
    }
}

impl IgnorePatterns {
    /// Read every ignore file present in `dir`
    ///
    /// # Errors
    /// Returns error if an ignore file exists but cannot be read, or holds
    /// an invalid pattern
    pub fn from_dir(dir: &Path) -> Result<Self, IgnoreError> {
        let mut patterns = Vec::new();
        for name in IGNORE_FILE_NAMES {
            let path = dir.join(name);
            if !path.is_file() {
                continue;
            }
            let text = std::fs::read_to_string(&path).map_err(|e| IgnoreError::io_error(&path, e))?;
            patterns.extend(
                text.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(str::to_string),
            );
        }
        tracing::debug!(dir = %dir.display(), count = patterns.len(), "loaded ignore patterns");
        Self::from_patterns(patterns)
    }

    /// Compile gitignore-style patterns
    ///
    /// # Errors
    /// Returns error on an invalid glob
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, IgnoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            for glob in expand(pattern) {
                let glob = Glob::new(&glob).map_err(|source| IgnoreError::Pattern {
                    pattern: pattern.clone(),
                    source,
                })?;
                builder.add(glob);
            }
        }
        let set = builder.build().map_err(|source| IgnoreError::Pattern {
            pattern: patterns.join(", "),
            source,
        })?;
        Ok(Self { set, patterns })
    }

    /// Source patterns, as written
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether a release-relative path (`/`-separated) is ignored
    #[must_use]
    pub fn is_ignored(&self, relative: &str) -> bool {
        self.set.is_match(relative)
    }

    /// Every non-ignored file under `dir`, sorted by relative path
    ///
    /// Ignored directories are not descended into.
    ///
    /// # Errors
    /// Returns error if the tree cannot be walked
    pub fn collect_files(&self, dir: &Path) -> Result<Vec<UploadFile>, IgnoreError> {
        let mut files = Vec::new();
        let walker = WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                relative_path(dir, entry.path()).map_or(true, |rel| !self.is_ignored(&rel))
            });

        for entry in walker {
            let entry = entry.map_err(|e| IgnoreError::Walk {
                path: dir.to_path_buf(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(path) = relative_path(dir, entry.path()) else {
                continue;
            };
            let size = entry
                .metadata()
                .map_err(|e| IgnoreError::Walk {
                    path: entry.path().to_path_buf(),
                    message: e.to_string(),
                })?
                .len();
            files.push(UploadFile {
                path,
                source: entry.path().to_path_buf(),
                size,
            });
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}

/// `/`-joined path of `path` below `root`; `None` for the root itself
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

fn expand(pattern: &str) -> Vec<String> {
    let dir_only = pattern.ends_with('/');
    let trimmed = pattern.trim_end_matches('/');
    let anchored = trimmed.starts_with('/') || trimmed.contains('/');
    let body = trimmed.trim_start_matches('/');
    let base = if anchored {
        body.to_string()
    } else {
        format!("**/{body}")
    };

    if dir_only {
        vec![format!("{base}/**")]
    } else {
        vec![base.clone(), format!("{base}/**")]
    }
}

/// Errors while reading ignore rules or walking the release
#[derive(Debug, thiserror::Error)]
pub enum IgnoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid ignore pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("cannot walk {path}: {message}")]
    Walk { path: PathBuf, message: String },
}

impl IgnoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn unanchored_patterns_match_at_any_depth() {
        let ignore = IgnorePatterns::from_patterns(["*.map", "node_modules"]).unwrap();
        assert!(ignore.is_ignored("app.js.map"));
        assert!(ignore.is_ignored("static/js/app.js.map"));
        assert!(ignore.is_ignored("node_modules"));
        assert!(ignore.is_ignored("sub/node_modules/x/index.js"));
        assert!(!ignore.is_ignored("index.html"));
    }

    #[test]
    fn anchored_and_directory_patterns() {
        let ignore = IgnorePatterns::from_patterns(["/build.log", "docs/drafts", "cache/"]).unwrap();
        assert!(ignore.is_ignored("build.log"));
        assert!(!ignore.is_ignored("nested/build.log"));
        assert!(ignore.is_ignored("docs/drafts/a.md"));
        assert!(!ignore.is_ignored("other/docs/drafts/a.md"));
        assert!(ignore.is_ignored("cache/x"));
        assert!(ignore.is_ignored("a/cache/x"));
    }

    #[test]
    fn from_dir_skips_comments_and_merges_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".ipfsignore"), "# comment\n\n*.map\n").unwrap();
        fs::write(dir.path().join(".gitignore"), "node_modules/\n").unwrap();
        let ignore = IgnorePatterns::from_dir(dir.path()).unwrap();
        assert_eq!(ignore.patterns(), ["*.map", "node_modules/"]);
    }

    #[test]
    fn missing_ignore_files_ignore_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ignore = IgnorePatterns::from_dir(dir.path()).unwrap();
        assert!(ignore.patterns().is_empty());
        assert!(!ignore.is_ignored("anything"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = IgnorePatterns::from_patterns(["a[b"]).unwrap_err();
        assert!(matches!(err, IgnoreError::Pattern { ref pattern, .. } if pattern == "a[b"));
    }

    #[test]
    fn collect_files_prunes_ignored_entries() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("js")).unwrap();
        fs::create_dir_all(root.join("node_modules/dep")).unwrap();
        fs::write(root.join("index.html"), "<html/>").unwrap();
        fs::write(root.join("js/app.js"), "x").unwrap();
        fs::write(root.join("js/app.js.map"), "m").unwrap();
        fs::write(root.join("node_modules/dep/index.js"), "d").unwrap();

        let ignore = IgnorePatterns::from_patterns(["*.map", "node_modules"]).unwrap();
        let files = ignore.collect_files(root).unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["index.html", "js/app.js"]);
        assert_eq!(files[0].source, root.join("index.html"));
        assert_eq!(files[0].size, 7);
    }
}

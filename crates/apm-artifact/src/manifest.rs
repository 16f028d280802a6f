//! The `manifest.json` document

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// An icon entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icon {
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<String>,
}

/// A screenshot entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screenshot {
    pub src: String,
}

/// Static descriptive metadata for an application release
///
/// Fields not modelled here are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub icons: Vec<Icon>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub screenshots: Vec<Screenshot>,
    /// Background script shipped with the frontend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// Entry page of the frontend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_url: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl Manifest {
    /// Files the manifest points at, as `(id, relative path)` pairs
    ///
    /// Icons and screenshots are frontend assets and only listed when
    /// `has_frontend` is set. A leading `/` means "relative to the
    /// published directory" and is stripped.
    #[must_use]
    pub fn referenced_files(&self, has_frontend: bool) -> Vec<(String, String)> {
        let mut files = Vec::new();

        if has_frontend {
            for (i, icon) in self.icons.iter().enumerate() {
                files.push((format!("icons[{i}]"), relative(&icon.src)));
            }
            for (i, shot) in self.screenshots.iter().enumerate() {
                files.push((format!("screenshots[{i}]"), relative(&shot.src)));
            }
        }
        if let Some(script) = &self.script {
            files.push(("script".to_string(), relative(script)));
        }
        if let Some(start_url) = &self.start_url {
            files.push(("start_url".to_string(), relative(start_url)));
        }

        files
    }
}

fn relative(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn manifest() -> Manifest {
        serde_json::from_value(serde_json::json!({
            "name": "Finance",
            "author": "Aragon Association",
            "icons": [{"src": "/meta/icon.svg", "sizes": "56x56"}],
            "screenshots": [{"src": "/meta/screenshot-1.png"}],
            "script": "/script.js",
            "start_url": "/index.html",
            "script_version": 2
        }))
        .unwrap()
    }

    #[test]
    fn referenced_files_with_frontend() {
        assert_eq!(
            manifest().referenced_files(true),
            vec![
                ("icons[0]".to_string(), "meta/icon.svg".to_string()),
                ("screenshots[0]".to_string(), "meta/screenshot-1.png".to_string()),
                ("script".to_string(), "script.js".to_string()),
                ("start_url".to_string(), "index.html".to_string()),
            ]
        );
    }

    #[test]
    fn referenced_files_without_frontend_skip_assets() {
        let ids: Vec<String> = manifest()
            .referenced_files(false)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["script", "start_url"]);
    }

    #[test]
    fn unknown_fields_are_preserved() {
        let value = serde_json::to_value(manifest()).unwrap();
        assert_eq!(value["script_version"], 2);
        assert_eq!(value["icons"][0]["sizes"], "56x56");
    }
}

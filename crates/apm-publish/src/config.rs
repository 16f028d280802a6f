//! Publish configuration
//!
//! [`PublishConfig`] is built once: defaults, overlaid by an optional
//! `apm-publish.toml`, with relative paths resolved against the project
//! root. Components receive it by reference and never mutate it.
//!
//! [`AppManifest`] models the project's `arapp.json`.

use crate::error::PublishError;
use apm_artifact::{Address, AppName, Dependency, RoleDeclaration};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Config file looked up in the project root
pub const CONFIG_FILE_NAME: &str = "apm-publish.toml";

/// App manifest looked up in the project root
pub const ARAPP_FILE_NAME: &str = "arapp.json";

pub const DEFAULT_IPFS_API_URL: &str = "http://localhost:5001/";
pub const DEFAULT_IPFS_GATEWAY: &str = "https://ipfs.io/";
pub const DEFAULT_PINATA_ENDPOINT: &str = "https://api.pinata.cloud/";

/// Complete publish configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub ipfs: IpfsConfig,
    pub app: AppConfig,
}

/// Content store endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpfsConfig {
    /// IPFS HTTP API
    pub url: Option<String>,
    /// Gateway used to resolve uploaded content
    pub gateway: Option<String>,
    /// Optional pinning service credentials
    pub pinata: Option<PinataConfig>,
}

impl Default for IpfsConfig {
    fn default() -> Self {
        Self {
            url: Some(DEFAULT_IPFS_API_URL.to_string()),
            gateway: Some(DEFAULT_IPFS_GATEWAY.to_string()),
            pinata: None,
        }
    }
}

/// Pinata credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinataConfig {
    pub key: String,
    pub secret: String,
    #[serde(default = "default_pinata_endpoint")]
    pub endpoint: String,
}

fn default_pinata_endpoint() -> String {
    DEFAULT_PINATA_ENDPOINT.to_string()
}

/// Frontend and release directory settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Frontend sources; a missing directory means "no frontend"
    pub src_path: PathBuf,
    /// Directory that is uploaded as the release
    pub build_output_path: PathBuf,
    /// `npm run <script>` used to build the frontend
    pub build_script: String,
    /// Directory holding `.ipfsignore` / `.gitignore`
    pub ignore_files_path: PathBuf,
    /// Blocks to wait after deployment
    pub confirmations: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            src_path: PathBuf::from("app/"),
            build_output_path: PathBuf::from("dist/"),
            build_script: "build".to_string(),
            ignore_files_path: PathBuf::from("."),
            confirmations: 1,
        }
    }
}

impl PublishConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `apm-publish.toml` from `root` (if present) over the defaults
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(root: &Path) -> Result<Self, PublishError> {
        let path = root.join(CONFIG_FILE_NAME);
        let config = if path.is_file() {
            let text = std::fs::read_to_string(&path).map_err(|e| {
                PublishError::configuration(format!("cannot read {}: {e}", path.display()))
            })?;
            Self::from_toml(&text)?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };
        Ok(config.resolve_paths(root))
    }

    /// Parse a TOML document over the defaults
    ///
    /// # Errors
    /// Returns error on malformed TOML or wrongly typed fields
    pub fn from_toml(text: &str) -> Result<Self, PublishError> {
        toml::from_str(text).map_err(|e| PublishError::configuration(format!("invalid config: {e}")))
    }

    /// Make every relative path absolute under `root`
    #[must_use]
    pub fn resolve_paths(mut self, root: &Path) -> Self {
        let app = &mut self.app;
        for path in [
            &mut app.src_path,
            &mut app.build_output_path,
            &mut app.ignore_files_path,
        ] {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
        self
    }

    /// With IPFS API url
    #[inline]
    #[must_use]
    pub fn with_ipfs_url(mut self, url: impl Into<String>) -> Self {
        self.ipfs.url = Some(url.into());
        self
    }

    /// With IPFS gateway
    #[inline]
    #[must_use]
    pub fn with_gateway(mut self, gateway: impl Into<String>) -> Self {
        self.ipfs.gateway = Some(gateway.into());
        self
    }

    /// With pinning credentials
    #[inline]
    #[must_use]
    pub fn with_pinata(mut self, pinata: PinataConfig) -> Self {
        self.ipfs.pinata = Some(pinata);
        self
    }

    /// With release directory
    #[inline]
    #[must_use]
    pub fn with_build_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.app.build_output_path = path.into();
        self
    }

    /// With frontend source directory
    #[inline]
    #[must_use]
    pub fn with_src_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.app.src_path = path.into();
        self
    }

    /// With ignore-file directory
    #[inline]
    #[must_use]
    pub fn with_ignore_files_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.app.ignore_files_path = path.into();
        self
    }
}

/// Per-network deployment environment in `arapp.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    #[serde(default)]
    pub network: Option<String>,
    /// ENS registry address for this network
    #[serde(default)]
    pub registry: Option<Address>,
    #[serde(default)]
    pub app_name: Option<String>,
}

/// The project's `arapp.json`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppManifest {
    #[serde(default)]
    pub roles: Vec<RoleDeclaration>,
    #[serde(default)]
    pub environments: BTreeMap<String, Environment>,
    /// Path of the main contract source (`contracts/Finance.sol`)
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub app_name: Option<String>,
}

impl AppManifest {
    /// Read `arapp.json` from `root`
    ///
    /// # Errors
    /// Returns error if the file is missing or malformed
    pub fn load(root: &Path) -> Result<Self, PublishError> {
        let path = root.join(ARAPP_FILE_NAME);
        let text = std::fs::read_to_string(&path).map_err(|e| {
            PublishError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            PublishError::configuration(format!("invalid {}: {e}", path.display()))
        })
    }

    fn environment(&self, network: &str) -> Option<&Environment> {
        self.environments
            .get(network)
            .or_else(|| self.environments.values().find(|e| e.network.as_deref() == Some(network)))
            .or_else(|| self.environments.get("default"))
    }

    /// Fully-qualified app name for `network`
    ///
    /// The network's environment wins over the top-level `appName`.
    ///
    /// # Errors
    /// Returns error if no name is configured or the name is malformed
    pub fn app_name_for(&self, network: &str) -> Result<AppName, PublishError> {
        let name = self
            .environment(network)
            .and_then(|e| e.app_name.as_deref())
            .or(self.app_name.as_deref())
            .ok_or_else(|| {
                PublishError::configuration(format!("no appName configured for network '{network}'"))
            })?;
        Ok(AppName::parse(name)?)
    }

    /// ENS registry address for `network`, if configured
    #[must_use]
    pub fn ens_registry_for(&self, network: &str) -> Option<Address> {
        self.environment(network).and_then(|e| e.registry)
    }

    /// Main contract name: file stem of `path`
    ///
    /// # Errors
    /// Returns error if `path` is empty
    pub fn main_contract_name(&self) -> Result<String, PublishError> {
        Path::new(&self.path)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| PublishError::configuration("arapp.json has no contract path"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = PublishConfig::default();
        assert_eq!(config.ipfs.url.as_deref(), Some("http://localhost:5001/"));
        assert_eq!(config.ipfs.gateway.as_deref(), Some("https://ipfs.io/"));
        assert_eq!(config.app.build_script, "build");
        assert_eq!(config.app.confirmations, 1);
        assert!(config.ipfs.pinata.is_none());
    }

    #[test]
    fn toml_overlays_defaults() {
        let config = PublishConfig::from_toml(
            r#"
            [ipfs]
            gateway = "https://gateway.pinata.cloud/"
            [ipfs.pinata]
            key = "k"
            secret = "s"
            [app]
            build_output_path = "public"
            "#,
        )
        .unwrap();
        assert_eq!(config.ipfs.url.as_deref(), Some(DEFAULT_IPFS_API_URL));
        assert_eq!(config.ipfs.gateway.as_deref(), Some("https://gateway.pinata.cloud/"));
        assert_eq!(config.ipfs.pinata.unwrap().endpoint, DEFAULT_PINATA_ENDPOINT);
        assert_eq!(config.app.build_output_path, PathBuf::from("public"));
        assert_eq!(config.app.src_path, PathBuf::from("app/"));
    }

    #[test]
    fn malformed_toml_is_configuration_error() {
        let err = PublishConfig::from_toml("[app]\nconfirmations = \"many\"").unwrap_err();
        assert!(matches!(err, PublishError::Configuration(_)));
    }

    #[test]
    fn load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[app]\nsrc_path = \"frontend\"\n").unwrap();
        let config = PublishConfig::load(dir.path()).unwrap();
        assert_eq!(config.app.src_path, dir.path().join("frontend"));
        assert_eq!(config.app.build_output_path, dir.path().join("dist/"));
    }

    fn arapp() -> AppManifest {
        serde_json::from_value(serde_json::json!({
            "roles": [{"id": "INCREMENT_ROLE", "name": "Increment", "params": []}],
            "environments": {
                "default": {"network": "rpc", "appName": "counter.aragonpm.eth"},
                "rinkeby": {
                    "network": "rinkeby",
                    "registry": "0x98df287b6c145399aaa709692c8d308357bc085d",
                    "appName": "counter.open.aragonpm.eth"
                }
            },
            "path": "contracts/Counter.sol"
        }))
        .unwrap()
    }

    #[test]
    fn app_name_prefers_network_environment() {
        let arapp = arapp();
        assert_eq!(arapp.app_name_for("rinkeby").unwrap().as_str(), "counter.open.aragonpm.eth");
        assert_eq!(arapp.app_name_for("mainnet").unwrap().as_str(), "counter.aragonpm.eth");
        assert!(arapp.ens_registry_for("rinkeby").is_some());
        assert!(arapp.ens_registry_for("rpc").is_none());
        assert_eq!(arapp.main_contract_name().unwrap(), "Counter");
    }

    #[test]
    fn missing_app_name_is_configuration_error() {
        let err = AppManifest::default().app_name_for("rinkeby").unwrap_err();
        assert!(matches!(err, PublishError::Configuration(_)));
    }
}

//! Project fixtures: a small Finance app with roles, ABI and release files

use apm_artifact::{AbiFragment, AbiParam, AppName, RoleDeclaration};
use apm_publish::PublishConfig;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const APP_NAME: &str = "finance.aragonpm.eth";
pub const CONTRACT_NAME: &str = "Finance";
pub const NETWORK: &str = "rinkeby";

pub const FINANCE_SOURCE: &str = r"
pragma solidity ^0.8.0;

contract AragonApp {
    function transferToVault(address _token) external {}
}

contract Finance is AragonApp {
    bytes32 public constant CREATE_PAYMENTS_ROLE = keccak256('CREATE_PAYMENTS_ROLE');
    bytes32 public constant CHANGE_PERIOD_ROLE = keccak256('CHANGE_PERIOD_ROLE');

    uint64 public periodDuration;

    /// @notice Create a new payment of `_amount` to `_receiver`
    function newPayment(address _token, address _receiver, uint256 _amount)
        external
        authP(CREATE_PAYMENTS_ROLE, arr(_token, _receiver, _amount))
    {}

    /// @notice Change period duration to `_duration`
    function setPeriodDuration(uint64 _duration) external auth(CHANGE_PERIOD_ROLE) {
        periodDuration = _duration;
    }

    function period() external view returns (uint64) {
        return periodDuration;
    }
}
";

/// Finance plus a function guarded by an undeclared `ADMIN_ROLE`
#[must_use]
pub fn finance_source_with_admin() -> String {
    FINANCE_SOURCE.replacen(
        "    function period()",
        "    function sweep() external auth(ADMIN_ROLE) {}\n\n    function period()",
        1,
    )
}

#[must_use]
pub fn app_name() -> AppName {
    AppName::parse(APP_NAME).expect("fixture app name is valid")
}

#[must_use]
pub fn finance_roles() -> Vec<RoleDeclaration> {
    vec![
        RoleDeclaration::new(
            "CREATE_PAYMENTS_ROLE",
            "Create new payments",
            vec!["Token address".into(), "Receiver address".into(), "Token amount".into()],
        ),
        RoleDeclaration::new("CHANGE_PERIOD_ROLE", "Change period duration", Vec::new()),
    ]
}

#[must_use]
pub fn finance_abi() -> Vec<AbiFragment> {
    vec![
        AbiFragment::function(
            "newPayment",
            vec![
                AbiParam::new("_token", "address"),
                AbiParam::new("_receiver", "address"),
                AbiParam::new("_amount", "uint256"),
            ],
            "nonpayable",
        ),
        AbiFragment::function(
            "setPeriodDuration",
            vec![AbiParam::new("_duration", "uint64")],
            "nonpayable",
        ),
        AbiFragment::function("period", Vec::new(), "view"),
    ]
}

/// `manifest.json` referencing three release files
#[must_use]
pub fn manifest_json() -> serde_json::Value {
    json!({
        "name": "Finance",
        "author": "Aragon Association",
        "icons": [{"src": "/meta/icon.svg", "sizes": "192x192"}],
        "script": "/script.js",
        "start_url": "/index.html"
    })
}

#[must_use]
pub fn arapp_json(roles: &[RoleDeclaration]) -> serde_json::Value {
    json!({
        "roles": roles,
        "environments": {
            "default": {"network": "rpc", "appName": APP_NAME},
            NETWORK: {"network": NETWORK, "appName": APP_NAME}
        },
        "path": "contracts/Finance.sol"
    })
}

/// The three files `manifest_json` references
pub const RELEASE_FILES: [&str; 3] = ["meta/icon.svg", "script.js", "index.html"];

/// A project directory on disk
///
/// Layout: `arapp.json`, `manifest.json`, an `app/` frontend directory and
/// a `dist/` release directory holding [`RELEASE_FILES`].
#[derive(Debug)]
pub struct ProjectFixture {
    dir: TempDir,
}

impl ProjectFixture {
    /// Project declaring [`finance_roles`]
    #[must_use]
    pub fn new() -> Self {
        Self::with_roles(&finance_roles())
    }

    #[must_use]
    pub fn with_roles(roles: &[RoleDeclaration]) -> Self {
        let dir = tempfile::tempdir().expect("create temp project");
        let root = dir.path();
        write_json(&root.join("arapp.json"), &arapp_json(roles));
        write_json(&root.join("manifest.json"), &manifest_json());
        fs::create_dir_all(root.join("app")).expect("create app dir");

        let dist = root.join("dist");
        for file in RELEASE_FILES {
            let path = dist.join(file);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create dist dir");
            }
            fs::write(&path, format!("fixture {file}")).expect("write dist file");
        }
        fs::write(root.join(".ipfsignore"), "*.map\n").expect("write ignore file");
        fs::write(dist.join("index.js.map"), "ignored").expect("write ignored file");

        Self { dir }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    #[must_use]
    pub fn dist(&self) -> PathBuf {
        self.root().join("dist")
    }

    /// Remove one of the release files
    pub fn remove_release_file(&self, file: &str) {
        fs::remove_file(self.dist().join(file)).expect("remove release file");
    }

    /// Default configuration with paths resolved against the project
    #[must_use]
    pub fn config(&self) -> PublishConfig {
        PublishConfig::default().resolve_paths(self.root())
    }
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn write_json(path: &Path, value: &serde_json::Value) {
    let text = serde_json::to_string_pretty(value).expect("serialize fixture");
    fs::write(path, text).expect("write fixture");
}

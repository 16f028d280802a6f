//! Contract sources, deployment and the contract address decision

use crate::error::TransportError;
use apm_artifact::{AbiFragment, Address, ArtifactError, Digest32};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

/// Compiled ABI and flattened source of a contract
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContractSource: Send + Sync {
    async fn abi(&self, contract: &str) -> Result<Vec<AbiFragment>, ArtifactError>;

    async fn flattened_source(&self, contract: &str) -> Result<String, ArtifactError>;
}

/// Deploys a contract and waits for `confirmations` blocks
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContractDeployer: Send + Sync {
    async fn deploy(&self, contract: &str, confirmations: u32) -> Result<Address, TransportError>;
}

/// Publishes contract source to a block explorer
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContractVerifier: Send + Sync {
    async fn verify(&self, address: Address, contract: &str) -> Result<(), TransportError>;
}

/// Contract source backed by files on disk
///
/// The ABI file may hold either a bare ABI array or a compiler output object
/// with an `abi` field.
#[derive(Debug, Clone)]
pub struct FileContractSource {
    abi_path: PathBuf,
    flat_code_path: PathBuf,
}

impl FileContractSource {
    #[must_use]
    pub fn new(abi_path: impl Into<PathBuf>, flat_code_path: impl Into<PathBuf>) -> Self {
        Self {
            abi_path: abi_path.into(),
            flat_code_path: flat_code_path.into(),
        }
    }
}

fn read_text(path: &Path) -> Result<String, ArtifactError> {
    std::fs::read_to_string(path).map_err(|e| ArtifactError::io_error(path, e))
}

/// Parse an ABI document, unwrapping a compiler output object if needed
///
/// # Errors
/// Returns error if the document is not JSON or not an ABI
pub fn abi_from_json(path: &Path, text: &str) -> Result<Vec<AbiFragment>, ArtifactError> {
    let mut value: JsonValue =
        serde_json::from_str(text).map_err(|e| ArtifactError::json_error(path, e))?;
    if let Some(abi) = value.get_mut("abi") {
        value = abi.take();
    }
    serde_json::from_value(value).map_err(|e| ArtifactError::json_error(path, e))
}

#[async_trait]
impl ContractSource for FileContractSource {
    async fn abi(&self, _contract: &str) -> Result<Vec<AbiFragment>, ArtifactError> {
        let text = read_text(&self.abi_path)?;
        abi_from_json(&self.abi_path, &text)
    }

    async fn flattened_source(&self, _contract: &str) -> Result<String, ArtifactError> {
        read_text(&self.flat_code_path)
    }
}

/// Where the published version's contract comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractPlan {
    /// Content-only release, zero address
    ContentOnly,
    /// Caller-supplied address
    Explicit(Address),
    /// Fresh deployment
    Deploy,
    /// Previous version's contract
    Reuse(Address),
}

impl ContractPlan {
    /// Decide in priority order: content-only, explicit, deploy, reuse
    ///
    /// Deployment is forced when there is no previous contract to reuse.
    #[must_use]
    pub fn decide(
        only_content: bool,
        explicit: Option<Address>,
        requires_deployment: bool,
        previous: Option<Address>,
    ) -> Self {
        if only_content {
            return Self::ContentOnly;
        }
        if let Some(address) = explicit {
            return Self::Explicit(address);
        }
        match previous {
            Some(address) if !requires_deployment => Self::Reuse(address),
            _ => Self::Deploy,
        }
    }
}

/// Address a CREATE from `sender` with `nonce` will produce
///
/// `keccak256(rlp([sender, nonce]))[12..]`
#[must_use]
pub fn predict_contract_address(sender: Address, nonce: u64) -> Address {
    let mut payload = Vec::with_capacity(30);
    payload.push(0x80 + 20);
    payload.extend_from_slice(sender.as_bytes());
    rlp_uint(nonce, &mut payload);

    let mut encoded = Vec::with_capacity(payload.len() + 1);
    // payload is at most 30 bytes, always a short list
    encoded.push(0xc0 + payload.len() as u8);
    encoded.extend(payload);

    let digest = Digest32::keccak(&encoded);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest.as_bytes()[12..]);
    Address::new(bytes)
}

fn rlp_uint(value: u64, out: &mut Vec<u8>) {
    match value {
        0 => out.push(0x80),
        1..=0x7f => out.push(value as u8),
        _ => {
            let be = value.to_be_bytes();
            let skip = be.iter().take_while(|b| **b == 0).count();
            out.push(0x80 + (8 - skip) as u8);
            out.extend_from_slice(&be[skip..]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apm_artifact::FragmentKind;

    fn sender() -> Address {
        "0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0".parse().unwrap()
    }

    #[test]
    fn predicts_create_addresses() {
        assert_eq!(
            predict_contract_address(sender(), 0).to_string(),
            "0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"
        );
        assert_eq!(
            predict_contract_address(sender(), 1).to_string(),
            "0x343c43a37d37dff08ae8c4a11544c718abb4fcf8"
        );
    }

    #[test]
    fn rlp_integer_forms() {
        let enc = |v| {
            let mut out = Vec::new();
            rlp_uint(v, &mut out);
            out
        };
        assert_eq!(enc(0), vec![0x80]);
        assert_eq!(enc(0x7f), vec![0x7f]);
        assert_eq!(enc(0x80), vec![0x81, 0x80]);
        assert_eq!(enc(0x0400), vec![0x82, 0x04, 0x00]);
    }

    #[test]
    fn plan_priority() {
        let prev = Some(Address::new([1; 20]));
        let explicit = Some(Address::new([2; 20]));
        assert_eq!(ContractPlan::decide(true, explicit, true, prev), ContractPlan::ContentOnly);
        assert_eq!(
            ContractPlan::decide(false, explicit, true, prev),
            ContractPlan::Explicit(Address::new([2; 20]))
        );
        assert_eq!(ContractPlan::decide(false, None, true, prev), ContractPlan::Deploy);
        assert_eq!(
            ContractPlan::decide(false, None, false, prev),
            ContractPlan::Reuse(Address::new([1; 20]))
        );
        assert_eq!(ContractPlan::decide(false, None, false, None), ContractPlan::Deploy);
    }

    #[test]
    fn abi_accepts_array_or_compiler_output() {
        let path = Path::new("Counter.json");
        let array = r#"[{"type":"function","name":"increment","inputs":[],"stateMutability":"nonpayable"}]"#;
        let wrapped = format!(r#"{{"contractName":"Counter","abi":{array}}}"#);
        let a = abi_from_json(path, array).unwrap();
        let b = abi_from_json(path, &wrapped).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].kind, FragmentKind::Function);
        assert_eq!(a[0].signature(), "increment()");
        assert!(abi_from_json(path, r#"{"abi": 3}"#).is_err());
    }

    #[tokio::test]
    async fn file_source_reads_both_documents() {
        let dir = tempfile::tempdir().unwrap();
        let abi_path = dir.path().join("abi.json");
        let code_path = dir.path().join("code.sol");
        std::fs::write(&abi_path, "[]").unwrap();
        std::fs::write(&code_path, "contract Counter {}").unwrap();

        let source = FileContractSource::new(&abi_path, &code_path);
        assert!(source.abi("Counter").await.unwrap().is_empty());
        assert_eq!(source.flattened_source("Counter").await.unwrap(), "contract Counter {}");

        let missing = FileContractSource::new(dir.path().join("nope.json"), &code_path);
        assert!(matches!(missing.abi("Counter").await, Err(ArtifactError::Io { .. })));
    }
}

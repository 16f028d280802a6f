//! In-memory fakes of every publish collaborator

use apm_artifact::{AbiFragment, Address, ArtifactError, Digest32};
use apm_publish::{
    ChainReader, ChainWriter, ContentFetcher, ContentTransport, ContractDeployer, ContractSource,
    ContractVerifier, FrontendBuilder, PinningService, PublishError, PublishTransaction,
    TransportError, UploadFile, VersionRecord,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

fn locked<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Registry state plus a record of sent transactions
#[derive(Debug, Default)]
pub struct FakeChain {
    names: HashMap<String, Address>,
    versions: HashMap<Address, VersionRecord>,
    permissions: HashSet<(Address, Address, Digest32)>,
    nonces: HashMap<Address, u64>,
    chain_id: u64,
    sent: Mutex<Vec<PublishTransaction>>,
}

impl FakeChain {
    #[must_use]
    pub fn new() -> Self {
        Self {
            chain_id: 4,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: &str, address: Address) -> Self {
        self.names.insert(name.to_string(), address);
        self
    }

    #[must_use]
    pub fn with_latest_version(mut self, repo: Address, record: VersionRecord) -> Self {
        self.versions.insert(repo, record);
        self
    }

    #[must_use]
    pub fn grant(mut self, target: Address, who: Address, role: Digest32) -> Self {
        self.permissions.insert((target, who, role));
        self
    }

    #[must_use]
    pub fn with_nonce(mut self, address: Address, nonce: u64) -> Self {
        self.nonces.insert(address, nonce);
        self
    }

    /// Transactions passed to `send`, in order
    #[must_use]
    pub fn sent(&self) -> Vec<PublishTransaction> {
        locked(&self.sent).clone()
    }
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn resolve_name(&self, name: &str) -> Result<Option<Address>, TransportError> {
        Ok(self.names.get(name).copied())
    }

    async fn latest_version(&self, repo: Address) -> Result<Option<VersionRecord>, TransportError> {
        Ok(self.versions.get(&repo).cloned())
    }

    async fn can_perform(
        &self,
        target: Address,
        who: Address,
        role: Digest32,
    ) -> Result<bool, TransportError> {
        Ok(self.permissions.contains(&(target, who, role)))
    }

    async fn chain_id(&self) -> Result<u64, TransportError> {
        Ok(self.chain_id)
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, TransportError> {
        Ok(self.nonces.get(&address).copied().unwrap_or_default())
    }
}

#[async_trait]
impl ChainWriter for FakeChain {
    async fn send(&self, transaction: &PublishTransaction) -> Result<Digest32, TransportError> {
        let mut sent = locked(&self.sent);
        sent.push(transaction.clone());
        Ok(Digest32::keccak(&transaction.data))
    }
}

/// Content store keeping uploads in memory, served back as a gateway
///
/// Directory hashes are derived from the uploaded paths and contents, so
/// identical uploads get identical hashes.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    unavailable: bool,
    directories: Mutex<BTreeMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl MemoryContentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose version probe fails
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Paths uploaded under `cid`, sorted
    #[must_use]
    pub fn uploaded_paths(&self, cid: &str) -> Vec<String> {
        locked(&self.directories)
            .get(cid)
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn upload_count(&self) -> usize {
        locked(&self.directories).len()
    }
}

#[async_trait]
impl ContentTransport for MemoryContentStore {
    async fn version(&self) -> Result<String, TransportError> {
        if self.unavailable {
            return Err(TransportError::request(
                "memory://api/v0/version",
                "connection refused",
            ));
        }
        Ok("0.0.0-memory".to_string())
    }

    async fn add(&self, uploads: Vec<UploadFile>) -> Result<String, TransportError> {
        let mut files = BTreeMap::new();
        for file in uploads {
            let contents = std::fs::read(&file.source)
                .map_err(|e| TransportError::io_error(&file.source, e))?;
            files.insert(file.path, contents);
        }
        let mut preimage = Vec::new();
        for (path, contents) in &files {
            preimage.extend_from_slice(path.as_bytes());
            preimage.push(0);
            preimage.extend_from_slice(contents);
        }
        let digest = Digest32::keccak(&preimage);
        let cid = format!("Qm{}", &digest.to_string()[2..46]);
        locked(&self.directories).insert(cid.clone(), files);
        Ok(cid)
    }
}

#[async_trait]
impl ContentFetcher for MemoryContentStore {
    async fn fetch_text(&self, url: &str) -> Result<String, TransportError> {
        let not_found = || TransportError::Status {
            url: url.to_string(),
            status: 404,
        };
        let (_, rest) = url.split_once("/ipfs/").ok_or_else(not_found)?;
        let (cid, path) = rest.split_once('/').ok_or_else(not_found)?;
        let directories = locked(&self.directories);
        let contents = directories
            .get(cid)
            .and_then(|files| files.get(path))
            .ok_or_else(not_found)?;
        String::from_utf8(contents.clone())
            .map_err(|e| TransportError::invalid_response(url, e.to_string()))
    }
}

/// ABI and source held in memory
#[derive(Debug, Clone)]
pub struct StaticContractSource {
    pub abi: Vec<AbiFragment>,
    pub flat_code: String,
}

impl StaticContractSource {
    #[must_use]
    pub fn new(abi: Vec<AbiFragment>, flat_code: impl Into<String>) -> Self {
        Self {
            abi,
            flat_code: flat_code.into(),
        }
    }
}

#[async_trait]
impl ContractSource for StaticContractSource {
    async fn abi(&self, _contract: &str) -> Result<Vec<AbiFragment>, ArtifactError> {
        Ok(self.abi.clone())
    }

    async fn flattened_source(&self, _contract: &str) -> Result<String, ArtifactError> {
        Ok(self.flat_code.clone())
    }
}

/// Deployer returning a fixed address
#[derive(Debug)]
pub struct FakeDeployer {
    address: Address,
    deployed: Mutex<Vec<(String, u32)>>,
}

impl FakeDeployer {
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self {
            address,
            deployed: Mutex::new(Vec::new()),
        }
    }

    /// `(contract, confirmations)` of every deployment
    #[must_use]
    pub fn deployments(&self) -> Vec<(String, u32)> {
        locked(&self.deployed).clone()
    }
}

#[async_trait]
impl ContractDeployer for FakeDeployer {
    async fn deploy(&self, contract: &str, confirmations: u32) -> Result<Address, TransportError> {
        locked(&self.deployed).push((contract.to_string(), confirmations));
        Ok(self.address)
    }
}

/// Verifier that always fails
#[derive(Debug, Default)]
pub struct FailingVerifier;

#[async_trait]
impl ContractVerifier for FailingVerifier {
    async fn verify(&self, address: Address, _contract: &str) -> Result<(), TransportError> {
        Err(TransportError::request(
            format!("https://api.etherscan.io/verify/{address}"),
            "explorer unavailable",
        ))
    }
}

/// Pinning service that records pins or fails every request
#[derive(Debug, Default)]
pub struct FakePinning {
    fail: bool,
    pins: Mutex<Vec<(String, String)>>,
}

impl FakePinning {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `(cid, label)` of every successful pin
    #[must_use]
    pub fn pins(&self) -> Vec<(String, String)> {
        locked(&self.pins).clone()
    }
}

#[async_trait]
impl PinningService for FakePinning {
    async fn pin(&self, cid: &str, label: &str) -> Result<(), TransportError> {
        if self.fail {
            return Err(TransportError::Status {
                url: "https://api.pinata.cloud/pinning/pinByHash".to_string(),
                status: 401,
            });
        }
        locked(&self.pins).push((cid.to_string(), label.to_string()));
        Ok(())
    }
}

/// Frontend builder that only records its invocations
#[derive(Debug, Default)]
pub struct RecordingFrontend {
    builds: Mutex<Vec<(PathBuf, String)>>,
}

impl RecordingFrontend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn builds(&self) -> Vec<(PathBuf, String)> {
        locked(&self.builds).clone()
    }
}

#[async_trait]
impl FrontendBuilder for RecordingFrontend {
    async fn build(&self, src_dir: &Path, script: &str) -> Result<(), PublishError> {
        locked(&self.builds).push((src_dir.to_path_buf(), script.to_string()));
        Ok(())
    }
}

//! The publish pipeline
//!
//! [`Publisher::publish`] runs one release end to end. Pre-flight checks
//! (configuration, version, permission, store availability) all pass before
//! anything is built, deployed or uploaded. Validation failures abort before
//! upload. Verification follows a deployment; the upload check and pinning
//! follow the upload. None of them can fail the release.

use crate::builder::ArtifactBuilder;
use crate::chain::{ChainReader, ChainWriter};
use crate::config::{AppManifest, PublishConfig};
use crate::content_uri::ContentUri;
use crate::deploy::{predict_contract_address, ContractDeployer, ContractPlan, ContractSource, ContractVerifier};
use crate::encoder::{explorer_tx_url, PublishEncoder, PublishTransaction, VersionInfo};
use crate::error::PublishError;
use crate::frontend::{FrontendBuilder, NpmScriptBuilder};
use crate::ignore::IgnorePatterns;
use crate::pinning::{pin_label, PinningService};
use crate::store::{ContentAddressStore, ContentFetcher, ContentTransport};
use crate::validator::ArtifactValidator;
use crate::version::{Bump, VersionResolver};
use apm_artifact::{Address, AppName, ArtifactError, Digest32, Manifest, RepoContent, SemanticVersion, MANIFEST_NAME};
use apm_introspect::{ContractIntrospector, SolidityIntrospector};
use std::fmt::{self, Display, Formatter};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One publish invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    /// `major`, `minor`, `patch` or an explicit `x.y.z`
    pub bump: String,
    /// Network name used to pick the `arapp.json` environment
    pub network: String,
    /// Account that sends the transaction and manages a new repo
    pub sender: Address,
    /// Use this contract instead of deploying or reusing
    pub contract_address: Option<Address>,
    /// Publish frontend content only, with the zero contract address
    pub only_content: bool,
    pub skip_app_build: bool,
    pub skip_validation: bool,
    /// Fetch the uploaded release back through the gateway
    pub validate_upload: bool,
    /// Verify a freshly deployed contract on a block explorer
    pub verify: bool,
    /// Encode but do not deploy or send
    pub dry_run: bool,
}

impl PublishRequest {
    #[must_use]
    pub fn new(bump: impl Into<String>, network: impl Into<String>, sender: Address) -> Self {
        Self {
            bump: bump.into(),
            network: network.into(),
            sender,
            contract_address: None,
            only_content: false,
            skip_app_build: false,
            skip_validation: false,
            validate_upload: false,
            verify: false,
            dry_run: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_contract_address(mut self, address: Address) -> Self {
        self.contract_address = Some(address);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_only_content(mut self, only_content: bool) -> Self {
        self.only_content = only_content;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_skip_app_build(mut self, skip: bool) -> Self {
        self.skip_app_build = skip;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_skip_validation(mut self, skip: bool) -> Self {
        self.skip_validation = skip;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_validate_upload(mut self, validate: bool) -> Self {
        self.validate_upload = validate;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// A best-effort action run after upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SideEffect {
    Verify,
    UploadCheck,
    Pin,
}

impl Display for SideEffect {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Verify => "contract verification",
            Self::UploadCheck => "upload check",
            Self::Pin => "pinning",
        })
    }
}

/// What happened to a best-effort action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideEffectOutcome {
    pub action: SideEffect,
    /// Failure message; `None` on success
    pub error: Option<String>,
}

impl SideEffectOutcome {
    #[inline]
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Run `action`, log its outcome, never fail
pub async fn best_effort<F, E>(action: SideEffect, future: F) -> SideEffectOutcome
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match future.await {
        Ok(()) => {
            info!(%action, "completed");
            SideEffectOutcome { action, error: None }
        }
        Err(err) => {
            warn!(%action, error = %err, "failed, continuing");
            SideEffectOutcome {
                action,
                error: Some(err.to_string()),
            }
        }
    }
}

/// Result of a publish run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub transaction: PublishTransaction,
    pub next_version: SemanticVersion,
    pub bump: Bump,
    pub contract_address: Address,
    pub content_hash: String,
    /// Hash of the sent transaction; `None` for dry runs
    pub tx_hash: Option<Digest32>,
    pub side_effects: Vec<SideEffectOutcome>,
}

/// Required collaborators of a [`Publisher`]
#[derive(Clone)]
pub struct Collaborators {
    pub chain: Arc<dyn ChainReader>,
    pub writer: Arc<dyn ChainWriter>,
    pub transport: Arc<dyn ContentTransport>,
    pub fetcher: Arc<dyn ContentFetcher>,
    pub contracts: Arc<dyn ContractSource>,
}

/// Publishes application versions
#[derive(Clone)]
pub struct Publisher {
    config: PublishConfig,
    root: PathBuf,
    chain: Arc<dyn ChainReader>,
    writer: Arc<dyn ChainWriter>,
    contracts: Arc<dyn ContractSource>,
    store: ContentAddressStore,
    encoder: PublishEncoder,
    introspector: Arc<dyn ContractIntrospector>,
    frontend: Arc<dyn FrontendBuilder>,
    deployer: Option<Arc<dyn ContractDeployer>>,
    verifier: Option<Arc<dyn ContractVerifier>>,
    pinning: Option<Arc<dyn PinningService>>,
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("config", &self.config)
            .field("root", &self.root)
            .field("deployer", &self.deployer.is_some())
            .field("verifier", &self.verifier.is_some())
            .field("pinning", &self.pinning.is_some())
            .finish_non_exhaustive()
    }
}

impl Publisher {
    /// Publisher for the project at `root`
    ///
    /// `config` paths should already be resolved against `root`.
    #[must_use]
    pub fn new(config: PublishConfig, root: impl Into<PathBuf>, collaborators: Collaborators) -> Self {
        let Collaborators {
            chain,
            writer,
            transport,
            fetcher,
            contracts,
        } = collaborators;
        Self {
            config,
            root: root.into(),
            encoder: PublishEncoder::new(chain.clone()),
            store: ContentAddressStore::new(transport, fetcher),
            chain,
            writer,
            contracts,
            introspector: Arc::new(SolidityIntrospector::default()),
            frontend: Arc::new(NpmScriptBuilder::default()),
            deployer: None,
            verifier: None,
            pinning: None,
        }
    }

    /// With contract introspector
    #[must_use]
    pub fn with_introspector(mut self, introspector: Arc<dyn ContractIntrospector>) -> Self {
        self.introspector = introspector;
        self
    }

    /// With frontend builder
    #[must_use]
    pub fn with_frontend_builder(mut self, frontend: Arc<dyn FrontendBuilder>) -> Self {
        self.frontend = frontend;
        self
    }

    /// With contract deployer
    #[must_use]
    pub fn with_deployer(mut self, deployer: Arc<dyn ContractDeployer>) -> Self {
        self.deployer = Some(deployer);
        self
    }

    /// With contract verifier
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn ContractVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// With pinning service
    #[must_use]
    pub fn with_pinning(mut self, pinning: Arc<dyn PinningService>) -> Self {
        self.pinning = Some(pinning);
        self
    }

    /// Publish one version
    ///
    /// # Errors
    /// Returns the first fatal failure; see [`PublishError`]
    pub async fn publish(&self, request: &PublishRequest) -> Result<PublishOutcome, PublishError> {
        if request.verify && self.verifier.is_none() {
            return Err(PublishError::configuration(
                "contract verification requested but no verifier is configured",
            ));
        }

        let arapp = AppManifest::load(&self.root)?;
        let app = arapp.app_name_for(&request.network)?;
        let contract_name = arapp.main_contract_name()?;
        if let Some(registry) = arapp.ens_registry_for(&request.network) {
            debug!(network = %request.network, %registry, "using ENS registry from arapp.json");
        }

        let previous = match self.chain.resolve_name(app.as_str()).await? {
            Some(repo) => self.chain.latest_version(repo).await?,
            None => None,
        };
        let previous_version = previous.as_ref().map(|p| p.version);
        let resolution = VersionResolver.resolve(&request.bump, previous_version)?;
        info!(
            app = %app,
            previous = ?previous_version.map(|v| v.to_string()),
            next = %resolution.next_version,
            bump = %resolution.bump,
            "resolved version"
        );

        let plan = ContractPlan::decide(
            request.only_content,
            request.contract_address,
            resolution.requires_deployment(previous_version),
            previous.as_ref().map(|p| p.contract_address),
        );
        if plan == ContractPlan::Deploy && !request.dry_run && self.deployer.is_none() {
            return Err(PublishError::configuration(format!(
                "{app}@{} needs a new contract but no deployer is configured",
                resolution.next_version
            )));
        }

        self.encoder.assert_can_publish(&app, request.sender).await?;
        self.store.ensure_available().await?;

        let mut side_effects = Vec::new();
        let contract_address = self
            .contract_address(plan, &contract_name, request, &mut side_effects)
            .await?;
        info!(contract = %contract_address, plan = ?plan, "contract address decided");

        let app_config = &self.config.app;
        let has_frontend = app_config.src_path.exists();
        if !request.skip_app_build && has_frontend {
            self.frontend
                .build(&app_config.src_path, &app_config.build_script)
                .await?;
        }

        let dist = &app_config.build_output_path;
        if !request.only_content {
            self.generate(&app, &contract_name, &arapp, dist, has_frontend, request.skip_validation)
                .await?;
        }

        let ignore = IgnorePatterns::from_dir(&app_config.ignore_files_path)?;
        let content_hash = self.store.upload(dist, &ignore).await?;
        let content_uri = ContentUri::ipfs(content_hash.clone())?;

        if request.validate_upload {
            let gateway = self.config.ipfs.gateway.as_deref();
            side_effects.push(
                best_effort(SideEffect::UploadCheck, async {
                    self.store.resolve(&content_uri, gateway).await.map(|_| ())
                })
                .await,
            );
        }

        if let Some(pinning) = &self.pinning {
            let label = pin_label(&request.network, app.as_str(), resolution.next_version);
            side_effects.push(best_effort(SideEffect::Pin, pinning.pin(&content_hash, &label)).await);
        }

        let info = VersionInfo {
            version: resolution.next_version,
            contract_address,
            content_uri,
        };
        let transaction = self.encoder.encode(&app, &info, request.sender).await?;

        let tx_hash = if request.dry_run {
            info!(to = %transaction.to, data = %transaction.data_hex(), "dry run, transaction not sent");
            None
        } else {
            let hash = self.writer.send(&transaction).await?;
            let chain_id = self.chain.chain_id().await?;
            match explorer_tx_url(chain_id, hash) {
                Some(url) => info!(tx = %hash, %url, "transaction sent"),
                None => info!(tx = %hash, chain_id, "transaction sent"),
            }
            Some(hash)
        };

        Ok(PublishOutcome {
            transaction,
            next_version: resolution.next_version,
            bump: resolution.bump,
            contract_address,
            content_hash,
            tx_hash,
            side_effects,
        })
    }

    async fn contract_address(
        &self,
        plan: ContractPlan,
        contract_name: &str,
        request: &PublishRequest,
        side_effects: &mut Vec<SideEffectOutcome>,
    ) -> Result<Address, PublishError> {
        match plan {
            ContractPlan::ContentOnly => Ok(Address::ZERO),
            ContractPlan::Explicit(address) | ContractPlan::Reuse(address) => Ok(address),
            ContractPlan::Deploy if request.dry_run => {
                let nonce = self.chain.transaction_count(request.sender).await?;
                let predicted = predict_contract_address(request.sender, nonce);
                info!(contract = %predicted, nonce, "dry run, predicted deployment address");
                Ok(predicted)
            }
            ContractPlan::Deploy => {
                let deployer = self.deployer.as_ref().ok_or_else(|| {
                    PublishError::configuration("no deployer configured")
                })?;
                let address = deployer
                    .deploy(contract_name, self.config.app.confirmations)
                    .await
                    .map_err(|e| PublishError::Deployment(e.to_string()))?;
                info!(contract = %address, "deployed contract");

                if let (true, Some(verifier)) = (request.verify, &self.verifier) {
                    side_effects.push(
                        best_effort(SideEffect::Verify, verifier.verify(address, contract_name)).await,
                    );
                }
                Ok(address)
            }
        }
    }

    async fn generate(
        &self,
        app: &AppName,
        contract_name: &str,
        arapp: &AppManifest,
        dist: &Path,
        has_frontend: bool,
        skip_validation: bool,
    ) -> Result<(), PublishError> {
        let abi = self.contracts.abi(contract_name).await?;
        let flat_code = self.contracts.flattened_source(contract_name).await?;
        let manifest = self.load_manifest()?;

        let artifact = ArtifactBuilder::new(self.introspector.clone()).build(
            app,
            contract_name,
            &arapp.roles,
            &arapp.dependencies,
            &abi,
            &flat_code,
        )?;

        std::fs::create_dir_all(dist).map_err(|e| ArtifactError::io_error(dist, e))?;
        RepoContent::new(artifact, manifest, flat_code.as_str()).write_to(dist)?;
        info!(dist = %dist.display(), "wrote release documents");

        if skip_validation {
            warn!("skipping release validation");
            return Ok(());
        }
        let validator = ArtifactValidator::new(self.introspector.clone());
        let report = validator.validate(dist, contract_name, has_frontend)?;
        validator.upgrade_warnings(&flat_code)?;
        report.into_result()
    }

    fn load_manifest(&self) -> Result<Manifest, ArtifactError> {
        let path = self.root.join(MANIFEST_NAME);
        let text = std::fs::read_to_string(&path).map_err(|e| ArtifactError::io_error(&path, e))?;
        serde_json::from_str(&text).map_err(|e| ArtifactError::json_error(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    #[tokio::test]
    async fn best_effort_records_success_and_failure() {
        let ok = best_effort(SideEffect::Pin, async { Ok::<(), TransportError>(()) }).await;
        assert!(ok.succeeded());

        let failed = best_effort(SideEffect::Verify, async {
            Err(TransportError::Chain("explorer rejected source".into()))
        })
        .await;
        assert_eq!(failed.action, SideEffect::Verify);
        assert_eq!(
            failed.error.as_deref(),
            Some("chain rpc error: explorer rejected source")
        );
    }

    #[test]
    fn request_builders() {
        let request = PublishRequest::new("patch", "rinkeby", Address::ZERO)
            .with_dry_run(true)
            .with_only_content(true);
        assert!(request.dry_run && request.only_content);
        assert!(!request.verify);
        assert_eq!(request.contract_address, None);
    }
}

//! Registry transaction encoding and the publish permission check

use crate::chain::{ChainReader, CREATE_REPO_ROLE, CREATE_VERSION_ROLE};
use crate::content_uri::ContentUri;
use crate::error::PublishError;
use apm_artifact::abi::{encode_call, Token};
use apm_artifact::{Address, AppName, Digest32, SemanticVersion};
use std::sync::Arc;
use tracing::debug;

/// Publishes a version on an existing repo
pub const NEW_VERSION_SIGNATURE: &str = "newVersion(uint16[3],address,bytes)";

/// Creates a repo on a registry together with its first version
pub const NEW_REPO_WITH_VERSION_SIGNATURE: &str =
    "newRepoWithVersion(string,address,uint16[3],address,bytes)";

/// What a [`PublishTransaction`] does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishCall {
    NewVersion,
    NewRepoWithVersion { short_name: String, manager: Address },
}

/// An unsigned registry call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTransaction {
    pub to: Address,
    pub data: Vec<u8>,
    pub call: PublishCall,
}

impl PublishTransaction {
    /// `0x`-prefixed call data
    #[must_use]
    pub fn data_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.data))
    }
}

/// The version being published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: SemanticVersion,
    pub contract_address: Address,
    pub content_uri: ContentUri,
}

impl VersionInfo {
    fn tokens(&self) -> [Token; 3] {
        let parts = self
            .version
            .to_array()
            .iter()
            .map(|part| Token::Uint(u128::from(*part)))
            .collect();
        [
            Token::FixedArray(parts),
            Token::Address(self.contract_address),
            Token::Bytes(self.content_uri.to_bytes()),
        ]
    }
}

/// Encodes registry calls against live registry state
#[derive(Clone)]
pub struct PublishEncoder {
    chain: Arc<dyn ChainReader>,
}

impl std::fmt::Debug for PublishEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishEncoder").finish_non_exhaustive()
    }
}

impl PublishEncoder {
    #[must_use]
    pub fn new(chain: Arc<dyn ChainReader>) -> Self {
        Self { chain }
    }

    async fn registry_address(&self, app: &AppName) -> Result<Address, PublishError> {
        self.chain
            .resolve_name(app.registry_name())
            .await?
            .ok_or_else(|| {
                PublishError::configuration(format!(
                    "registry {} does not resolve on this network",
                    app.registry_name()
                ))
            })
    }

    /// Check `sender` may publish `app`
    ///
    /// An existing repo needs `CREATE_VERSION_ROLE` on the repo; a new one
    /// needs `CREATE_REPO_ROLE` on its registry.
    ///
    /// # Errors
    /// Returns permission error when the sender lacks the role, and
    /// configuration error when neither repo nor registry exist
    pub async fn assert_can_publish(&self, app: &AppName, sender: Address) -> Result<(), PublishError> {
        let (target, role, role_name) = match self.chain.resolve_name(app.as_str()).await? {
            Some(repo) => (repo, *CREATE_VERSION_ROLE, "CREATE_VERSION_ROLE"),
            None => (self.registry_address(app).await?, *CREATE_REPO_ROLE, "CREATE_REPO_ROLE"),
        };

        if self.chain.can_perform(target, sender, role).await? {
            debug!(app = %app, %sender, role = role_name, "publish permitted");
            Ok(())
        } else {
            Err(PublishError::Permission(format!(
                "{sender} lacks {role_name} on {target} to publish {app}"
            )))
        }
    }

    /// Encode the publish call for `info`
    ///
    /// Targets the repo when it exists, otherwise the registry with
    /// `manager` as the new repo's manager.
    ///
    /// # Errors
    /// Returns error if the registry cannot be resolved for a new repo
    pub async fn encode(
        &self,
        app: &AppName,
        info: &VersionInfo,
        manager: Address,
    ) -> Result<PublishTransaction, PublishError> {
        let [version, contract, content] = info.tokens();

        let transaction = match self.chain.resolve_name(app.as_str()).await? {
            Some(repo) => PublishTransaction {
                to: repo,
                data: encode_call(NEW_VERSION_SIGNATURE, &[version, contract, content]),
                call: PublishCall::NewVersion,
            },
            None => {
                let registry = self.registry_address(app).await?;
                let short_name = app.short_name().to_string();
                PublishTransaction {
                    to: registry,
                    data: encode_call(
                        NEW_REPO_WITH_VERSION_SIGNATURE,
                        &[
                            Token::String(short_name.clone()),
                            Token::Address(manager),
                            version,
                            contract,
                            content,
                        ],
                    ),
                    call: PublishCall::NewRepoWithVersion { short_name, manager },
                }
            }
        };

        debug!(to = %transaction.to, call = ?transaction.call, bytes = transaction.data.len(), "encoded publish transaction");
        Ok(transaction)
    }
}

/// Block-explorer URL of a transaction on a known chain
#[must_use]
pub fn explorer_tx_url(chain_id: u64, tx_hash: Digest32) -> Option<String> {
    let base = match chain_id {
        1 => "https://etherscan.io/",
        3 => "https://ropsten.etherscan.io/",
        4 => "https://rinkeby.etherscan.io/",
        5 => "https://goerli.etherscan.io/",
        42 => "https://kovan.etherscan.io/",
        100 => "https://blockscout.com/xdai/mainnet/",
        137 => "https://polygonscan.com/",
        80001 => "https://mumbai.polygonscan.com/",
        56 => "https://bscscan.com/",
        _ => return None,
    };
    Some(format!("{base}tx/{tx_hash}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainReader;
    use apm_artifact::abi::function_selector;
    use mockall::predicate::eq;

    const REPO: Address = Address::new([0x11; 20]);
    const REGISTRY: Address = Address::new([0x22; 20]);
    const SENDER: Address = Address::new([0x33; 20]);

    fn app() -> AppName {
        AppName::parse("finance.aragonpm.eth").unwrap()
    }

    fn info() -> VersionInfo {
        VersionInfo {
            version: SemanticVersion::new(2, 1, 1),
            contract_address: Address::new([0x44; 20]),
            content_uri: ContentUri::ipfs("QmRoot").unwrap(),
        }
    }

    fn chain(repo_exists: bool) -> MockChainReader {
        let mut chain = MockChainReader::new();
        chain
            .expect_resolve_name()
            .with(eq("finance.aragonpm.eth"))
            .returning(move |_| Ok(repo_exists.then_some(REPO)));
        chain
            .expect_resolve_name()
            .with(eq("aragonpm.eth"))
            .returning(|_| Ok(Some(REGISTRY)));
        chain
    }

    #[tokio::test]
    async fn existing_repo_gets_new_version() {
        let encoder = PublishEncoder::new(Arc::new(chain(true)));
        let tx = encoder.encode(&app(), &info(), SENDER).await.unwrap();

        assert_eq!(tx.to, REPO);
        assert_eq!(tx.call, PublishCall::NewVersion);
        assert_eq!(tx.data[..4], function_selector(NEW_VERSION_SIGNATURE));
        // version words, address word, offset of the bytes argument
        let word = |i: usize| &tx.data[4 + i * 32..4 + (i + 1) * 32];
        assert_eq!((word(0)[31], word(1)[31], word(2)[31]), (2, 1, 1));
        assert_eq!(word(3)[12..], [0x44; 20]);
        assert_eq!(word(4)[31], 0xa0);
        assert_eq!(word(5)[31], 11);
        assert_eq!(&word(6)[..11], b"ipfs:QmRoot");
        assert!(tx.data_hex().starts_with("0x"));
    }

    #[tokio::test]
    async fn missing_repo_is_created_on_registry() {
        let encoder = PublishEncoder::new(Arc::new(chain(false)));
        let tx = encoder.encode(&app(), &info(), SENDER).await.unwrap();

        assert_eq!(tx.to, REGISTRY);
        assert_eq!(
            tx.call,
            PublishCall::NewRepoWithVersion {
                short_name: "finance".into(),
                manager: SENDER
            }
        );
        assert_eq!(tx.data[..4], function_selector(NEW_REPO_WITH_VERSION_SIGNATURE));
    }

    #[tokio::test]
    async fn missing_registry_is_configuration_error() {
        let mut chain = MockChainReader::new();
        chain.expect_resolve_name().returning(|_| Ok(None));
        let encoder = PublishEncoder::new(Arc::new(chain));
        assert!(matches!(
            encoder.encode(&app(), &info(), SENDER).await,
            Err(PublishError::Configuration(_))
        ));
        assert!(matches!(
            encoder.assert_can_publish(&app(), SENDER).await,
            Err(PublishError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn permission_checks_the_right_role() {
        let mut existing = chain(true);
        existing
            .expect_can_perform()
            .with(eq(REPO), eq(SENDER), eq(*CREATE_VERSION_ROLE))
            .returning(|_, _, _| Ok(true));
        let encoder = PublishEncoder::new(Arc::new(existing));
        assert!(encoder.assert_can_publish(&app(), SENDER).await.is_ok());

        let mut fresh = chain(false);
        fresh
            .expect_can_perform()
            .with(eq(REGISTRY), eq(SENDER), eq(*CREATE_REPO_ROLE))
            .returning(|_, _, _| Ok(false));
        let encoder = PublishEncoder::new(Arc::new(fresh));
        let err = encoder.assert_can_publish(&app(), SENDER).await.unwrap_err();
        assert!(matches!(err, PublishError::Permission(ref m) if m.contains("CREATE_REPO_ROLE")));
    }

    #[test]
    fn explorer_urls() {
        let hash = Digest32::new([0xab; 32]);
        assert_eq!(
            explorer_tx_url(4, hash).unwrap(),
            format!("https://rinkeby.etherscan.io/tx/{hash}")
        );
        assert_eq!(
            explorer_tx_url(100, hash).unwrap(),
            format!("https://blockscout.com/xdai/mainnet/tx/{hash}")
        );
        assert!(explorer_tx_url(31337, hash).is_none());
    }
}

//! Remote pinning of uploaded releases

use crate::config::PinataConfig;
use crate::error::TransportError;
use apm_artifact::SemanticVersion;
use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;

/// A service that keeps content available after upload
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PinningService: Send + Sync {
    /// Pin `cid` under a human-readable `label`
    async fn pin(&self, cid: &str, label: &str) -> Result<(), TransportError>;
}

/// Label used for a release pin: `network:app@version`
#[must_use]
pub fn pin_label(network: &str, app_name: &str, version: SemanticVersion) -> String {
    format!("{network}:{app_name}@{version}")
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PinByHashRequest<'a> {
    hash_to_pin: &'a str,
    pinata_metadata: PinMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct PinMetadata<'a> {
    name: &'a str,
}

/// Pinata `pinByHash` client
#[derive(Debug, Clone)]
pub struct PinataClient {
    endpoint: String,
    key: String,
    secret: String,
    client: reqwest::Client,
}

impl PinataClient {
    #[must_use]
    pub fn new(config: &PinataConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            key: config.key.clone(),
            secret: config.secret.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn pin_url(&self) -> Result<Url, TransportError> {
        Url::parse(&self.endpoint)
            .and_then(|base| base.join("pinning/pinByHash"))
            .map_err(|e| TransportError::request(&self.endpoint, e))
    }
}

#[async_trait]
impl PinningService for PinataClient {
    async fn pin(&self, cid: &str, label: &str) -> Result<(), TransportError> {
        let url = self.pin_url()?;
        let body = PinByHashRequest {
            hash_to_pin: cid,
            pinata_metadata: PinMetadata { name: label },
        };
        let resp = self
            .client
            .post(url.clone())
            .header("pinata_api_key", &self.key)
            .header("pinata_secret_api_key", &self.secret)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::request(url.as_str(), e))?;
        if !resp.status().is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }
        tracing::info!(cid, label, "pinned release");
        Ok(())
    }
}

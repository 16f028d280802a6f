//! IPFS HTTP API and gateway clients

use crate::error::{PublishError, TransportError};
use crate::store::{ContentFetcher, ContentTransport, UploadFile};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::debug;

/// Client for an IPFS node's `/api/v0` endpoints
#[derive(Debug, Clone)]
pub struct IpfsHttpClient {
    base_url: Url,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    #[serde(rename = "Version")]
    version: String,
}

#[derive(Debug, Deserialize)]
struct AddEntry {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Hash")]
    hash: String,
}

impl IpfsHttpClient {
    /// Client for the API at `url`, without contacting it
    ///
    /// # Errors
    /// Returns configuration error if `url` is missing or not a URL
    pub fn new(url: Option<&str>) -> Result<Self, PublishError> {
        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| PublishError::configuration("no IPFS API url configured"))?;
        let base_url = Url::parse(url)
            .map_err(|e| PublishError::configuration(format!("invalid IPFS API url '{url}': {e}")))?;
        Ok(Self {
            base_url,
            client: reqwest::Client::new(),
        })
    }

    /// Client for the API at `url`, after checking the node answers
    ///
    /// # Errors
    /// Returns configuration error for a bad url, transport error if the
    /// node does not respond
    pub async fn connect(url: Option<&str>) -> Result<Self, PublishError> {
        let client = Self::new(url)?;
        let version = client.version().await?;
        debug!(url = %client.base_url, %version, "connected to IPFS node");
        Ok(client)
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path)
            .map_err(|e| TransportError::request(self.base_url.as_str(), e))
    }
}

#[async_trait]
impl ContentTransport for IpfsHttpClient {
    async fn version(&self) -> Result<String, TransportError> {
        let url = self.endpoint("api/v0/version")?;
        let resp = self
            .client
            .post(url.clone())
            .send()
            .await
            .map_err(|e| TransportError::request(url.as_str(), e))?;
        if !resp.status().is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }
        let body: VersionResponse = resp
            .json()
            .await
            .map_err(|e| TransportError::invalid_response(url.as_str(), e.to_string()))?;
        Ok(body.version)
    }

    async fn add(&self, files: Vec<UploadFile>) -> Result<String, TransportError> {
        let mut url = self.endpoint("api/v0/add")?;
        url.query_pairs_mut()
            .append_pair("wrap-with-directory", "true")
            .append_pair("pin", "true");

        let form = add_form(add_parts(files)).await?;

        let resp = self
            .client
            .post(url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::request(url.as_str(), e))?;
        if !resp.status().is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::request(url.as_str(), e))?;
        root_hash(&body).map_err(|message| TransportError::invalid_response(url.as_str(), message))
    }
}

/// Content type that makes the node create a directory node
const DIRECTORY_MIME: &str = "application/x-directory";

/// One multipart entry of an `add` request
#[derive(Debug, Clone, PartialEq, Eq)]
enum AddPart {
    Directory(String),
    File(UploadFile),
}

/// Files of an upload, each preceded by any parent directory not yet sent
///
/// Expects `files` sorted by path, as `collect_files` returns them.
fn add_parts(files: Vec<UploadFile>) -> Vec<AddPart> {
    let mut sent = BTreeSet::new();
    let mut parts = Vec::with_capacity(files.len());
    for file in files {
        for (end, _) in file.path.match_indices('/') {
            let dir = &file.path[..end];
            if sent.insert(dir.to_string()) {
                parts.push(AddPart::Directory(dir.to_string()));
            }
        }
        parts.push(AddPart::File(file));
    }
    parts
}

/// Multipart body for `parts`; file contents are streamed from disk
async fn add_form(parts: Vec<AddPart>) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for part in parts {
        let part = match part {
            AddPart::Directory(path) => Part::bytes(Vec::new())
                .file_name(path.clone())
                .mime_str(DIRECTORY_MIME)
                .map_err(|e| TransportError::request(path, e))?,
            AddPart::File(file) => {
                let handle = tokio::fs::File::open(&file.source)
                    .await
                    .map_err(|e| TransportError::io_error(&file.source, e))?;
                Part::stream_with_length(handle, file.size).file_name(file.path)
            }
        };
        form = form.part("file", part);
    }
    Ok(form)
}

/// Hash of the wrapping directory in an `add` response
///
/// The response is one JSON object per line; the wrapper has an empty name.
fn root_hash(ndjson: &str) -> Result<String, String> {
    let mut root = None;
    for line in ndjson.lines().filter(|l| !l.trim().is_empty()) {
        let entry: AddEntry = serde_json::from_str(line).map_err(|e| e.to_string())?;
        if entry.name.is_empty() {
            root = Some(entry.hash);
        }
    }
    root.ok_or_else(|| "no root directory entry in add response".to_string())
}

/// Fetches documents over HTTP(S), typically from an IPFS gateway
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, TransportError> {
        debug!(url, "fetching");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::request(url, e))?;
        if !resp.status().is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }
        resp.text().await.map_err(|e| TransportError::request(url, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn missing_url_is_configuration_error() {
        assert!(matches!(
            IpfsHttpClient::new(None),
            Err(PublishError::Configuration(_))
        ));
        assert!(matches!(
            IpfsHttpClient::new(Some("  ")),
            Err(PublishError::Configuration(_))
        ));
    }

    #[test]
    fn invalid_url_is_configuration_error() {
        let err = IpfsHttpClient::new(Some("not a url")).unwrap_err();
        assert!(matches!(err, PublishError::Configuration(ref m) if m.contains("not a url")));
    }

    #[test]
    fn endpoints_join_onto_base() {
        let client = IpfsHttpClient::new(Some("http://localhost:5001/")).unwrap();
        assert_eq!(
            client.endpoint("api/v0/version").unwrap().as_str(),
            "http://localhost:5001/api/v0/version"
        );
    }

    fn upload(path: &str) -> UploadFile {
        UploadFile {
            path: path.to_string(),
            source: PathBuf::from("/release").join(path),
            size: 1,
        }
    }

    #[test]
    fn directories_precede_their_files() {
        let parts = add_parts(vec![
            upload("index.html"),
            upload("meta/icon.svg"),
            upload("meta/img/shot.png"),
            upload("meta/logo.svg"),
            upload("script.js"),
        ]);
        assert_eq!(
            parts,
            vec![
                AddPart::File(upload("index.html")),
                AddPart::Directory("meta".into()),
                AddPart::File(upload("meta/icon.svg")),
                AddPart::Directory("meta/img".into()),
                AddPart::File(upload("meta/img/shot.png")),
                AddPart::File(upload("meta/logo.svg")),
                AddPart::File(upload("script.js")),
            ]
        );
    }

    #[test]
    fn flat_release_has_no_directory_parts() {
        let parts = add_parts(vec![upload("artifact.json"), upload("code.sol")]);
        assert!(parts.iter().all(|p| matches!(p, AddPart::File(_))));
    }

    #[tokio::test]
    async fn unreadable_file_fails_the_form() {
        let dir = tempfile::tempdir().unwrap();
        let missing = UploadFile {
            path: "gone.txt".into(),
            source: dir.path().join("gone.txt"),
            size: 0,
        };
        let err = add_form(vec![AddPart::File(missing)]).await.unwrap_err();
        assert!(matches!(err, TransportError::Io { .. }), "{err}");
    }

    #[tokio::test]
    async fn form_streams_files_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("meta")).unwrap();
        std::fs::write(dir.path().join("meta/icon.svg"), "<svg/>").unwrap();
        let file = UploadFile {
            path: "meta/icon.svg".into(),
            source: dir.path().join("meta/icon.svg"),
            size: 6,
        };
        assert!(add_form(add_parts(vec![file])).await.is_ok());
    }

    #[test]
    fn root_hash_picks_wrapping_directory() {
        let body = concat!(
            r#"{"Name":"index.html","Hash":"QmFile","Size":"12"}"#,
            "\n",
            r#"{"Name":"","Hash":"QmRoot","Size":"80"}"#,
            "\n"
        );
        assert_eq!(root_hash(body).unwrap(), "QmRoot");
    }

    #[test]
    fn root_hash_requires_wrapper() {
        assert!(root_hash(r#"{"Name":"a","Hash":"Qm"}"#).is_err());
        assert!(root_hash("garbage").is_err());
    }
}

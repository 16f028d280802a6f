//! The `protocol:location` content URI scheme
//!
//! On chain a content URI is stored as the UTF-8 bytes of its text form;
//! off chain it is rendered as `0x`-prefixed hex of those bytes.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

static GATEWAY_IPFS_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/+ipfs/*$").expect("static pattern compiles"));

static LOCATION_IPFS_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/*ipfs(/|:)+").expect("static pattern compiles"));

/// Supported content URI protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Http,
    Https,
    Ipfs,
}

impl Protocol {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::Ipfs => "ipfs",
        }
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = ContentUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            "ipfs" => Ok(Self::Ipfs),
            other => Err(ContentUriError::UnsupportedProtocol(other.to_string())),
        }
    }
}

/// A decoded content URI
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentUri {
    protocol: Protocol,
    location: String,
}

impl ContentUri {
    /// Create a content URI
    ///
    /// # Errors
    /// Returns error if `location` is empty
    pub fn new(protocol: Protocol, location: impl Into<String>) -> Result<Self, ContentUriError> {
        let location = location.into();
        if location.is_empty() {
            return Err(ContentUriError::InvalidContentUri(format!("{protocol}:")));
        }
        Ok(Self { protocol, location })
    }

    /// `ipfs:<cid>`
    ///
    /// # Errors
    /// Returns error if `cid` is empty
    pub fn ipfs(cid: impl Into<String>) -> Result<Self, ContentUriError> {
        Self::new(Protocol::Ipfs, cid)
    }

    /// Decode `protocol:location`, splitting at the first `:`
    ///
    /// # Errors
    /// Returns error if either part is empty or the protocol is unknown
    pub fn parse(text: &str) -> Result<Self, ContentUriError> {
        let (protocol, location) = text
            .split_once(':')
            .filter(|(p, l)| !p.is_empty() && !l.is_empty())
            .ok_or_else(|| ContentUriError::InvalidContentUri(text.to_string()))?;
        Self::new(protocol.parse()?, location)
    }

    /// Decode the on-chain hex form (`0x` prefix optional)
    ///
    /// # Errors
    /// Returns error on bad hex, non-UTF-8 bytes or an invalid URI
    pub fn from_hex(encoded: &str) -> Result<Self, ContentUriError> {
        let raw = encoded.strip_prefix("0x").unwrap_or(encoded);
        let bytes = hex::decode(raw)
            .map_err(|e| ContentUriError::InvalidContentUri(format!("{encoded}: {e}")))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| ContentUriError::InvalidContentUri(format!("{encoded}: {e}")))?;
        Self::parse(&text)
    }

    #[must_use]
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// UTF-8 bytes of the text form, as stored on chain
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// `0x`-prefixed hex of the text form
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    /// URL the content can be fetched from
    ///
    /// `http`/`https` URIs already are URLs. `ipfs` URIs are joined onto
    /// `gateway`, tolerating an `/ipfs` suffix on the gateway and an
    /// `ipfs/` or `ipfs:` prefix on the location.
    ///
    /// # Errors
    /// Returns error for an `ipfs` URI without a gateway
    pub fn fetch_url(&self, gateway: Option<&str>) -> Result<String, ContentUriError> {
        match self.protocol {
            Protocol::Http | Protocol::Https => Ok(if self.location.contains("://") {
                self.location.clone()
            } else {
                self.to_string()
            }),
            Protocol::Ipfs => {
                let gateway = gateway
                    .filter(|g| !g.trim().is_empty())
                    .ok_or(ContentUriError::MissingGateway)?;
                Ok(ipfs_gateway_join(gateway, &self.location))
            }
        }
    }
}

fn ipfs_gateway_join(gateway: &str, location: &str) -> String {
    let gateway = GATEWAY_IPFS_SUFFIX.replace(gateway.trim(), "");
    let location = LOCATION_IPFS_PREFIX.replace(location.trim(), "");
    format!(
        "{}/ipfs/{}",
        gateway.trim_end_matches('/'),
        location.trim_start_matches('/')
    )
}

impl Display for ContentUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.protocol, self.location)
    }
}

impl FromStr for ContentUri {
    type Err = ContentUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Encode `protocol:location`
///
/// # Errors
/// Returns error if either part is empty or the protocol is unknown
pub fn encode(protocol: &str, location: &str) -> Result<String, ContentUriError> {
    if protocol.is_empty() || location.is_empty() {
        return Err(ContentUriError::InvalidContentUri(format!("{protocol}:{location}")));
    }
    Ok(ContentUri::new(protocol.parse()?, location)?.to_string())
}

/// Decode `protocol:location`
///
/// # Errors
/// See [`ContentUri::parse`]
pub fn decode(text: &str) -> Result<ContentUri, ContentUriError> {
    ContentUri::parse(text)
}

/// Errors in the content addressing layer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentUriError {
    #[error("unsupported content uri protocol '{0}'")]
    UnsupportedProtocol(String),

    #[error("invalid content uri '{0}'")]
    InvalidContentUri(String),

    #[error("an ipfs gateway is required to fetch ipfs content")]
    MissingGateway,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CID: &str = "QmWtLbdMjVkBbR2xAT5x8Vhx3SyoV2JmSALp5ETfN8r4g3";

    #[test]
    fn encode_and_decode() {
        assert_eq!(encode("ipfs", CID).unwrap(), format!("ipfs:{CID}"));
        let uri = decode(&format!("ipfs:{CID}")).unwrap();
        assert_eq!(uri.protocol(), Protocol::Ipfs);
        assert_eq!(uri.location(), CID);
    }

    #[test]
    fn invalid_inputs() {
        assert!(matches!(encode("", CID), Err(ContentUriError::InvalidContentUri(_))));
        assert!(matches!(encode("ipfs", ""), Err(ContentUriError::InvalidContentUri(_))));
        assert!(matches!(decode("no-separator"), Err(ContentUriError::InvalidContentUri(_))));
        assert_eq!(
            decode("ftp:example.org/a"),
            Err(ContentUriError::UnsupportedProtocol("ftp".into()))
        );
    }

    #[test]
    fn hex_form() {
        let uri = ContentUri::ipfs("Qm").unwrap();
        assert_eq!(uri.to_hex(), "0x697066733a516d");
        assert_eq!(ContentUri::from_hex("0x697066733a516d").unwrap(), uri);
        assert_eq!(ContentUri::from_hex("697066733a516d").unwrap(), uri);
        assert!(ContentUri::from_hex("0xzz").is_err());
    }

    #[test]
    fn http_fetch_urls() {
        let full = decode("https://apps.example.org/finance").unwrap();
        assert_eq!(full.fetch_url(None).unwrap(), "https://apps.example.org/finance");

        let nested = decode("http:https://apps.example.org/finance").unwrap();
        assert_eq!(nested.fetch_url(None).unwrap(), "https://apps.example.org/finance");
    }

    #[test]
    fn ipfs_fetch_url_needs_gateway() {
        let uri = ContentUri::ipfs(CID).unwrap();
        assert_eq!(uri.fetch_url(None), Err(ContentUriError::MissingGateway));
        assert_eq!(
            uri.fetch_url(Some("https://ipfs.io")).unwrap(),
            format!("https://ipfs.io/ipfs/{CID}")
        );
    }

    #[test]
    fn ipfs_join_normalizes_both_sides() {
        let bare = ipfs_gateway_join("https://ipfs.io", CID);
        assert_eq!(ipfs_gateway_join("https://ipfs.io/ipfs/", &format!("ipfs/{CID}")), bare);
        assert_eq!(ipfs_gateway_join("https://ipfs.io//ipfs", &format!("/ipfs:{CID}")), bare);
        assert_eq!(ipfs_gateway_join("https://ipfs.io/", &format!("/{CID}")), bare);
        // a host merely containing "ipfs" is left alone
        assert_eq!(
            ipfs_gateway_join("https://myipfs", CID),
            format!("https://myipfs/ipfs/{CID}")
        );
    }

    fn protocol_strategy() -> impl Strategy<Value = Protocol> {
        prop_oneof![Just(Protocol::Http), Just(Protocol::Https), Just(Protocol::Ipfs)]
    }

    proptest! {
        #[test]
        fn roundtrip(protocol in protocol_strategy(), location in "[a-zA-Z0-9/:._-]{1,40}") {
            let text = encode(protocol.as_str(), &location).unwrap();
            let uri = decode(&text).unwrap();
            prop_assert_eq!(uri.protocol(), protocol);
            prop_assert_eq!(uri.location(), location.as_str());
            prop_assert_eq!(ContentUri::from_hex(&uri.to_hex()).unwrap(), uri);
        }

        #[test]
        fn gateway_join_is_idempotent(
            host in "[a-z]{1,12}\\.[a-z]{2,4}",
            cid in "Qm[a-zA-Z0-9]{10,44}",
            suffix in prop_oneof![Just(""), Just("/"), Just("/ipfs"), Just("/ipfs/")],
            prefix in prop_oneof![Just(""), Just("/"), Just("ipfs/"), Just("/ipfs/"), Just("ipfs:")],
        ) {
            let gateway = format!("https://{host}{suffix}");
            let location = format!("{prefix}{cid}");
            prop_assert_eq!(
                ipfs_gateway_join(&gateway, &location),
                ipfs_gateway_join(&format!("https://{host}"), &cid)
            );
        }
    }
}

//! Keccak digests and account addresses
//!
//! Provides [`Digest32`], the 32-byte keccak-256 value used for role ids,
//! application ids and function selectors, and [`Address`], a 20-byte
//! account address. Both render as `0x`-prefixed lowercase hex.

use sha3::{Digest, Keccak256};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte keccak-256 digest
///
/// Immutable and cheap to clone (Copy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest32([u8; 32]);

impl Digest32 {
    /// All-zero digest (ENS root node)
    pub const ZERO: Self = Self([0; 32]);

    /// Create a new digest from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create digest from byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 32 bytes
    #[inline]
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| HashError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Keccak-256 of arbitrary data
    #[inline]
    #[must_use]
    pub fn keccak(data: &[u8]) -> Self {
        Self(Keccak256::digest(data).into())
    }

    /// Keccak-256 of the UTF-8 bytes of `text`
    ///
    /// This is the digest used for role identifiers
    /// (`id("CREATE_PAYMENTS_ROLE")`).
    #[inline]
    #[must_use]
    pub fn id(text: &str) -> Self {
        Self::keccak(text.as_bytes())
    }

    /// Short string representation (first 16 hex chars, no prefix)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }

    /// Check if digest is all zeros
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

/// ENS namehash of a dotted name
///
/// `namehash("")` is the zero node; each label is folded from the right as
/// `keccak(node ++ keccak(label))`. Labels are lowercased first.
#[must_use]
pub fn namehash(name: &str) -> Digest32 {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return Digest32::ZERO;
    }

    name.rsplit('.').fold(Digest32::ZERO, |node, label| {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(node.as_bytes());
        buf[32..].copy_from_slice(Digest32::id(label).as_bytes());
        Digest32::keccak(&buf)
    })
}

impl Display for Digest32 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Digest32 {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(strip_hex_prefix(s))?;
        Self::from_slice(&bytes)
    }
}

impl AsRef<[u8]> for Digest32 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A 20-byte account or contract address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// The zero address, used when a version carries no contract
    pub const ZERO: Self = Self([0; 20]);

    /// Create a new address from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Create address from byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 20 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashError> {
        let arr: [u8; 20] = bytes.try_into().map_err(|_| HashError::InvalidLength {
            expected: 20,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Check if this is the zero address
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(strip_hex_prefix(s))?;
        Self::from_slice(&bytes)
    }
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

macro_rules! impl_hex_serde {
    ($ty:ident, $expecting:literal) => {
        impl serde::Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_string())
                } else {
                    serializer.serialize_bytes(&self.0)
                }
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                struct HexVisitor;

                impl<'de> serde::de::Visitor<'de> for HexVisitor {
                    type Value = $ty;

                    fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                        formatter.write_str($expecting)
                    }

                    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
                    where
                        E: serde::de::Error,
                    {
                        value.parse().map_err(serde::de::Error::custom)
                    }

                    fn visit_bytes<E>(self, value: &[u8]) -> Result<Self::Value, E>
                    where
                        E: serde::de::Error,
                    {
                        $ty::from_slice(value).map_err(serde::de::Error::custom)
                    }
                }

                if deserializer.is_human_readable() {
                    deserializer.deserialize_str(HexVisitor)
                } else {
                    deserializer.deserialize_bytes(HexVisitor)
                }
            }
        }
    };
}

impl_hex_serde!(Digest32, "a 32-byte digest as 0x-prefixed hex");
impl_hex_serde!(Address, "a 20-byte address as 0x-prefixed hex");

/// Errors that can occur when decoding digests and addresses
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Invalid byte length
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_of_empty_input() {
        assert_eq!(
            Digest32::keccak(b"").to_string(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn role_id_digest_matches_known_value() {
        assert_eq!(
            Digest32::id("CREATE_PAYMENTS_ROLE").to_string(),
            "0x5de467a460382d13defdc02aacddc9c7d6605d6d4e0b8bd2f70732cae8ea17bc"
        );
    }

    #[test]
    fn namehash_of_root_and_tld() {
        assert!(namehash("").is_zero());
        assert_eq!(
            namehash("eth").to_string(),
            "0x93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae"
        );
    }

    #[test]
    fn namehash_is_case_insensitive() {
        assert_eq!(namehash("Finance.AragonPM.eth"), namehash("finance.aragonpm.eth"));
    }

    #[test]
    fn digest_from_slice_invalid_length() {
        let result = Digest32::from_slice(&[1u8; 31]);
        assert!(matches!(
            result,
            Err(HashError::InvalidLength { expected: 32, actual: 31 })
        ));
    }

    #[test]
    fn digest_display_and_parse() {
        let digest = Digest32::id("test");
        let parsed: Digest32 = digest.to_string().parse().unwrap();
        assert_eq!(digest, parsed);

        let unprefixed: Digest32 = hex::encode(digest.as_bytes()).parse().unwrap();
        assert_eq!(digest, unprefixed);
    }

    #[test]
    fn digest_short() {
        let digest = Digest32::id("test");
        assert_eq!(digest.short().len(), 16);
        assert!(digest.to_string()[2..].starts_with(&digest.short()));
    }

    #[test]
    fn address_parse_and_display() {
        let addr: Address = "0xE04cAbcB24e11620Dd62bB99c396E76cEB578914".parse().unwrap();
        assert_eq!(addr.to_string(), "0xe04cabcb24e11620dd62bb99c396e76ceb578914");
        assert!(!addr.is_zero());
        assert!(Address::ZERO.is_zero());
    }

    #[test]
    fn address_rejects_wrong_length() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("not-hex".parse::<Address>().is_err());
    }

    #[test]
    fn serde_uses_prefixed_hex_strings() {
        let addr: Address = "0x00000000000000000000000000000000000000ff".parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x00000000000000000000000000000000000000ff\"");
        let decoded: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, decoded);

        let digest = Digest32::id("x");
        let decoded: Digest32 =
            serde_json::from_str(&serde_json::to_string(&digest).unwrap()).unwrap();
        assert_eq!(digest, decoded);
    }
}

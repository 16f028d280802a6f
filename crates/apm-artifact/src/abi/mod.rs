//! Contract ABI fragments
//!
//! [`AbiFragment`] mirrors one entry of a compiler-emitted JSON ABI. Fields
//! the pipeline does not interpret are kept in `extra` so a fragment
//! serializes back to the same document it was read from.

mod encode;

pub use encode::{encode, encode_call, function_selector, Token};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Kind of an ABI entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentKind {
    Function,
    Constructor,
    Fallback,
    Receive,
    Event,
    Error,
}

/// One function/event/error parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiParam {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_type: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<AbiParam>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
}

impl AbiParam {
    /// Parameter with just a name and type
    #[must_use]
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            internal_type: None,
            name: name.into(),
            kind: kind.into(),
            components: None,
            indexed: None,
        }
    }

    /// Canonical type, with tuple components expanded (`(address,uint256)[]`)
    #[must_use]
    pub fn canonical_type(&self) -> String {
        match (self.kind.strip_prefix("tuple"), &self.components) {
            (Some(suffix), Some(components)) => {
                let inner: Vec<String> = components.iter().map(Self::canonical_type).collect();
                format!("({}){}", inner.join(","), suffix)
            }
            _ => self.kind.clone(),
        }
    }
}

/// One ABI entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiFragment {
    #[serde(rename = "type")]
    pub kind: FragmentKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<AbiParam>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<AbiParam>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_mutability: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anonymous: Option<bool>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl AbiFragment {
    /// A `function` entry with the given inputs and mutability
    #[must_use]
    pub fn function(name: impl Into<String>, inputs: Vec<AbiParam>, state_mutability: &str) -> Self {
        Self {
            kind: FragmentKind::Function,
            name: Some(name.into()),
            inputs: Some(inputs),
            outputs: Some(Vec::new()),
            state_mutability: Some(state_mutability.to_string()),
            payable: None,
            constant: None,
            anonymous: None,
            extra: BTreeMap::new(),
        }
    }

    /// Synthetic entry used for `fallback()` when the compiled ABI has none
    #[must_use]
    pub fn payable_fallback() -> Self {
        Self {
            kind: FragmentKind::Fallback,
            name: None,
            inputs: None,
            outputs: None,
            state_mutability: Some("payable".to_string()),
            payable: Some(true),
            constant: None,
            anonymous: None,
            extra: BTreeMap::new(),
        }
    }

    /// Canonical signature: `name(type,...)`
    ///
    /// Constructors, fallbacks and receives use their kind as the name.
    #[must_use]
    pub fn signature(&self) -> String {
        let name = match (self.kind, &self.name) {
            (FragmentKind::Constructor, _) => "constructor",
            (FragmentKind::Fallback, _) => "fallback",
            (FragmentKind::Receive, _) => "receive",
            (_, Some(name)) => name.as_str(),
            (_, None) => "",
        };
        let types: Vec<String> = self
            .inputs
            .iter()
            .flatten()
            .map(AbiParam::canonical_type)
            .collect();
        format!("{}({})", name, types.join(","))
    }
}

/// Index an ABI by function signature (functions only)
#[must_use]
pub fn functions_by_signature(abi: &[AbiFragment]) -> BTreeMap<String, &AbiFragment> {
    abi.iter()
        .filter(|f| f.kind == FragmentKind::Function)
        .map(|f| (f.signature(), f))
        .collect()
}

/// Errors from ABI handling
#[derive(Debug, thiserror::Error)]
pub enum AbiError {
    #[error("invalid ABI document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}

/// Parse a JSON ABI array
///
/// # Errors
/// Returns error if the document is not a valid ABI array
pub fn parse_abi(json: &str) -> Result<Vec<AbiFragment>, AbiError> {
    Ok(serde_json::from_str(json)?)
}

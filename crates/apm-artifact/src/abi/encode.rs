//! Minimal ABI call encoding
//!
//! Covers the argument shapes used by registry write calls: unsigned
//! integers, addresses, fixed-size arrays, `bytes` and `string`.

use crate::hash::{Address, Digest32};

const WORD: usize = 32;

/// An ABI value to encode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Unsigned integer of any width up to 128 bits
    Uint(u128),
    /// 20-byte address, left-padded to a word
    Address(Address),
    /// `T[k]`: encoded inline when every element is static
    FixedArray(Vec<Token>),
    /// Dynamic `bytes`
    Bytes(Vec<u8>),
    /// Dynamic UTF-8 `string`
    String(String),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        match self {
            Token::Bytes(_) | Token::String(_) => true,
            Token::FixedArray(items) => items.iter().any(Token::is_dynamic),
            Token::Uint(_) | Token::Address(_) => false,
        }
    }

    fn head_len(&self) -> usize {
        match self {
            Token::FixedArray(items) if !self.is_dynamic() => {
                items.iter().map(Token::head_len).sum()
            }
            _ => WORD,
        }
    }
}

/// First four bytes of the keccak-256 of a canonical signature
#[must_use]
pub fn function_selector(signature: &str) -> [u8; 4] {
    let digest = Digest32::id(signature);
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&digest.as_bytes()[..4]);
    selector
}

/// Encode a call: selector followed by the encoded arguments
#[must_use]
pub fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut data = function_selector(signature).to_vec();
    data.extend(encode(tokens));
    data
}

/// Encode a tuple of tokens with the standard head/tail layout
#[must_use]
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len: usize = tokens.iter().map(Token::head_len).sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend(uint_word((head_len + tail.len()) as u128));
            tail.extend(encode_token(token));
        } else {
            head.extend(encode_token(token));
        }
    }

    head.extend(tail);
    head
}

fn encode_token(token: &Token) -> Vec<u8> {
    match token {
        Token::Uint(value) => uint_word(*value).to_vec(),
        Token::Address(address) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(address.as_bytes());
            word.to_vec()
        }
        Token::FixedArray(items) => encode(items),
        Token::Bytes(bytes) => encode_dynamic_bytes(bytes),
        Token::String(text) => encode_dynamic_bytes(text.as_bytes()),
    }
}

fn encode_dynamic_bytes(bytes: &[u8]) -> Vec<u8> {
    let padded = bytes.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(WORD + padded);
    out.extend(uint_word(bytes.len() as u128));
    out.extend_from_slice(bytes);
    out.resize(WORD + padded, 0);
    out
}

fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

//! Coercion between raw bytes and WSGI "native strings".
//!
//! WSGI carries header and environ values as text in which every character
//! stands for exactly one byte (Latin-1). These helpers convert in both
//! directions.

use crate::error::{JobwireError, Result};

/// Data that may be either raw bytes or Latin-1 text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsgiData {
    Bytes(Vec<u8>),
    Text(String),
}

impl WsgiData {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::Text(_) => "str",
        }
    }
}

impl From<Vec<u8>> for WsgiData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for WsgiData {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<String> for WsgiData {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for WsgiData {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Decode bytes into a WSGI string, one character per byte.
///
/// Text input is rejected with a type error.
pub fn bytes_to_wsgi(data: impl Into<WsgiData>) -> Result<String> {
    match data.into() {
        WsgiData::Bytes(bytes) => Ok(latin1_decode(&bytes)),
        other => Err(JobwireError::type_mismatch("data", "bytes", other.type_name())),
    }
}

/// Coerce a WSGI string back into the bytes it represents.
///
/// Bytes are returned unchanged. Text containing a character above U+00FF
/// cannot be represented and fails with an encoding error.
pub fn wsgi_to_bytes(data: impl Into<WsgiData>) -> Result<Vec<u8>> {
    match data.into() {
        WsgiData::Bytes(bytes) => Ok(bytes),
        WsgiData::Text(text) => latin1_encode(&text),
    }
}

/// Map each byte to the character with the same code point.
pub fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Map each character to the byte with the same code point.
pub fn latin1_encode(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .enumerate()
        .map(|(index, ch)| u8::try_from(ch).map_err(|_| JobwireError::encoding(ch, index)))
        .collect()
}

//! # Core
//!
//! Key material normalization shared by every part of the identifier
//! resolver: JWKs and RFC 7638 thumbprints, COSE keys, DID document and
//! resolution types, and X.509 certificate chain decoding.

pub mod cose;
pub mod did;
pub mod jwk;
pub mod x509;

use serde::{Deserialize, Serialize};

/// `Kind` allows serde to serialize/deserialize a string or an object.
///
/// Used for values that appear in both forms in the wild, such as the
/// entries of a DID document's verification relationship lists (a bare
/// verification method id or an inline verification method).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Kind<T> {
    /// Simple string value
    String(String),

    /// Complex object value
    Object(T),
}

impl<T> Default for Kind<T> {
    fn default() -> Self {
        Self::String(String::new())
    }
}

impl<T> From<String> for Kind<T> {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T> Kind<T> {
    /// Returns the string value, if the kind is a string.
    pub const fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            Self::Object(_) => None,
        }
    }

    /// Returns the object value, if the kind is an object.
    pub const fn as_object(&self) -> Option<&T> {
        match self {
            Self::String(_) => None,
            Self::Object(o) => Some(o),
        }
    }
}

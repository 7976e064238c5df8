//! # Types
//!
//! Request and result types for identifier resolution. Identifiers are an
//! explicit discriminated union; resolution results are tagged unions
//! discriminated by resolution method.

mod opts;
mod result;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use veridian_core::cose::CoseKey;
use veridian_core::jwk::{Curve, PublicKeyJwk};

pub use self::opts::{ExternalOpts, ManagedInput, ManagedOpts};
pub use self::result::{
    EntityIdResult, ExternalCoseKeyResult, ExternalDidResult, ExternalIssuerResult,
    ExternalJwkResult, ExternalResult, IssuerMetadata, ManagedCoseKeyResult, ManagedDidResult,
    ManagedIssuerResult, ManagedKeyInfo, ManagedKeyResult, ManagedResult, ManagedX5cResult,
    UrlJwksResult, X5cResult,
};

/// The resolution method: the single discriminant describing how an
/// identifier is resolved and which fields its result carries.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum Method {
    /// A DID, resolved to a DID document.
    #[serde(rename = "did")]
    Did,

    /// An opaque key id, looked up in the Key Manager.
    #[serde(rename = "kid")]
    Kid,

    /// A key object passed through directly.
    #[serde(rename = "key")]
    Key,

    /// A JSON Web Key.
    #[serde(rename = "jwk")]
    Jwk,

    /// An ordered X.509 certificate chain, leaf first.
    #[serde(rename = "x5c")]
    X5c,

    /// A COSE key.
    #[serde(rename = "cose_key")]
    CoseKey,

    /// An OpenID Federation entity id, resolved via trust chains.
    #[serde(rename = "entity_id")]
    EntityId,

    /// An OpenID Connect discovery URL.
    #[serde(rename = "oidc-discovery")]
    OidcDiscovery,

    /// A JWKS URL.
    #[serde(rename = "jwks-url")]
    JwksUrl,

    /// An OID4VCI credential issuer.
    #[serde(rename = "oid4vci-issuer")]
    Oid4vciIssuer,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Did => write!(f, "did"),
            Self::Kid => write!(f, "kid"),
            Self::Key => write!(f, "key"),
            Self::Jwk => write!(f, "jwk"),
            Self::X5c => write!(f, "x5c"),
            Self::CoseKey => write!(f, "cose_key"),
            Self::EntityId => write!(f, "entity_id"),
            Self::OidcDiscovery => write!(f, "oidc-discovery"),
            Self::JwksUrl => write!(f, "jwks-url"),
            Self::Oid4vciIssuer => write!(f, "oid4vci-issuer"),
        }
    }
}

/// An identifier value: the discriminated shapes an identifier can take.
///
/// Deserialization applies the documented classification precedence (see
/// [`Identifier::from_value`]); serialization emits the inner value
/// unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identifier {
    /// A string identifier: a DID, a bare key id, or an HTTPS URL.
    Text(String),

    /// A JSON Web Key.
    Jwk(PublicKeyJwk),

    /// A COSE key.
    CoseKey(CoseKey),

    /// An ordered certificate chain (base64 DER), leaf first.
    Chain(Vec<String>),

    /// A Key Manager key object.
    Key(ManagedKey),

    /// A DID Manager identifier object.
    DidIdentifier(OwnedIdentifier),
}

impl Serialize for Identifier {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(s) => s.serialize(serializer),
            Self::Jwk(jwk) => jwk.serialize(serializer),
            Self::CoseKey(key) => key.serialize(serializer),
            Self::Chain(chain) => chain.serialize(serializer),
            Self::Key(key) => key.serialize(serializer),
            Self::DidIdentifier(identifier) => identifier.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<PublicKeyJwk> for Identifier {
    fn from(value: PublicKeyJwk) -> Self {
        Self::Jwk(value)
    }
}

impl From<CoseKey> for Identifier {
    fn from(value: CoseKey) -> Self {
        Self::CoseKey(value)
    }
}

impl From<Vec<String>> for Identifier {
    fn from(value: Vec<String>) -> Self {
        Self::Chain(value)
    }
}

impl From<ManagedKey> for Identifier {
    fn from(value: ManagedKey) -> Self {
        Self::Key(value)
    }
}

impl From<OwnedIdentifier> for Identifier {
    fn from(value: OwnedIdentifier) -> Self {
        Self::DidIdentifier(value)
    }
}

/// A key held by the Key Manager. The public half is carried here; the
/// private half never leaves the KMS and is referenced by `kms_key_ref`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedKey {
    /// The key id.
    pub kid: String,

    /// The key's curve.
    #[serde(rename = "type")]
    pub key_type: Curve,

    /// Hex-encoded public key.
    pub public_key_hex: String,

    /// Reference to the private key within the KMS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_ref: Option<String>,
}

impl ManagedKey {
    /// The key's public half as a JWK.
    ///
    /// # Errors
    ///
    /// Returns an error if the public key hex is not a valid point on the
    /// key's curve.
    pub fn jwk(&self) -> Result<PublicKeyJwk> {
        PublicKeyJwk::from_public_key_hex(self.key_type, &self.public_key_hex)
    }
}

/// An identifier registered with the DID Manager, together with the
/// locally held keys that back it.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OwnedIdentifier {
    /// The DID.
    pub did: String,

    /// The id of the key controlling the DID, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_key_id: Option<String>,

    /// Keys backing the identifier.
    pub keys: Vec<ManagedKey>,

    /// A human-friendly alias for the identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// The scheme a relying party uses to interpret a `client_id`, carried
/// through managed results for OpenID callers.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum ClientIdScheme {
    /// The client id is a DID.
    #[serde(rename = "did")]
    Did,

    /// The client id is an OpenID Federation entity id.
    #[serde(rename = "entity_id")]
    EntityId,

    /// The client id is a DNS name matching a SAN entry in the leaf
    /// certificate.
    #[serde(rename = "x509_san_dns")]
    X509SanDns,

    /// The client id is a hash of the leaf certificate.
    #[serde(rename = "x509_hash")]
    X509Hash,

    /// The client id is a redirect URI.
    #[serde(rename = "redirect_uri")]
    RedirectUri,

    /// The client id was pre-registered out of band.
    #[serde(rename = "pre-registered")]
    Preregistered,
}

impl std::fmt::Display for ClientIdScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Did => write!(f, "did"),
            Self::EntityId => write!(f, "entity_id"),
            Self::X509SanDns => write!(f, "x509_san_dns"),
            Self::X509Hash => write!(f, "x509_hash"),
            Self::RedirectUri => write!(f, "redirect_uri"),
            Self::Preregistered => write!(f, "pre-registered"),
        }
    }
}

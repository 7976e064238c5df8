//! Resolution results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use veridian_core::cose::CoseKey;
use veridian_core::did::{Did, DidResolutionResult, Document, VerificationRelationship};
use veridian_core::jwk::{JwkInfo, Jwks, PublicKeyJwk};
use veridian_core::x509::ParsedCertificate;

use crate::provider::ChainValidationResult;
use crate::types::{ClientIdScheme, ManagedKey, Method, OwnedIdentifier};

/// The outcome of resolving a managed identifier: a handle to a locally
/// controlled signing key plus its JWK, thumbprint, issuer, and kid
/// context. Discriminated by resolution method.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "method")]
pub enum ManagedResult {
    /// Resolved from a DID.
    #[serde(rename = "did")]
    Did(ManagedDidResult),

    /// Resolved from a key id.
    #[serde(rename = "kid")]
    Kid(ManagedKeyResult),

    /// Resolved from a key object.
    #[serde(rename = "key")]
    Key(ManagedKeyResult),

    /// Resolved from a JWK.
    #[serde(rename = "jwk")]
    Jwk(ManagedKeyResult),

    /// Resolved from a certificate chain.
    #[serde(rename = "x5c")]
    X5c(ManagedX5cResult),

    /// Resolved from a COSE key.
    #[serde(rename = "cose_key")]
    CoseKey(ManagedCoseKeyResult),

    /// Resolved from OID4VCI issuer metadata.
    #[serde(rename = "oid4vci-issuer")]
    Oid4vciIssuer(ManagedIssuerResult),
}

impl ManagedResult {
    /// The resolution method that produced this result.
    #[must_use]
    pub const fn method(&self) -> Method {
        match self {
            Self::Did(_) => Method::Did,
            Self::Kid(_) => Method::Kid,
            Self::Key(_) => Method::Key,
            Self::Jwk(_) => Method::Jwk,
            Self::X5c(_) => Method::X5c,
            Self::CoseKey(_) => Method::CoseKey,
            Self::Oid4vciIssuer(_) => Method::Oid4vciIssuer,
        }
    }

    /// The resolved key context. For issuer results, the context of the
    /// delegated resolution.
    #[must_use]
    pub fn info(&self) -> &ManagedKeyInfo {
        match self {
            Self::Did(result) => &result.info,
            Self::Kid(result) | Self::Key(result) | Self::Jwk(result) => &result.info,
            Self::X5c(result) => &result.info,
            Self::CoseKey(result) => &result.info,
            Self::Oid4vciIssuer(result) => result.resolved.info(),
        }
    }

    /// The resolved keys.
    #[must_use]
    pub fn jwks(&self) -> &[JwkInfo] {
        &self.info().jwks
    }

    /// The key id of the resolved key.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.info().kid
    }
}

/// Key context common to every managed result: the selected key, its JWK
/// and thumbprint, and caller-supplied issuer/client context.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedKeyInfo {
    /// The key id: a verification method id for DID results, the Key
    /// Manager key id otherwise.
    pub kid: String,

    /// Reference to the private key within the KMS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_ref: Option<String>,

    /// The selected key.
    pub key: ManagedKey,

    /// The key's public half as a JWK.
    pub jwk: PublicKeyJwk,

    /// The key's RFC 7638 thumbprint.
    pub jwk_thumbprint: String,

    /// The resolved keys.
    pub jwks: Vec<JwkInfo>,

    /// The issuer associated with the result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// OpenID client id carried through from the options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// The scheme of `client_id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id_scheme: Option<ClientIdScheme>,
}

/// A managed identifier resolved from a DID.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedDidResult {
    /// The resolved DID.
    pub did: String,

    /// The DID Manager identifier backing the DID.
    pub identifier: OwnedIdentifier,

    /// Key context. `kid` is the selected verification method id;
    /// `issuer` is the DID unless overridden.
    #[serde(flatten)]
    pub info: ManagedKeyInfo,
}

/// A managed identifier resolved from a key id, key object, or JWK.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedKeyResult {
    /// Key context.
    #[serde(flatten)]
    pub info: ManagedKeyInfo,
}

/// A managed identifier resolved from a certificate chain.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedX5cResult {
    /// The certificate chain, leaf first.
    pub x5c: Vec<String>,

    /// The leaf certificate (base64 DER).
    pub certificate: String,

    /// Key context for the local key matching the leaf certificate.
    #[serde(flatten)]
    pub info: ManagedKeyInfo,
}

/// A managed identifier resolved from a COSE key.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedCoseKeyResult {
    /// The supplied COSE key.
    pub cose_key: CoseKey,

    /// Key context for the matching local key.
    #[serde(flatten)]
    pub info: ManagedKeyInfo,
}

/// A managed identifier resolved from OID4VCI issuer metadata, wrapping
/// the resolution the issuer's signing key delegated to.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedIssuerResult {
    /// The issuer's metadata.
    pub issuer_metadata: IssuerMetadata,

    /// The delegated resolution of the issuer's signing key.
    pub resolved: Box<ManagedResult>,
}

/// OID4VCI credential issuer metadata, reduced to the members relevant to
/// signing-key discovery. Everything else is retained untyped.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct IssuerMetadata {
    /// The credential issuer identifier (an HTTPS URL, or a DID for
    /// issuers keyed by DID).
    pub credential_issuer: String,

    /// Inline signing keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks: Option<Jwks>,

    /// URL of the issuer's JWKS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,

    /// Members not relevant to key discovery.
    #[serde(flatten)]
    pub additional: serde_json::Map<String, Value>,
}

/// The outcome of resolving an external identifier: verifiable key
/// material for a remote party. Discriminated by resolution method.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "method")]
pub enum ExternalResult {
    /// Resolved from a DID.
    #[serde(rename = "did")]
    Did(ExternalDidResult),

    /// Resolved from a JWK.
    #[serde(rename = "jwk")]
    Jwk(ExternalJwkResult),

    /// Resolved from a certificate chain.
    #[serde(rename = "x5c")]
    X5c(X5cResult),

    /// Resolved from a COSE key.
    #[serde(rename = "cose_key")]
    CoseKey(ExternalCoseKeyResult),

    /// Resolved by establishing federation trust.
    #[serde(rename = "entity_id")]
    EntityId(EntityIdResult),

    /// Resolved from an OpenID Connect discovery document.
    #[serde(rename = "oidc-discovery")]
    OidcDiscovery(UrlJwksResult),

    /// Resolved from a JWKS URL.
    #[serde(rename = "jwks-url")]
    JwksUrl(UrlJwksResult),

    /// Resolved from OID4VCI issuer metadata.
    #[serde(rename = "oid4vci-issuer")]
    Oid4vciIssuer(ExternalIssuerResult),
}

impl ExternalResult {
    /// The resolution method that produced this result.
    #[must_use]
    pub const fn method(&self) -> Method {
        match self {
            Self::Did(_) => Method::Did,
            Self::Jwk(_) => Method::Jwk,
            Self::X5c(_) => Method::X5c,
            Self::CoseKey(_) => Method::CoseKey,
            Self::EntityId(_) => Method::EntityId,
            Self::OidcDiscovery(_) => Method::OidcDiscovery,
            Self::JwksUrl(_) => Method::JwksUrl,
            Self::Oid4vciIssuer(_) => Method::Oid4vciIssuer,
        }
    }

    /// The resolved keys.
    #[must_use]
    pub fn jwks(&self) -> &[JwkInfo] {
        match self {
            Self::Did(result) => &result.jwks,
            Self::Jwk(result) => &result.jwks,
            Self::X5c(result) => &result.jwks,
            Self::CoseKey(result) => &result.jwks,
            Self::EntityId(result) => &result.jwks,
            Self::OidcDiscovery(result) | Self::JwksUrl(result) => &result.jwks,
            Self::Oid4vciIssuer(result) => &result.jwks,
        }
    }
}

/// An external identifier resolved from a DID. DID resolution failures
/// are reported inline in `did_resolution_result`, never thrown.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDidResult {
    /// The resolved DID.
    pub did: String,

    /// The parsed DID URL.
    pub did_parsed: Did,

    /// The resolved DID document, when resolution succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub did_document: Option<Document>,

    /// The document's keys, grouped by verification relationship.
    pub did_jwks: BTreeMap<VerificationRelationship, Vec<JwkInfo>>,

    /// The full resolution result, including any inline resolution error.
    pub did_resolution_result: DidResolutionResult,

    /// The keys selected by the requested verification relationship (and
    /// the fallback search, unless disabled).
    pub jwks: Vec<JwkInfo>,
}

/// An external identifier resolved from a JWK.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalJwkResult {
    /// The supplied JWK.
    pub jwk: PublicKeyJwk,

    /// Chain verification cascaded into when the JWK embeds an `x5c`
    /// parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Box<X5cResult>>,

    /// The resolved keys.
    pub jwks: Vec<JwkInfo>,
}

/// An external identifier resolved from a certificate chain. Always
/// carries the decoded certificates and their keys; validation failures
/// are reported in `verification_result`, never thrown.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct X5cResult {
    /// The certificate chain, leaf first.
    pub x5c: Vec<String>,

    /// The leaf certificate (base64 DER).
    pub certificate: String,

    /// The decoded chain.
    pub certificates: Vec<ParsedCertificate>,

    /// The leaf certificate's subject public key: the key a signature
    /// over this chain is verified against.
    pub issuer_jwk: JwkInfo,

    /// The chain validator's verdict. Absent when verification was
    /// explicitly disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_result: Option<ChainValidationResult>,

    /// The resolved keys, one per certificate in the chain.
    pub jwks: Vec<JwkInfo>,
}

/// An external identifier resolved from a COSE key. Structural conversion
/// only; no trust step.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalCoseKeyResult {
    /// The supplied COSE key.
    pub cose_key: CoseKey,

    /// The key's JWK representation.
    pub jwk: PublicKeyJwk,

    /// The resolved keys.
    pub jwks: Vec<JwkInfo>,
}

/// The outcome of the OpenID Federation trust-chain walk across the
/// supplied trust anchors.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntityIdResult {
    /// The federation entity id that was resolved.
    pub entity_id: String,

    /// The anchors trust was established through, in attempt order.
    pub trusted_anchors: Vec<String>,

    /// Per-anchor failures. Present iff at least one anchor failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_list: Option<BTreeMap<String, String>>,

    /// The decoded leaf entity statement payload, from the first anchor
    /// that produced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_payload: Option<Value>,

    /// Whether trust was established through at least one anchor.
    pub trust_established: bool,

    /// The resolved keys, from the first anchor that succeeded.
    pub jwks: Vec<JwkInfo>,
}

/// An external identifier resolved by fetching a JWKS, directly or via an
/// OpenID Connect discovery document.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UrlJwksResult {
    /// The URL the resolution started from.
    pub url: String,

    /// The JWKS URL named by the discovery document, when discovery was
    /// involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,

    /// The resolved keys.
    pub jwks: Vec<JwkInfo>,
}

/// An external identifier resolved from OID4VCI issuer metadata.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalIssuerResult {
    /// The URL the resolution started from.
    pub url: String,

    /// The issuer's metadata.
    pub issuer_metadata: IssuerMetadata,

    /// The resolved keys.
    pub jwks: Vec<JwkInfo>,
}

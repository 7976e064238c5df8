//! # Provider Traits
//!
//! This module defines the capability traits the resolver consumes. Each
//! trait covers one collaborator concern (key custody, DID management,
//! DID resolution, JWS verification, federation trust-chain resolution,
//! certificate chain validation, HTTP fetching) and is implemented by
//! library users. The `ManagedProvider` and `ExternalProvider` supertraits
//! combine the capabilities each resolution entry point requires.

use std::future::Future;

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use veridian_core::did::DidResolutionResult;
use veridian_core::jwk::JwkInfo;

use crate::types::{ManagedKey, OwnedIdentifier};

/// Provider of capabilities required for managed resolution.
pub trait ManagedProvider: KeyStore + DidStore + DidResolver + Fetcher + Clone {}

/// A blanket implementation for `ManagedProvider` so that any type
/// implementing the required super traits is considered a provider.
impl<T> ManagedProvider for T where T: KeyStore + DidStore + DidResolver + Fetcher + Clone {}

/// Provider of capabilities required for external resolution.
pub trait ExternalProvider:
    DidResolver + JwsVerifier + TrustChainResolver + ChainValidator + Fetcher + Clone
{
}

/// A blanket implementation for `ExternalProvider` so that any type
/// implementing the required super traits is considered a provider.
impl<T> ExternalProvider for T where
    T: DidResolver + JwsVerifier + TrustChainResolver + ChainValidator + Fetcher + Clone
{
}

/// The Key Manager: custody of locally controlled keys.
pub trait KeyStore: Send + Sync {
    /// The key with the given key id, if held.
    fn key(&self, kid: &str) -> impl Future<Output = Result<Option<ManagedKey>>> + Send;

    /// All held keys.
    fn keys(&self) -> impl Future<Output = Result<Vec<ManagedKey>>> + Send;

    /// Sign a message with the key referenced by the given key id.
    fn sign(&self, kid: &str, msg: &[u8]) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// The DID Manager: locally registered identifiers and the keys backing
/// them.
pub trait DidStore: Send + Sync {
    /// The identifier registered for the given DID, if any.
    fn identifier(&self, did: &str) -> impl Future<Output = Result<Option<OwnedIdentifier>>> + Send;
}

/// DID resolution. Resolution failures are reported inline in the
/// resolution metadata rather than as errors; an `Err` is reserved for
/// collaborator failures (transport, misconfiguration).
pub trait DidResolver: Send + Sync {
    /// Resolve the given DID to a DID document.
    fn resolve(&self, did: &str) -> impl Future<Output = Result<DidResolutionResult>> + Send;
}

/// JWS verification. The verifier resolves the signer itself (an external
/// resolution of its own) and reports the signer's keys with each
/// signature; the capability boundary keeps that recursion out of this
/// crate.
pub trait JwsVerifier: Send + Sync {
    /// Verify a compact or JSON JWS.
    fn verify_jws(&self, jws: &str) -> impl Future<Output = Result<VerifyJwsResult>> + Send;
}

/// OpenID Federation trust-chain resolution: entity id + trust anchor to
/// an ordered chain of signed entity statements.
pub trait TrustChainResolver: Send + Sync {
    /// The entity-statement chain from the given entity to the given
    /// anchor, leaf first.
    fn trust_chain(
        &self, entity_id: &str, trust_anchor: &str,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// X.509 certificate chain validation.
pub trait ChainValidator: Send + Sync {
    /// Validate the chain against the given anchors at the given instant.
    fn validate(
        &self, x5c: &[String], trust_anchors: &[String], at: DateTime<Utc>,
    ) -> impl Future<Output = Result<ChainValidationResult>> + Send;
}

/// HTTP document fetching, used for JWKS, discovery, and issuer metadata.
pub trait Fetcher: Send + Sync {
    /// Fetch the JSON document at the given URL.
    fn fetch_json(&self, url: &str) -> impl Future<Output = Result<Value>> + Send;
}

/// The outcome of verifying a JWS.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyJwsResult {
    /// Whether verification failed.
    pub error: bool,

    /// Whether the failure is critical (e.g. a malformed JWS rather than
    /// a bad signature).
    pub critical: bool,

    /// A human-readable failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// The JWS payload, base64url.
    pub payload: String,

    /// The verified signatures.
    pub signatures: Vec<JwsSignature>,
}

impl VerifyJwsResult {
    /// A successful verification with a single signature.
    #[must_use]
    pub fn valid(payload: impl Into<String>, signer_jwks: Vec<JwkInfo>) -> Self {
        Self {
            payload: payload.into(),
            signatures: vec![JwsSignature {
                protected: None,
                jwks: signer_jwks,
            }],
            ..Self::default()
        }
    }

    /// A failed verification.
    #[must_use]
    pub fn invalid(message: impl Into<String>, critical: bool) -> Self {
        Self {
            error: true,
            critical,
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// One signature of a verified JWS, with the signer's resolved keys.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JwsSignature {
    /// The protected header, base64url.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protected: Option<String>,

    /// The signer's keys, as resolved by the verifier.
    pub jwks: Vec<JwkInfo>,
}

/// The chain validator's verdict. Failures are data: the resolver returns
/// them to the caller rather than propagating them as errors.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChainValidationResult {
    /// Whether validation failed.
    pub error: bool,

    /// Whether the failure is critical (the chain is structurally
    /// unusable, not merely untrusted).
    pub critical: bool,

    /// A human-readable description of the outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ChainValidationResult {
    /// A passing verdict.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            error: false,
            critical: false,
            message: None,
        }
    }

    /// A failing verdict.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: true,
            critical: false,
            message: Some(message.into()),
        }
    }
}

/// `Fetcher` implementation backed by a shared reqwest client.
#[derive(Clone, Debug, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        let response =
            self.client.get(url).send().await.with_context(|| format!("fetching {url}"))?;
        response
            .error_for_status()
            .with_context(|| format!("fetching {url}"))?
            .json()
            .await
            .with_context(|| format!("decoding response from {url}"))
    }
}

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use veridian_core::did::DidResolutionResult;
use veridian_resolver::provider::{
    ChainValidationResult, ChainValidator, DidResolver, Fetcher, JwsVerifier, TrustChainResolver,
    VerifyJwsResult,
};

use crate::certs::MockChainValidator;
use crate::federation::{MockJwsVerifier, TrustResolver};
use crate::fetch::StaticFetcher;
use crate::identity::IdentityStore;

/// An external-side provider: DID resolution, JWS verification, trust
/// chains, chain validation, and a canned fetcher, composed for external
/// resolution tests. Override individual fields to script behavior:
///
/// ```
/// use test_utils::Verifier;
/// use test_utils::certs::MockChainValidator;
///
/// let verifier = Verifier {
///     validator: MockChainValidator::Reject("revoked".to_string()),
///     ..Verifier::new()
/// };
/// ```
#[derive(Clone)]
pub struct Verifier {
    /// DID resolution.
    pub identity: IdentityStore,

    /// JWS verification.
    pub jws: MockJwsVerifier,

    /// Federation trust-chain resolution.
    pub trust: TrustResolver,

    /// Certificate chain validation.
    pub validator: MockChainValidator,

    /// Canned metadata documents.
    pub fetcher: StaticFetcher,
}

impl Verifier {
    /// A verifier that structurally validates chains and accepts every
    /// JWS with no signer keys. Script the verifier for key material.
    #[must_use]
    pub fn new() -> Self {
        Self {
            identity: IdentityStore::new(),
            jws: MockJwsVerifier::valid(Vec::new()),
            trust: TrustResolver::new(),
            validator: MockChainValidator::Structural,
            fetcher: StaticFetcher::new(),
        }
    }
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DidResolver for Verifier {
    async fn resolve(&self, did: &str) -> Result<DidResolutionResult> {
        self.identity.resolve(did).await
    }
}

impl JwsVerifier for Verifier {
    async fn verify_jws(&self, jws: &str) -> Result<VerifyJwsResult> {
        self.jws.verify_jws(jws).await
    }
}

impl TrustChainResolver for Verifier {
    async fn trust_chain(&self, entity_id: &str, trust_anchor: &str) -> Result<Vec<String>> {
        self.trust.trust_chain(entity_id, trust_anchor).await
    }
}

impl ChainValidator for Verifier {
    async fn validate(
        &self, x5c: &[String], trust_anchors: &[String], at: DateTime<Utc>,
    ) -> Result<ChainValidationResult> {
        self.validator.validate(x5c, trust_anchors, at).await
    }
}

impl Fetcher for Verifier {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        self.fetcher.fetch_json(url).await
    }
}

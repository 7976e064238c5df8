//! Federation trust-chain mocks: a configurable chain resolver, a JWS
//! verifier with scriptable outcomes, and an entity-statement fixture
//! builder.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use base64ct::{Base64UrlUnpadded, Encoding};
use serde_json::json;
use veridian_core::jwk::JwkInfo;
use veridian_resolver::provider::{JwsSignature, JwsVerifier, TrustChainResolver, VerifyJwsResult};

/// A signed entity statement fixture: `header.payload.signature` with a
/// decodable payload and a placeholder signature.
#[must_use]
pub fn entity_statement(entity_id: &str, authority: &str) -> String {
    let header = json!({"alg": "ES256", "typ": "entity-statement+jwt"});
    let payload = json!({
        "iss": authority,
        "sub": entity_id,
        "metadata": {"federation_entity": {"organization_name": "Test Federation"}}
    });
    format!(
        "{}.{}.c2lnbmF0dXJl",
        Base64UrlUnpadded::encode_string(&serde_json::to_vec(&header).expect("should serialize")),
        Base64UrlUnpadded::encode_string(&serde_json::to_vec(&payload).expect("should serialize")),
    )
}

/// A trust-chain resolver with per-(entity, anchor) scripted outcomes.
/// Unscripted pairs are an error; a panicking resolver asserts it is
/// never reached.
#[derive(Clone, Default)]
pub struct TrustResolver {
    chains: Arc<Mutex<HashMap<(String, String), Result<Vec<String>, String>>>>,
    panic_on_call: bool,
}

impl TrustResolver {
    /// A resolver with no scripted chains.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver that panics when called. Used to assert preconditions
    /// fail before any I/O.
    #[must_use]
    pub fn panicking() -> Self {
        Self {
            panic_on_call: true,
            ..Self::default()
        }
    }

    /// Script a chain for the given entity and anchor.
    pub fn add_chain(&self, entity_id: &str, anchor: &str, chain: Vec<String>) {
        self.chains
            .lock()
            .expect("should lock")
            .insert((entity_id.to_string(), anchor.to_string()), Ok(chain));
    }

    /// Script a failure for the given entity and anchor.
    pub fn add_error(&self, entity_id: &str, anchor: &str, message: &str) {
        self.chains
            .lock()
            .expect("should lock")
            .insert((entity_id.to_string(), anchor.to_string()), Err(message.to_string()));
    }
}

impl TrustChainResolver for TrustResolver {
    async fn trust_chain(&self, entity_id: &str, trust_anchor: &str) -> Result<Vec<String>> {
        assert!(!self.panic_on_call, "trust chain resolver must not be called");
        match self
            .chains
            .lock()
            .expect("should lock")
            .get(&(entity_id.to_string(), trust_anchor.to_string()))
        {
            Some(Ok(chain)) => Ok(chain.clone()),
            Some(Err(message)) => Err(anyhow!("{message}")),
            None => Err(anyhow!("no chain from {entity_id} to {trust_anchor}")),
        }
    }
}

/// How a [`MockJwsVerifier`] answers.
#[derive(Clone)]
pub enum VerifyOutcome {
    /// Signature verifies; the signer resolved to the given keys.
    Valid(Vec<JwkInfo>),

    /// Verification failed.
    Invalid {
        /// The failure description.
        message: String,
        /// Whether the failure is critical.
        critical: bool,
    },

    /// The JWS carried no signature.
    NoSignature,

    /// The signature verified but the signer resolved to no keys.
    NoJwks,
}

/// A JWS verifier with a single scripted outcome. The payload is always
/// the real payload of the presented JWS, so decoded statement payloads
/// stay faithful to the fixture.
#[derive(Clone)]
pub struct MockJwsVerifier {
    outcome: VerifyOutcome,
}

impl MockJwsVerifier {
    /// A verifier producing the given outcome.
    #[must_use]
    pub const fn new(outcome: VerifyOutcome) -> Self {
        Self { outcome }
    }

    /// A verifier that accepts every JWS with the given signer keys.
    #[must_use]
    pub const fn valid(signer_jwks: Vec<JwkInfo>) -> Self {
        Self::new(VerifyOutcome::Valid(signer_jwks))
    }
}

impl JwsVerifier for MockJwsVerifier {
    async fn verify_jws(&self, jws: &str) -> Result<VerifyJwsResult> {
        let payload = jws.split('.').nth(1).unwrap_or_default().to_string();
        let result = match &self.outcome {
            VerifyOutcome::Valid(jwks) => VerifyJwsResult::valid(payload, jwks.clone()),
            VerifyOutcome::Invalid { message, critical } => {
                VerifyJwsResult::invalid(message.clone(), *critical)
            }
            VerifyOutcome::NoSignature => VerifyJwsResult {
                payload,
                ..VerifyJwsResult::default()
            },
            VerifyOutcome::NoJwks => VerifyJwsResult {
                payload,
                signatures: vec![JwsSignature::default()],
                ..VerifyJwsResult::default()
            },
        };
        Ok(result)
    }
}

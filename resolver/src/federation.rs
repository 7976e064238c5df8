//! # Federation Trust Establishment
//!
//! The OpenID Federation trust-chain walk: given an entity id and one or
//! more trust anchors, request and verify the signed entity-statement
//! chain to each anchor. Anchors are attempted independently, so one
//! failing or unreachable anchor cannot block trust via another. Every
//! attempted anchor ends up either in the trusted set or in the error
//! map; nothing is silently dropped.
//!
//! The decoded statement payload and the signer's keys are taken from the
//! first anchor that yields them and never overwritten by later successes
//! (the payload is anchor-invariant by design). Anchors are walked
//! sequentially in input order; the aggregation is commutative, so order
//! affects latency only.

use anyhow::Result;
use base64ct::{Base64UrlUnpadded, Encoding};
use serde_json::Value;
use tracing::{debug, instrument};
use veridian_core::jwk::JwkInfo;

use crate::error::Error;
use crate::provider::{ExternalProvider, JwsVerifier, TrustChainResolver};
use crate::types::{EntityIdResult, ExternalOpts, Identifier};

/// Walk the trust chains from the entity to each supplied anchor.
///
/// # Errors
///
/// Returns [`Error::Configuration`] before any I/O when no trust anchors
/// are supplied, and [`Error::InvalidIdentifier`] when the identifier is
/// not an entity id string. Per-anchor failures are not errors: they are
/// accumulated in the result's `error_list`.
#[instrument(level = "debug", skip(opts, provider), fields(anchors = opts.trust_anchors.len()))]
pub(crate) async fn resolve_entity_id<P: ExternalProvider>(
    opts: &ExternalOpts, provider: &P,
) -> Result<EntityIdResult, Error> {
    let Identifier::Text(entity_id) = &opts.identifier else {
        return Err(Error::InvalidIdentifier("an entity id URL is required".to_string()));
    };
    if opts.trust_anchors.is_empty() {
        return Err(Error::Configuration(
            "at least one trust anchor is required to establish trust".to_string(),
        ));
    }

    let mut result = EntityIdResult {
        entity_id: entity_id.clone(),
        ..EntityIdResult::default()
    };
    let mut errors = std::collections::BTreeMap::new();

    for anchor in &opts.trust_anchors {
        match walk_anchor(entity_id, anchor, provider).await {
            Ok(success) => {
                debug!("trust established for {entity_id} via {anchor}");
                result.trusted_anchors.push(anchor.clone());
                if result.jwt_payload.is_none() {
                    result.jwt_payload = Some(success.payload);
                }
                if result.jwks.is_empty() {
                    result.jwks = success.jwks;
                }
            }
            Err(failure) => {
                debug!("anchor {anchor} failed for {entity_id}: {}", failure.message);
                // the payload may have decoded even though the anchor
                // failed a later step
                if result.jwt_payload.is_none() {
                    result.jwt_payload = failure.payload;
                }
                errors.insert(anchor.clone(), failure.message);
            }
        }
    }

    result.trust_established = !result.trusted_anchors.is_empty();
    result.error_list = (!errors.is_empty()).then_some(errors);
    Ok(result)
}

struct AnchorSuccess {
    payload: Value,
    jwks: Vec<JwkInfo>,
}

struct AnchorFailure {
    message: String,
    payload: Option<Value>,
}

impl AnchorFailure {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            payload: None,
        }
    }
}

// One anchor's walk: request the chain, verify its leaf statement, decode
// the payload, and collect the signer's keys. Each step's failure is
// scoped to this anchor.
async fn walk_anchor<P: ExternalProvider>(
    entity_id: &str, anchor: &str, provider: &P,
) -> Result<AnchorSuccess, AnchorFailure> {
    let chain = provider
        .trust_chain(entity_id, anchor)
        .await
        .map_err(|e| AnchorFailure::new(error_message(&e)))?;
    if chain.is_empty() {
        return Err(AnchorFailure::new("Trust chain is empty"));
    }

    let verification = provider
        .verify_jws(&chain[0])
        .await
        .map_err(|e| AnchorFailure::new(error_message(&e)))?;
    if verification.error || verification.critical {
        return Err(AnchorFailure::new(
            verification.message.unwrap_or_else(|| "unspecified".to_string()),
        ));
    }
    if verification.signatures.is_empty() {
        return Err(AnchorFailure::new("No signature was present in the trust chain JWT"));
    }

    let payload = decode_payload(&verification.payload)
        .map_err(|e| AnchorFailure::new(e.to_string()))?;

    let signature = &verification.signatures[0];
    if signature.jwks.is_empty() {
        return Err(AnchorFailure {
            message: "No JWK was present in the trust chain JWT signature".to_string(),
            payload: Some(payload),
        });
    }

    Ok(AnchorSuccess {
        payload,
        jwks: signature.jwks.clone(),
    })
}

fn decode_payload(payload: &str) -> Result<Value> {
    let bytes = Base64UrlUnpadded::decode_vec(payload)
        .map_err(|e| anyhow::anyhow!("issue decoding statement payload: {e}"))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| anyhow::anyhow!("statement payload is not JSON: {e}"))
}

fn error_message(err: &anyhow::Error) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        "unspecified".to_string()
    } else {
        message
    }
}

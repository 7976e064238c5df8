//! Certificate fixtures and a structural chain validator.
//!
//! The fixtures are a P-256 root CA and a leaf it issued, valid well into
//! the 2040s. The validator checks validity windows and issuer/subject
//! linkage against the supplied anchors; it does not verify signatures.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use veridian_core::x509::{chain_from_pem, parse_chain};
use veridian_resolver::provider::{ChainValidationResult, ChainValidator};

/// PEM of the fixture root CA (P-256).
pub const CA_PEM: &str = include_str!("../data/ca.pem");

/// PEM of the fixture leaf certificate, issued by [`CA_PEM`].
pub const LEAF_PEM: &str = include_str!("../data/leaf.pem");

/// The fixture chain as `x5c` entries: leaf first, then the CA.
pub fn x5c_chain() -> Result<Vec<String>> {
    let mut chain = chain_from_pem(LEAF_PEM)?;
    chain.extend(chain_from_pem(CA_PEM)?);
    Ok(chain)
}

/// A chain validator for tests. `Structural` checks validity windows and
/// that the chain terminates in one of the supplied anchors; `Reject`
/// fails every chain; `Panicking` asserts it is never called.
#[derive(Clone)]
pub enum MockChainValidator {
    /// Validate validity windows and anchor linkage.
    Structural,

    /// Fail every chain with the given message.
    Reject(String),

    /// Panic when called.
    Panicking,
}

impl ChainValidator for MockChainValidator {
    async fn validate(
        &self, x5c: &[String], trust_anchors: &[String], at: DateTime<Utc>,
    ) -> Result<ChainValidationResult> {
        match self {
            Self::Panicking => panic!("chain validator must not be called"),
            Self::Reject(message) => Ok(ChainValidationResult::failure(message.clone())),
            Self::Structural => Ok(validate_structural(x5c, trust_anchors, at)?),
        }
    }
}

fn validate_structural(
    x5c: &[String], trust_anchors: &[String], at: DateTime<Utc>,
) -> Result<ChainValidationResult> {
    let chain = parse_chain(x5c)?;

    for cert in &chain {
        if at < cert.not_before || at > cert.not_after {
            return Ok(ChainValidationResult::failure(format!(
                "certificate {} not valid at {at}",
                cert.subject
            )));
        }
    }

    let root_issuer = &chain.last().ok_or_else(|| anyhow!("chain is empty"))?.issuer;
    for anchor in trust_anchors {
        let anchor_chain = parse_chain(&chain_from_pem(anchor)?)?;
        if anchor_chain.iter().any(|anchor_cert| &anchor_cert.subject == root_issuer) {
            return Ok(ChainValidationResult::success());
        }
    }
    Ok(ChainValidationResult::failure("chain does not terminate in a trust anchor".to_string()))
}

//! # Errors
//!
//! The resolution error taxonomy. Hard preconditions fail fast before any
//! I/O; per-unit verification failures (one anchor or certificate among
//! several) are carried as data in the result instead, so callers can make
//! partial-trust decisions.

use thiserror::Error;

/// Result type for identifier resolution.
pub type Result<T, E = Error> = anyhow::Result<T, E>;

/// Errors returned by identifier resolution.
#[derive(Error, Debug)]
pub enum Error {
    /// The identifier's shape matched no classification rule and no
    /// explicit method was given.
    #[error("unable to classify identifier: {0}")]
    Classification(String),

    /// The classified method has no resolver branch in this context.
    #[error("no resolver for method `{0}`")]
    UnsupportedMethod(String),

    /// Managed resolution found no local key matching the identifier.
    #[error("not found: {0}")]
    NotFound(String),

    /// A required collaborator capability or option is missing.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The identifier violates a structural precondition, e.g. an
    /// unparsable DID string.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A collaborator failed in a way that is not attributable to a single
    /// verifiable unit.
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<Self>() {
            Ok(err) => err,
            Err(err) => {
                let stack = err.chain().fold(String::new(), |cause, e| format!("{cause} -> {e}"));
                Self::Other(stack.trim_start_matches(" -> ").to_string())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use anyhow::{Context as _, anyhow};

    use super::*;

    // Context added by helpers must survive the boundary conversion.
    #[test]
    fn anyhow_context_retained() {
        let result: anyhow::Result<()> =
            Err(anyhow!("connection refused")).context("fetching issuer metadata");
        let err = Error::from(result.unwrap_err());
        let Error::Other(message) = err else {
            panic!("expected Other");
        };
        assert_eq!(message, "fetching issuer metadata -> connection refused");
    }

    // A typed error wrapped in anyhow must come back out as itself.
    #[test]
    fn downcast_preserves_variant() {
        let wrapped = anyhow::Error::new(Error::NotFound("kid-1".to_string()));
        let err = Error::from(wrapped);
        assert!(matches!(err, Error::NotFound(kid) if kid == "kid-1"));
    }
}

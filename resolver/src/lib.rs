//! An engine for resolving heterogeneous cryptographic identifiers
//! (DIDs, raw key ids, JWKs, X.509 certificate chains, COSE keys, OpenID
//! Federation entity ids) into a uniform result usable for signing
//! (managed identifiers) or signature verification (external
//! identifiers).
//!
//! The engine is a stateless transformation layer. Key custody, DID
//! resolution, JWS verification, trust-chain resolution, and certificate
//! validation are capability traits (see [`provider`]) implemented by
//! library users; the engine classifies the identifier, drives the
//! matching resolution, and aggregates partial failures into the result.

pub mod provider;

mod classify;
mod error;
mod external;
mod federation;
mod managed;
mod types;

/// Re-export key material types.
pub mod core {
    pub use veridian_core::*;
}

pub use self::classify::{
    WELL_KNOWN_CREDENTIAL_ISSUER, WELL_KNOWN_OPENID_CONFIGURATION, classify,
};
pub use self::error::{Error, Result};
pub use self::external::*;
pub use self::managed::*;
pub use self::types::*;

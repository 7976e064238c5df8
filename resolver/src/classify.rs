//! # Identifier Classification
//!
//! Pure classification of an identifier value to exactly one resolution
//! method. An explicit method always wins; otherwise the method is derived
//! from the identifier's shape using a single documented precedence,
//! applied identically in managed and external contexts.

use serde_json::Value;

use crate::error::Error;
use crate::types::{Identifier, Method};

/// Path suffix of an OpenID Connect discovery document.
pub const WELL_KNOWN_OPENID_CONFIGURATION: &str = "/.well-known/openid-configuration";

/// Path suffix of an OID4VCI credential issuer metadata document.
pub const WELL_KNOWN_CREDENTIAL_ISSUER: &str = "/.well-known/openid-credential-issuer";

/// Classify an identifier to its resolution method.
///
/// Total and deterministic: given the identifier's shape, the explicit
/// method, and whether trust anchors were supplied, exactly one method
/// applies. String precedence: `did:` prefix, then the well-known HTTPS
/// suffixes, then entity id (HTTPS with trust anchors supplied), then key
/// id as the fallback.
#[must_use]
pub fn classify(identifier: &Identifier, method: Option<Method>, has_trust_anchors: bool) -> Method {
    if let Some(method) = method {
        return method;
    }

    match identifier {
        Identifier::Chain(_) => Method::X5c,
        Identifier::CoseKey(_) => Method::CoseKey,
        Identifier::Jwk(_) => Method::Jwk,
        Identifier::Key(_) => Method::Key,
        Identifier::DidIdentifier(_) => Method::Did,
        Identifier::Text(text) => classify_text(text, has_trust_anchors),
    }
}

fn classify_text(text: &str, has_trust_anchors: bool) -> Method {
    if text.starts_with("did:") {
        return Method::Did;
    }
    if text.starts_with("https://") {
        if text.ends_with(WELL_KNOWN_OPENID_CONFIGURATION) {
            return Method::OidcDiscovery;
        }
        if text.ends_with("jwks.json") {
            return Method::JwksUrl;
        }
        if text.ends_with(WELL_KNOWN_CREDENTIAL_ISSUER) {
            return Method::Oid4vciIssuer;
        }
        if has_trust_anchors {
            return Method::EntityId;
        }
    }
    Method::Kid
}

impl Identifier {
    /// Map a loosely-typed JSON value into the identifier union.
    ///
    /// Object precedence: array of strings ⇒ certificate chain; `kty` ⇒
    /// JWK, unless the object is COSE-shaped (numeric `kty`, or `baseIV`/
    /// `x5chain` without `x5c`) ⇒ COSE key; `kid` + `publicKeyHex` ⇒ key;
    /// `did` + `keys` ⇒ DID identifier. Strings pass through unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Classification`] when no rule matches, and
    /// [`Error::InvalidIdentifier`] when a rule matches but the value does
    /// not deserialize as that shape.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::String(text) => Ok(Self::Text(text)),
            Value::Array(_) => {
                let chain = serde_json::from_value(value).map_err(|e| {
                    Error::InvalidIdentifier(format!("certificate chain entries must be base64 strings: {e}"))
                })?;
                Ok(Self::Chain(chain))
            }
            Value::Object(ref map) => {
                if map.contains_key("kty") {
                    let cose_shaped = map.get("kty").is_some_and(Value::is_number)
                        || ((map.contains_key("baseIV") || map.contains_key("x5chain"))
                            && !map.contains_key("x5c"));
                    if cose_shaped {
                        let key = serde_json::from_value(value).map_err(|e| {
                            Error::InvalidIdentifier(format!("malformed COSE key: {e}"))
                        })?;
                        return Ok(Self::CoseKey(key));
                    }
                    let jwk = serde_json::from_value(value)
                        .map_err(|e| Error::InvalidIdentifier(format!("malformed JWK: {e}")))?;
                    return Ok(Self::Jwk(jwk));
                }
                if map.contains_key("kid") && map.contains_key("publicKeyHex") {
                    let key = serde_json::from_value(value)
                        .map_err(|e| Error::InvalidIdentifier(format!("malformed key: {e}")))?;
                    return Ok(Self::Key(key));
                }
                if map.contains_key("did") && map.contains_key("keys") {
                    let identifier = serde_json::from_value(value).map_err(|e| {
                        Error::InvalidIdentifier(format!("malformed DID identifier: {e}"))
                    })?;
                    return Ok(Self::DidIdentifier(identifier));
                }
                Err(Error::Classification(
                    "object matches no identifier shape (expected a JWK, COSE key, key, or DID identifier)"
                        .to_string(),
                ))
            }
            other => Err(Error::Classification(format!(
                "{} is not an identifier",
                match other {
                    Value::Null => "null",
                    Value::Bool(_) => "a boolean",
                    Value::Number(_) => "a number",
                    _ => "the value",
                }
            ))),
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use veridian_core::jwk::{Curve, KeyType, PublicKeyJwk};

    use super::*;

    fn text(s: &str) -> Identifier {
        Identifier::Text(s.to_string())
    }

    #[test]
    fn explicit_method_wins() {
        let identifier = text("anything");
        assert_eq!(classify(&identifier, Some(Method::EntityId), false), Method::EntityId);
    }

    #[test]
    fn string_precedence() {
        assert_eq!(classify(&text("did:jwk:abc"), None, false), Method::Did);
        assert_eq!(
            classify(&text("https://issuer.example.com/.well-known/openid-configuration"), None, false),
            Method::OidcDiscovery
        );
        assert_eq!(
            classify(&text("https://issuer.example.com/jwks.json"), None, false),
            Method::JwksUrl
        );
        assert_eq!(
            classify(
                &text("https://issuer.example.com/.well-known/openid-credential-issuer"),
                None,
                false
            ),
            Method::Oid4vciIssuer
        );
        // a plain https URL is an entity id only when anchors are supplied
        assert_eq!(classify(&text("https://entity.example.com"), None, true), Method::EntityId);
        assert_eq!(classify(&text("https://entity.example.com"), None, false), Method::Kid);
        // fallback
        assert_eq!(classify(&text("some-opaque-kid"), None, false), Method::Kid);
    }

    #[test]
    fn shape_precedence() {
        let jwk = Identifier::Jwk(PublicKeyJwk {
            kty: KeyType::Ec,
            crv: Some(Curve::P256),
            ..PublicKeyJwk::default()
        });
        assert_eq!(classify(&jwk, None, false), Method::Jwk);
        assert_eq!(classify(&Identifier::Chain(vec![]), None, false), Method::X5c);
    }

    #[test]
    fn value_array_is_chain() {
        let identifier = Identifier::from_value(json!(["MIIB...", "MIIC..."])).expect("should map");
        assert!(matches!(identifier, Identifier::Chain(chain) if chain.len() == 2));
    }

    #[test]
    fn value_kty_is_jwk() {
        let identifier = Identifier::from_value(json!({
            "kty": "OKP", "crv": "Ed25519", "x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"
        }))
        .expect("should map");
        assert!(matches!(identifier, Identifier::Jwk(_)));
    }

    // numeric labels or baseIV/x5chain without x5c take the COSE branch
    #[test]
    fn value_cose_shapes() {
        let numeric = Identifier::from_value(json!({
            "kty": 2, "crv": 1,
            "x": "bsYYV0PGQ7IWJqgh84EqCX81UufxT5JNvQfZJpGHOzw",
            "y": "AbuqkezCxhGlUjyiw7K3uUVAlW633R4-iipdiLG9c_g"
        }))
        .expect("should map");
        assert!(matches!(numeric, Identifier::CoseKey(_)));

        let base_iv = Identifier::from_value(json!({
            "kty": 2, "crv": 1, "baseIV": "AAAA",
            "x": "bsYYV0PGQ7IWJqgh84EqCX81UufxT5JNvQfZJpGHOzw",
            "y": "AbuqkezCxhGlUjyiw7K3uUVAlW633R4-iipdiLG9c_g"
        }))
        .expect("should map");
        assert!(matches!(base_iv, Identifier::CoseKey(_)));
    }

    #[test]
    fn value_key_and_did_shapes() {
        let key = Identifier::from_value(json!({
            "kid": "key-1", "type": "Ed25519",
            "publicKeyHex": "d6a98018ab70aab7d54bfed3c964073a0ee172f3daa62325adf021a68f707511"
        }))
        .expect("should map");
        assert!(matches!(key, Identifier::Key(_)));

        let did = Identifier::from_value(json!({
            "did": "did:example:alice", "keys": []
        }))
        .expect("should map");
        assert!(matches!(did, Identifier::DidIdentifier(_)));
    }

    #[test]
    fn value_unmatched_object_fails() {
        let err = Identifier::from_value(json!({"name": "alice"})).expect_err("should not map");
        assert!(matches!(err, Error::Classification(_)));
        let err = Identifier::from_value(json!(42)).expect_err("should not map");
        assert!(matches!(err, Error::Classification(_)));
    }
}

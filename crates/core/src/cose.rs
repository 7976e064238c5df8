//! # COSE Keys
//!
//! Types for working with CBOR Object Signing and Encryption (COSE) keys
//! as defined in [RFC9052]. A COSE key is the CBOR analogue of a JWK: the
//! same key material under integer labels. Keys arrive either as a JSON
//! object using the integer label values, or as a CBOR-encoded map.
//!
//! Only key normalization is supported here. COSE signing and signature
//! verification are out of scope.
//!
//! [RFC9052]: https://www.rfc-editor.org/rfc/rfc9052.html#name-key-objects

use anyhow::{Result, anyhow, bail};
use base64ct::{Base64UrlUnpadded, Encoding};
use ciborium::Value;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::jwk::{Curve, KeyType, PublicKeyJwk};

const KTY: i128 = 1;
const KID: i128 = 2;
const BASE_IV: i128 = 5;
const CRV: i128 = -1;
const X: i128 = -2;
const Y: i128 = -3;

/// Implements `COSE_Key` as defined in [RFC9052].
///
/// [RFC9052]: https://www.rfc-editor.org/rfc/rfc9052.html#name-key-objects
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CoseKey {
    /// Key type.
    pub kty: CoseKeyType,

    /// Key identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Curve.
    pub crv: CoseCurve,

    /// Public key X coordinate, base64url.
    pub x: String,

    /// Public key Y coordinate, base64url. Not used by octet key pairs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    /// Base IV to be xor-ed with partial IVs.
    #[serde(rename = "baseIV")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_iv: Option<String>,

    /// X.509 certificate chain (base64 DER, leaf first) bound to the key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x5chain: Option<Vec<String>>,
}

impl CoseKey {
    /// Decode a COSE key from a CBOR map.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a CBOR map or a required
    /// member is missing or of the wrong type.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let value: Value =
            ciborium::from_reader(data).map_err(|e| anyhow!("issue reading CBOR: {e}"))?;
        let Value::Map(entries) = value else {
            bail!("COSE key must be a CBOR map");
        };

        let mut kty = None;
        let mut kid = None;
        let mut crv = None;
        let mut x = None;
        let mut y = None;
        let mut base_iv = None;

        for (label, value) in entries {
            let Some(label) = label.as_integer() else {
                continue;
            };
            match i128::from(label) {
                KTY => kty = Some(int_member(&value, "kty")?),
                KID => {
                    kid = Some(match value {
                        Value::Bytes(b) => String::from_utf8_lossy(&b).into_owned(),
                        Value::Text(t) => t,
                        _ => bail!("COSE key `kid` must be bytes or text"),
                    });
                }
                CRV => crv = Some(int_member(&value, "crv")?),
                X => x = Some(bytes_member(&value, "x")?),
                Y => y = Some(bytes_member(&value, "y")?),
                BASE_IV => base_iv = Some(bytes_member(&value, "baseIV")?),
                _ => {}
            }
        }

        let kty = match kty.ok_or_else(|| anyhow!("COSE key has no `kty` member"))? {
            1 => CoseKeyType::Okp,
            2 => CoseKeyType::Ec2,
            4 => CoseKeyType::Symmetric,
            other => bail!("unsupported COSE key type {other}"),
        };
        let crv = match crv.ok_or_else(|| anyhow!("COSE key has no `crv` member"))? {
            1 => CoseCurve::P256,
            2 => CoseCurve::P384,
            4 => CoseCurve::X25519,
            6 => CoseCurve::Ed25519,
            8 => CoseCurve::Secp256k1,
            other => bail!("unsupported COSE curve {other}"),
        };

        Ok(Self {
            kty,
            kid,
            crv,
            x: x.ok_or_else(|| anyhow!("COSE key has no `x` member"))?,
            y,
            base_iv,
            x5chain: None,
        })
    }

    /// Convert the COSE key into its JWK representation.
    ///
    /// The mapping is structural; thumbprints computed over the JWK form
    /// are therefore invariant across the two representations.
    ///
    /// # Errors
    ///
    /// Returns an error if the key type and curve combination is invalid.
    pub fn to_jwk(&self) -> Result<PublicKeyJwk> {
        let (kty, crv) = match (self.kty, self.crv) {
            (CoseKeyType::Okp, CoseCurve::Ed25519) => (KeyType::Okp, Curve::Ed25519),
            (CoseKeyType::Okp, CoseCurve::X25519) => (KeyType::Okp, Curve::X25519),
            (CoseKeyType::Ec2, CoseCurve::P256) => (KeyType::Ec, Curve::P256),
            (CoseKeyType::Ec2, CoseCurve::P384) => (KeyType::Ec, Curve::P384),
            (CoseKeyType::Ec2, CoseCurve::Secp256k1) => (KeyType::Ec, Curve::Secp256k1),
            (kty, crv) => bail!("invalid COSE key type/curve combination: {kty:?}/{crv:?}"),
        };
        if kty == KeyType::Ec && self.y.is_none() {
            bail!("EC2 COSE key has no `y` member");
        }

        Ok(PublicKeyJwk {
            kid: self.kid.clone(),
            kty,
            crv: Some(crv),
            x: Some(self.x.clone()),
            y: self.y.clone(),
            x5c: self.x5chain.clone(),
            ..PublicKeyJwk::default()
        })
    }

    /// Compute the RFC 7638 thumbprint of the key via its JWK mapping.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be mapped to a JWK.
    pub fn thumbprint(&self) -> Result<String> {
        self.to_jwk()?.thumbprint()
    }
}

fn int_member(value: &Value, member: &str) -> Result<i128> {
    value
        .as_integer()
        .map(i128::from)
        .ok_or_else(|| anyhow!("COSE key `{member}` must be an integer"))
}

fn bytes_member(value: &Value, member: &str) -> Result<String> {
    let Value::Bytes(bytes) = value else {
        bail!("COSE key `{member}` must be a byte string");
    };
    Ok(Base64UrlUnpadded::encode_string(bytes))
}

/// COSE key type, by registered label value.
#[derive(Clone, Copy, Debug, Deserialize_repr, Serialize_repr, PartialEq, Eq)]
#[repr(i64)]
pub enum CoseKeyType {
    /// Octet key pair (Edwards curve)
    Okp = 1,

    /// Elliptic curve key pair
    Ec2 = 2,

    /// Symmetric key
    Symmetric = 4,
}

/// COSE curve, by registered label value.
#[derive(Clone, Copy, Debug, Deserialize_repr, Serialize_repr, PartialEq, Eq)]
#[repr(i64)]
pub enum CoseCurve {
    /// NIST P-256
    P256 = 1,

    /// NIST P-384
    P384 = 2,

    /// X25519 key agreement curve
    X25519 = 4,

    /// Ed25519 signature curve
    Ed25519 = 6,

    /// secp256k1 (Koblitz)
    Secp256k1 = 8,
}

#[cfg(test)]
mod test {
    use super::*;

    const X_B64: &str = "bsYYV0PGQ7IWJqgh84EqCX81UufxT5JNvQfZJpGHOzw";
    const Y_B64: &str = "AbuqkezCxhGlUjyiw7K3uUVAlW633R4-iipdiLG9c_g";

    fn p256_key() -> CoseKey {
        CoseKey {
            kty: CoseKeyType::Ec2,
            kid: None,
            crv: CoseCurve::P256,
            x: X_B64.to_string(),
            y: Some(Y_B64.to_string()),
            base_iv: None,
            x5chain: None,
        }
    }

    // A COSE key and its JWK mapping must agree on the thumbprint.
    #[test]
    fn thumbprint_representation_invariant() {
        let cose = p256_key();
        let jwk = cose.to_jwk().expect("should convert");
        assert_eq!(
            cose.thumbprint().expect("should compute"),
            jwk.thumbprint().expect("should compute")
        );
        assert_eq!(
            cose.thumbprint().expect("should compute"),
            "5m6e38txv4oeE7Cyp1YklamONJ2NhC2lLUAI6LH5GOc"
        );
    }

    #[test]
    fn from_cbor() {
        let x = Base64UrlUnpadded::decode_vec(X_B64).expect("should decode");
        let y = Base64UrlUnpadded::decode_vec(Y_B64).expect("should decode");

        let map = Value::Map(vec![
            (Value::Integer(1.into()), Value::Integer(2.into())),
            (Value::Integer((-1).into()), Value::Integer(1.into())),
            (Value::Integer((-2).into()), Value::Bytes(x)),
            (Value::Integer((-3).into()), Value::Bytes(y)),
        ]);
        let mut data = Vec::new();
        ciborium::into_writer(&map, &mut data).expect("should write CBOR");

        let cose = CoseKey::from_slice(&data).expect("should decode COSE key");
        assert_eq!(cose, p256_key());
    }

    #[test]
    fn json_shape() {
        let json = serde_json::json!({
            "kty": 2,
            "crv": 1,
            "x": X_B64,
            "y": Y_B64,
            "baseIV": "AAAA"
        });
        let cose: CoseKey = serde_json::from_value(json).expect("should deserialize");
        assert_eq!(cose.kty, CoseKeyType::Ec2);
        assert_eq!(cose.base_iv.as_deref(), Some("AAAA"));
    }

    #[test]
    fn okp_requires_matching_curve() {
        let mismatched = CoseKey {
            kty: CoseKeyType::Okp,
            ..p256_key()
        };
        mismatched.to_jwk().expect_err("OKP with P-256 curve should fail");
    }
}

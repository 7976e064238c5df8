//! # JSON Web Key (JWK)
//!
//! A JWK ([RFC7517]) is a JSON representation of a cryptographic key.
//! Additionally, a JWK Set (JWKS) is used to represent a set of JWKs.
//!
//! The thumbprint ([RFC7638]) of a JWK is the SHA-256 hash of the key's
//! required members in lexicographic order, base64url-encoded. It is a
//! content-addressed key identifier: the same key always produces the same
//! thumbprint, regardless of the representation it was resolved from.
//!
//! [RFC7517]: https://www.rfc-editor.org/rfc/rfc7517
//! [RFC7638]: https://www.rfc-editor.org/rfc/rfc7638

use anyhow::{Result, anyhow, bail};
use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

/// Simplified JSON Web Key (JWK) key structure.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
pub struct PublicKeyJwk {
    /// Key identifier.
    /// For example, "_Qq0UL2Fq651Q0Fjd6TvnYE-faHiOpRlPVQcY_-tA4A".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Key type.
    pub kty: KeyType,

    /// Cryptographic curve type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<Curve>,

    /// X coordinate (or the public key bytes for octet key pairs).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// Y coordinate. Not used by octet key pairs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    /// Symmetric key value. Only used when `kty` is `oct`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,

    /// Algorithm intended for use with the key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Use of the key.
    #[serde(rename = "use")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_: Option<KeyUse>,

    /// X.509 certificate chain (base64 DER, leaf first) bound to the key,
    /// as used in JOSE headers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,
}

impl PublicKeyJwk {
    /// Compute the RFC 7638 thumbprint of the key.
    ///
    /// # Errors
    ///
    /// Returns an error if a member required by the key's type is missing.
    pub fn thumbprint(&self) -> Result<String> {
        let crv = || self.crv.ok_or_else(|| anyhow!("JWK has no `crv` member"));
        let x = || self.x.as_deref().ok_or_else(|| anyhow!("JWK has no `x` member"));

        // required members of each key type, in lexicographic order
        // (serde_json maps are ordered by key)
        let required = match self.kty {
            KeyType::Ec => {
                let y = self.y.as_deref().ok_or_else(|| anyhow!("JWK has no `y` member"))?;
                json!({"crv": crv()?, "kty": "EC", "x": x()?, "y": y})
            }
            KeyType::Okp => json!({"crv": crv()?, "kty": "OKP", "x": x()?}),
            KeyType::Oct => {
                let k = self.k.as_deref().ok_or_else(|| anyhow!("JWK has no `k` member"))?;
                json!({"k": k, "kty": "oct"})
            }
        };

        let canonical = serde_json::to_vec(&required)?;
        let digest = Sha256::digest(&canonical);
        Ok(Base64UrlUnpadded::encode_string(&digest))
    }

    /// Build a JWK from a hex-encoded public key.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not valid hex or is not a valid
    /// encoding of a point on the stated curve.
    pub fn from_public_key_hex(crv: Curve, public_key_hex: &str) -> Result<Self> {
        let bytes = hex::decode(public_key_hex)
            .map_err(|e| anyhow!("issue decoding public key hex: {e}"))?;
        Self::from_bytes(crv, &bytes)
    }

    /// Build a JWK from raw public key bytes.
    ///
    /// Octet key pairs expect the raw 32-byte public key. Elliptic curve
    /// keys accept SEC1 compressed or uncompressed points, or raw `x || y`
    /// coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid encoding of a point on
    /// the stated curve.
    pub fn from_bytes(crv: Curve, bytes: &[u8]) -> Result<Self> {
        match crv {
            Curve::Ed25519 | Curve::X25519 => {
                if bytes.len() != 32 {
                    bail!("{crv} public keys are 32 bytes, got {}", bytes.len());
                }
                Ok(Self {
                    kty: KeyType::Okp,
                    crv: Some(crv),
                    x: Some(Base64UrlUnpadded::encode_string(bytes)),
                    ..Self::default()
                })
            }
            Curve::P256 | Curve::P384 | Curve::Secp256k1 => {
                let (x, y) = ec_point(crv, bytes)?;
                Ok(Self {
                    kty: KeyType::Ec,
                    crv: Some(crv),
                    x: Some(Base64UrlUnpadded::encode_string(&x)),
                    y: Some(Base64UrlUnpadded::encode_string(&y)),
                    ..Self::default()
                })
            }
        }
    }
}

/// Recover affine coordinates from a SEC1-encoded or raw `x || y` point.
fn ec_point(crv: Curve, bytes: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let field_len = match crv {
        Curve::P384 => 48,
        _ => 32,
    };

    // raw x || y
    if bytes.len() == field_len * 2 {
        return Ok((bytes[..field_len].to_vec(), bytes[field_len..].to_vec()));
    }
    // SEC1 uncompressed
    if bytes.len() == field_len * 2 + 1 && bytes[0] == 0x04 {
        return Ok((bytes[1..=field_len].to_vec(), bytes[field_len + 1..].to_vec()));
    }

    // SEC1 compressed: decompression requires curve arithmetic
    match crv {
        Curve::P256 => {
            use p256::elliptic_curve::sec1::ToEncodedPoint;
            let key = p256::PublicKey::from_sec1_bytes(bytes)
                .map_err(|e| anyhow!("invalid P-256 point: {e}"))?;
            let point = key.to_encoded_point(false);
            let x = point.x().ok_or_else(|| anyhow!("missing x coordinate"))?;
            let y = point.y().ok_or_else(|| anyhow!("missing y coordinate"))?;
            Ok((x.to_vec(), y.to_vec()))
        }
        Curve::Secp256k1 => {
            use k256::elliptic_curve::sec1::ToEncodedPoint;
            let key = k256::PublicKey::from_sec1_bytes(bytes)
                .map_err(|e| anyhow!("invalid secp256k1 point: {e}"))?;
            let point = key.to_encoded_point(false);
            let x = point.x().ok_or_else(|| anyhow!("missing x coordinate"))?;
            let y = point.y().ok_or_else(|| anyhow!("missing y coordinate"))?;
            Ok((x.to_vec(), y.to_vec()))
        }
        _ => bail!("unsupported {crv} point encoding ({} bytes)", bytes.len()),
    }
}

/// Cryptographic key type.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
pub enum KeyType {
    /// Octet key pair (Edwards curve)
    #[default]
    #[serde(rename = "OKP")]
    Okp,

    /// Elliptic curve key pair
    #[serde(rename = "EC")]
    Ec,

    /// Octet string
    #[serde(rename = "oct")]
    Oct,
}

/// Cryptographic curve type.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, Eq, PartialEq, Hash)]
pub enum Curve {
    /// Ed25519 signature curve
    #[default]
    Ed25519,

    /// X25519 key agreement curve
    X25519,

    /// NIST P-256
    #[serde(rename = "P-256")]
    P256,

    /// NIST P-384
    #[serde(rename = "P-384")]
    P384,

    /// secp256k1 (Koblitz)
    #[serde(rename = "secp256k1", alias = "ES256K")]
    Secp256k1,
}

impl std::fmt::Display for Curve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ed25519 => write!(f, "Ed25519"),
            Self::X25519 => write!(f, "X25519"),
            Self::P256 => write!(f, "P-256"),
            Self::P384 => write!(f, "P-384"),
            Self::Secp256k1 => write!(f, "secp256k1"),
        }
    }
}

/// The intended usage of the public `KeyType`.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum KeyUse {
    /// Public key is to be used for signature verification
    #[default]
    #[serde(rename = "sig")]
    Signature,

    /// Public key is to be used for encryption
    #[serde(rename = "enc")]
    Encryption,
}

/// A set of JWKs.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Jwks {
    /// The set of public key JWKs
    pub keys: Vec<PublicKeyJwk>,
}

/// A JWK paired with its RFC 7638 thumbprint. Every resolution result
/// carries its key material in this form.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JwkInfo {
    /// The public key.
    pub jwk: PublicKeyJwk,

    /// The key's RFC 7638 thumbprint.
    pub jwk_thumbprint: String,
}

impl TryFrom<PublicKeyJwk> for JwkInfo {
    type Error = anyhow::Error;

    fn try_from(jwk: PublicKeyJwk) -> Result<Self> {
        let jwk_thumbprint = jwk.thumbprint()?;
        Ok(Self { jwk, jwk_thumbprint })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // RFC 8037 appendix A.3 key and its RFC 7638 thumbprint.
    #[test]
    fn okp_thumbprint() {
        let jwk = PublicKeyJwk {
            kty: KeyType::Okp,
            crv: Some(Curve::Ed25519),
            x: Some("11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo".to_string()),
            ..PublicKeyJwk::default()
        };
        let thumbprint = jwk.thumbprint().expect("should compute thumbprint");
        assert_eq!(thumbprint, "kPrK_qmxVWaYVA9wwBF6Iuo3vVzz7TxHCTwXBygrS4k");
    }

    // `kid` and `use` members must not affect the thumbprint.
    #[test]
    fn thumbprint_ignores_optional_members() {
        let bare = PublicKeyJwk {
            kty: KeyType::Okp,
            crv: Some(Curve::Ed25519),
            x: Some("11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo".to_string()),
            ..PublicKeyJwk::default()
        };
        let decorated = PublicKeyJwk {
            kid: Some("key-0".to_string()),
            use_: Some(KeyUse::Signature),
            ..bare.clone()
        };
        assert_eq!(
            bare.thumbprint().expect("should compute"),
            decorated.thumbprint().expect("should compute")
        );
    }

    const UNCOMPRESSED_HEX: &str = "046ec6185743c643b21626a821f3812a097f3552e7f14f924dbd07d92691873b3c01bbaa91ecc2c611a5523ca2c3b2b7b94540956eb7dd1e3e8a2a5d88b1bd73f8";
    const COMPRESSED_HEX: &str = "026ec6185743c643b21626a821f3812a097f3552e7f14f924dbd07d92691873b3c";

    // The same P-256 key in compressed and uncompressed form must
    // normalize to the same JWK.
    #[test]
    fn point_encodings_agree() {
        let uncompressed = PublicKeyJwk::from_public_key_hex(Curve::P256, UNCOMPRESSED_HEX)
            .expect("should convert uncompressed");
        let compressed = PublicKeyJwk::from_public_key_hex(Curve::P256, COMPRESSED_HEX)
            .expect("should convert compressed");

        assert_eq!(uncompressed, compressed);
        assert_eq!(uncompressed.x.as_deref(), Some("bsYYV0PGQ7IWJqgh84EqCX81UufxT5JNvQfZJpGHOzw"));
        assert_eq!(uncompressed.y.as_deref(), Some("AbuqkezCxhGlUjyiw7K3uUVAlW633R4-iipdiLG9c_g"));
    }

    #[test]
    fn raw_coordinates() {
        let raw_hex = &UNCOMPRESSED_HEX[2..];
        let raw = PublicKeyJwk::from_public_key_hex(Curve::P256, raw_hex).expect("should convert");
        let sec1 = PublicKeyJwk::from_public_key_hex(Curve::P256, UNCOMPRESSED_HEX)
            .expect("should convert");
        assert_eq!(raw, sec1);
    }

    #[test]
    fn ed25519_key_size() {
        let err = PublicKeyJwk::from_public_key_hex(Curve::Ed25519, "0011")
            .expect_err("short key should fail");
        assert!(err.to_string().contains("32 bytes"));
    }
}

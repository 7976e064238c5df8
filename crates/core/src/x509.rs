//! # X.509 Certificate Chains
//!
//! Decoding of `x5c` certificate chains (ordered, leaf first, base64 DER
//! as used in JOSE headers) and extraction of each certificate's subject
//! public key as a JWK. Chain *validation* (signatures, path building,
//! revocation) is a collaborator capability and is not performed here.

use anyhow::{Context, Result, anyhow, bail};
use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use const_oid::ObjectIdentifier;
use const_oid::db::{rfc5912, rfc8410};
use serde::{Deserialize, Serialize};
use x509_cert::Certificate;
use x509_cert::der::{Decode, Encode};

use crate::jwk::{Curve, PublicKeyJwk};

const SECP_256_K_1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.10");

/// A decoded certificate chain entry: the raw entry, the certificate's
/// subject public key as a JWK, and enough of the TBS certificate to
/// present to callers making trust decisions.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedCertificate {
    /// The chain entry: base64-encoded DER.
    pub der: String,

    /// The certificate subject.
    pub subject: String,

    /// The certificate issuer.
    pub issuer: String,

    /// Start of the validity period.
    pub not_before: DateTime<Utc>,

    /// End of the validity period.
    pub not_after: DateTime<Utc>,

    /// The subject public key as a JWK.
    pub jwk: PublicKeyJwk,
}

/// Decode an `x5c` chain into certificates.
///
/// # Errors
///
/// Returns an error if any entry is not base64-encoded DER.
pub fn decode_x5c(x5c: &[String]) -> Result<Vec<Certificate>> {
    x5c.iter()
        .enumerate()
        .map(|(i, entry)| {
            let der = Base64::decode_vec(entry)
                .map_err(|e| anyhow!("issue decoding x5c[{i}] base64: {e}"))?;
            Certificate::from_der(&der).map_err(|e| anyhow!("issue decoding x5c[{i}] DER: {e}"))
        })
        .collect()
}

/// Decode and summarize an `x5c` chain, extracting each certificate's
/// subject public key.
///
/// # Errors
///
/// Returns an error if an entry cannot be decoded or a subject public key
/// is of an unsupported algorithm.
pub fn parse_chain(x5c: &[String]) -> Result<Vec<ParsedCertificate>> {
    let certificates = decode_x5c(x5c)?;
    x5c.iter()
        .zip(&certificates)
        .map(|(entry, cert)| {
            let tbs = &cert.tbs_certificate;
            Ok(ParsedCertificate {
                der: entry.clone(),
                subject: tbs.subject.to_string(),
                issuer: tbs.issuer.to_string(),
                not_before: DateTime::from(tbs.validity.not_before.to_system_time()),
                not_after: DateTime::from(tbs.validity.not_after.to_system_time()),
                jwk: cert_jwk(cert)?,
            })
        })
        .collect()
}

/// Convert one or more concatenated PEM certificates into `x5c` entries
/// (base64 DER, input order preserved).
///
/// # Errors
///
/// Returns an error if the input is not valid PEM.
pub fn chain_from_pem(pem: &str) -> Result<Vec<String>> {
    let certificates = Certificate::load_pem_chain(pem.as_bytes())
        .map_err(|e| anyhow!("issue loading PEM chain: {e}"))?;
    if certificates.is_empty() {
        bail!("no certificates found in PEM input");
    }
    certificates
        .iter()
        .map(|cert| {
            let der = cert.to_der().context("re-encoding certificate")?;
            Ok(Base64::encode_string(&der))
        })
        .collect()
}

/// Extract a certificate's subject public key as a JWK.
///
/// Supported algorithms: EC (P-256, P-384, secp256k1) and Ed25519.
///
/// # Errors
///
/// Returns an error if the subject public key algorithm is unsupported.
pub fn cert_jwk(certificate: &Certificate) -> Result<PublicKeyJwk> {
    let spki = &certificate.tbs_certificate.subject_public_key_info;
    let key_bytes = spki
        .subject_public_key
        .as_bytes()
        .ok_or_else(|| anyhow!("subject public key has unused bits"))?;

    match spki.algorithm.oid {
        rfc5912::ID_EC_PUBLIC_KEY => {
            let params = spki
                .algorithm
                .parameters
                .as_ref()
                .ok_or_else(|| anyhow!("EC public key has no curve parameters"))?;
            let curve_oid: ObjectIdentifier =
                params.decode_as().map_err(|e| anyhow!("issue decoding curve OID: {e}"))?;
            let crv = match curve_oid {
                rfc5912::SECP_256_R_1 => Curve::P256,
                rfc5912::SECP_384_R_1 => Curve::P384,
                SECP_256_K_1 => Curve::Secp256k1,
                oid => bail!("unsupported EC curve: {oid}"),
            };
            PublicKeyJwk::from_bytes(crv, key_bytes)
        }
        rfc8410::ID_ED_25519 => PublicKeyJwk::from_bytes(Curve::Ed25519, key_bytes),
        oid => bail!("unsupported subject public key algorithm: {oid}"),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const LEAF_PEM: &str = "-----BEGIN CERTIFICATE-----
MIIBVzCB/gIUfDGxejLpbRec0GYdpNGeVCxV/CAwCgYIKoZIzj0EAwIwLDEYMBYG
A1UEAwwPRXhhbXBsZSBSb290IENBMRAwDgYDVQQKDAdFeGFtcGxlMB4XDTI2MDgw
NDIwMzY1OVoXDTQ2MDczMDIwMzY1OVowMTEdMBsGA1UEAwwUcmVzb2x2ZXIuZXhh
bXBsZS5jb20xEDAOBgNVBAoMB0V4YW1wbGUwWTATBgcqhkjOPQIBBggqhkjOPQMB
BwNCAARuxhhXQ8ZDshYmqCHzgSoJfzVS5/FPkk29B9kmkYc7PAG7qpHswsYRpVI8
osOyt7lFQJVut90ePooqXYixvXP4MAoGCCqGSM49BAMCA0gAMEUCIHLGi606el6H
UOnmEHsOB+cJm+JGyjpm2u3gX9lz03FVAiEApGTK71bmpxaL8jF7B+7bBG/2stbs
SR8tD4eEBeiYq3k=
-----END CERTIFICATE-----
";

    #[test]
    fn leaf_jwk_from_pem() {
        let x5c = chain_from_pem(LEAF_PEM).expect("should convert PEM");
        assert_eq!(x5c.len(), 1);

        let parsed = parse_chain(&x5c).expect("should parse chain");
        let leaf = &parsed[0];
        assert!(leaf.subject.contains("resolver.example.com"));
        assert!(leaf.issuer.contains("Example Root CA"));
        assert!(leaf.not_before < leaf.not_after);

        assert_eq!(leaf.jwk.crv, Some(Curve::P256));
        assert_eq!(leaf.jwk.x.as_deref(), Some("bsYYV0PGQ7IWJqgh84EqCX81UufxT5JNvQfZJpGHOzw"));
        assert_eq!(leaf.jwk.y.as_deref(), Some("AbuqkezCxhGlUjyiw7K3uUVAlW633R4-iipdiLG9c_g"));
    }

    #[test]
    fn rejects_garbage() {
        decode_x5c(&["not base64!".to_string()]).expect_err("should reject invalid base64");
        chain_from_pem("no pem here").expect_err("should reject invalid PEM");
    }
}

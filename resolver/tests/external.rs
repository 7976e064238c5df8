//! External Resolution Tests

use chrono::{TimeZone, Utc};
use serde_json::json;
use test_utils::certs::{CA_PEM, MockChainValidator, x5c_chain};
use test_utils::{KeyVault, Verifier, did_jwk};
use veridian_core::did::VerificationRelationship;
use veridian_core::jwk::Curve;
use veridian_resolver::{
    Error, ExternalOpts, ExternalResult, Method, resolve_external, resolve_external_cose_key,
    resolve_external_did, resolve_external_issuer, resolve_external_jwk,
    resolve_external_jwks_url, resolve_external_oidc_discovery, resolve_external_x5c,
};

fn p256_jwk() -> veridian_core::jwk::PublicKeyJwk {
    let vault = KeyVault::new();
    let key = vault.generate("remote", &Curve::P256).expect("should generate");
    key.jwk().expect("should convert")
}

// A did:jwk belonging to a remote party resolves to its document and the
// assertion-method keys, with no local custody involved.
#[tokio::test]
async fn did_document_keys() {
    let verifier = Verifier::new();
    let did = did_jwk(&p256_jwk()).expect("should encode");

    let result = resolve_external_did(ExternalOpts::new(did.clone()), &verifier)
        .await
        .expect("should resolve DID");

    assert_eq!(result.method(), Method::Did);
    let ExternalResult::Did(did_result) = &result else {
        panic!("expected a DID result");
    };
    assert_eq!(did_result.did, did);
    assert_eq!(did_result.did_parsed.method, "jwk");
    assert!(did_result.did_resolution_result.did_resolution_metadata.error.is_none());
    assert_eq!(did_result.jwks.len(), 1);
    assert!(
        did_result.did_jwks.contains_key(&VerificationRelationship::AssertionMethod),
        "keys should be grouped by relationship"
    );
}

// An unparsable DID string violates a precondition and fails
// synchronously; an unresolvable DID reports the failure inline.
#[tokio::test]
async fn did_failure_modes() {
    let verifier = Verifier::new();

    let err = resolve_external_did(ExternalOpts::new("not a did"), &verifier)
        .await
        .expect_err("should reject unparsable DID");
    assert!(matches!(err, Error::InvalidIdentifier(_)));

    let result =
        resolve_external_did(ExternalOpts::new("did:web:nowhere.example.com"), &verifier)
            .await
            .expect("resolution failures are reported inline");
    let ExternalResult::Did(did_result) = &result else {
        panic!("expected a DID result");
    };
    assert_eq!(
        did_result.did_resolution_result.did_resolution_metadata.error.as_deref(),
        Some("notFound")
    );
    assert!(did_result.jwks.is_empty());
}

// The fixture chain validates against its own CA inside the validity
// window: two certificates, two keys, no error.
#[tokio::test]
async fn x5c_valid_chain() {
    let verifier = Verifier::new();
    let chain = x5c_chain().expect("should load fixture chain");

    let opts = ExternalOpts::new(chain.clone())
        .trust_anchors([CA_PEM])
        .verification_time(Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap());
    let result = resolve_external_x5c(opts, &verifier).await.expect("should resolve chain");

    let ExternalResult::X5c(x5c_result) = &result else {
        panic!("expected an x5c result");
    };
    let verification = x5c_result.verification_result.as_ref().expect("should have verdict");
    assert!(!verification.error);
    assert_eq!(x5c_result.jwks.len(), 2);
    assert_eq!(x5c_result.certificate, chain[0]);
    assert_eq!(x5c_result.issuer_jwk.jwk, x5c_result.certificates[0].jwk);
}

// With verification disabled the validator is never consulted and no
// verdict is reported.
#[tokio::test]
async fn x5c_verify_false_skips_validator() {
    let verifier = Verifier {
        validator: MockChainValidator::Panicking,
        ..Verifier::new()
    };
    let chain = x5c_chain().expect("should load fixture chain");

    let result = resolve_external_x5c(ExternalOpts::new(chain).verify(false), &verifier)
        .await
        .expect("should resolve chain");

    let ExternalResult::X5c(x5c_result) = &result else {
        panic!("expected an x5c result");
    };
    assert!(x5c_result.verification_result.is_none());
    assert_eq!(x5c_result.jwks.len(), 2);
}

// Validation failures are data: the certificates and keys are returned
// alongside the failing verdict.
#[tokio::test]
async fn x5c_failure_is_reported_not_thrown() {
    let verifier = Verifier::new();
    let chain = x5c_chain().expect("should load fixture chain");

    // outside the validity window
    let opts = ExternalOpts::new(chain)
        .trust_anchors([CA_PEM])
        .verification_time(Utc.with_ymd_and_hms(2050, 1, 1, 0, 0, 0).unwrap());
    let result = resolve_external_x5c(opts, &verifier).await.expect("should resolve chain");

    let ExternalResult::X5c(x5c_result) = &result else {
        panic!("expected an x5c result");
    };
    let verification = x5c_result.verification_result.as_ref().expect("should have verdict");
    assert!(verification.error);
    assert!(verification.message.as_deref().is_some_and(|m| m.contains("not valid")));
    assert_eq!(x5c_result.jwks.len(), 2);
}

// A bare JWK passes through; a JWK embedding a chain cascades into chain
// verification.
#[tokio::test]
async fn jwk_pass_through_and_cascade() {
    let verifier = Verifier::new();

    let jwk = p256_jwk();
    let result = resolve_external_jwk(ExternalOpts::new(jwk.clone()), &verifier)
        .await
        .expect("should resolve JWK");
    let ExternalResult::Jwk(jwk_result) = &result else {
        panic!("expected a JWK result");
    };
    assert_eq!(jwk_result.jwk, jwk);
    assert!(jwk_result.x5c.is_none());
    assert_eq!(jwk_result.jwks.len(), 1);

    let chain = x5c_chain().expect("should load fixture chain");
    let embedded = veridian_core::jwk::PublicKeyJwk {
        x5c: Some(chain),
        ..veridian_core::x509::parse_chain(&x5c_chain().expect("should load"))
            .expect("should parse")[0]
            .jwk
            .clone()
    };
    let opts = ExternalOpts::new(embedded)
        .trust_anchors([CA_PEM])
        .verification_time(Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap());
    let result = resolve_external_jwk(opts, &verifier).await.expect("should resolve JWK");
    let ExternalResult::Jwk(jwk_result) = &result else {
        panic!("expected a JWK result");
    };
    let cascade = jwk_result.x5c.as_ref().expect("should cascade into chain verification");
    assert!(!cascade.verification_result.as_ref().expect("should have verdict").error);
}

// COSE keys convert structurally; the thumbprint matches the JWK form.
#[tokio::test]
async fn cose_key_structural() {
    let verifier = Verifier::new();
    let cose = veridian_core::cose::CoseKey {
        kty: veridian_core::cose::CoseKeyType::Ec2,
        kid: None,
        crv: veridian_core::cose::CoseCurve::P256,
        x: "bsYYV0PGQ7IWJqgh84EqCX81UufxT5JNvQfZJpGHOzw".to_string(),
        y: Some("AbuqkezCxhGlUjyiw7K3uUVAlW633R4-iipdiLG9c_g".to_string()),
        base_iv: None,
        x5chain: None,
    };

    let result = resolve_external_cose_key(ExternalOpts::new(cose.clone()), &verifier)
        .await
        .expect("should resolve COSE key");
    let ExternalResult::CoseKey(cose_result) = &result else {
        panic!("expected a COSE key result");
    };
    assert_eq!(
        cose_result.jwks[0].jwk_thumbprint,
        cose.thumbprint().expect("should compute thumbprint")
    );
}

// JWKS and discovery URLs are fetched through the fetcher capability.
#[tokio::test]
async fn url_methods() {
    const JWKS_URL: &str = "https://op.example.com/jwks.json";
    const DISCOVERY_URL: &str = "https://op.example.com/.well-known/openid-configuration";

    let verifier = Verifier::new();
    let jwk = p256_jwk();
    verifier.fetcher.add(JWKS_URL, json!({"keys": [jwk]}));
    verifier.fetcher.add(
        DISCOVERY_URL,
        json!({"issuer": "https://op.example.com", "jwks_uri": JWKS_URL}),
    );

    let result = resolve_external_jwks_url(ExternalOpts::new(JWKS_URL), &verifier)
        .await
        .expect("should resolve JWKS URL");
    assert_eq!(result.jwks().len(), 1);

    let result = resolve_external_oidc_discovery(ExternalOpts::new(DISCOVERY_URL), &verifier)
        .await
        .expect("should resolve discovery URL");
    let ExternalResult::OidcDiscovery(discovery) = &result else {
        panic!("expected a discovery result");
    };
    assert_eq!(discovery.jwks_uri.as_deref(), Some(JWKS_URL));
    assert_eq!(discovery.jwks.len(), 1);

    // classification alone routes the same URLs without a pinned method
    let classified = resolve_external(ExternalOpts::new(JWKS_URL), &verifier)
        .await
        .expect("should classify and resolve");
    assert_eq!(classified.method(), Method::JwksUrl);
}

// Issuer metadata yields the issuer's signing keys, inline or by
// reference through its JWKS.
#[tokio::test]
async fn issuer_metadata_keys() {
    const ISSUER: &str = "https://issuer.example.com";
    const JWKS_URL: &str = "https://issuer.example.com/jwks.json";

    let verifier = Verifier::new();
    let jwk = p256_jwk();
    verifier.fetcher.add(
        format!("{ISSUER}/.well-known/openid-credential-issuer"),
        json!({"credential_issuer": ISSUER, "jwks_uri": JWKS_URL}),
    );
    verifier.fetcher.add(JWKS_URL, json!({"keys": [jwk.clone()]}));

    let result = resolve_external_issuer(ExternalOpts::new(ISSUER), &verifier)
        .await
        .expect("should resolve issuer");
    let ExternalResult::Oid4vciIssuer(issuer_result) = &result else {
        panic!("expected an issuer result");
    };
    assert_eq!(issuer_result.issuer_metadata.credential_issuer, ISSUER);
    assert_eq!(issuer_result.jwks.len(), 1);
    assert_eq!(issuer_result.jwks[0].jwk, jwk);
}

// kid identifiers denote locally held keys and have no external resolver.
#[tokio::test]
async fn kid_is_unsupported_externally() {
    let verifier = Verifier::new();
    let err = resolve_external(ExternalOpts::new("opaque-kid"), &verifier)
        .await
        .expect_err("should not resolve");
    assert!(matches!(err, Error::UnsupportedMethod(_)));
}

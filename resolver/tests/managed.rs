//! Managed Resolution Tests

use serde_json::json;
use test_utils::Holder;
use veridian_core::cose::{CoseCurve, CoseKey, CoseKeyType};
use veridian_core::jwk::{Curve, KeyType};
use veridian_resolver::{
    Error, Identifier, ManagedKey, ManagedOpts, ManagedResult, Method, resolve_managed,
    resolve_managed_by_cose_key, resolve_managed_by_did, resolve_managed_by_issuer,
    resolve_managed_by_jwk, resolve_managed_by_key, resolve_managed_by_kid,
    resolve_managed_by_x5c,
};

// A locally created did:jwk identifier resolves to its P-256 signing key,
// and the same key resolved by kid or by JWK yields the same thumbprint.
#[tokio::test]
async fn did_jwk_p256() {
    let holder = Holder::new();
    let identifier =
        holder.add_identity("signing", &Curve::P256).expect("should create identity");

    // --------------------------------------------------
    // Resolve the DID to its signing key
    // --------------------------------------------------
    let result = resolve_managed_by_did(ManagedOpts::new(identifier.did.clone()), &holder)
        .await
        .expect("should resolve DID");

    assert_eq!(result.method(), Method::Did);
    let ManagedResult::Did(did_result) = &result else {
        panic!("expected a DID result");
    };
    assert!(did_result.did.starts_with("did:jwk:"));
    assert_eq!(did_result.info.issuer.as_deref(), Some(identifier.did.as_str()));
    assert_eq!(did_result.info.kid, format!("{}#0", identifier.did));
    assert_eq!(did_result.info.jwk.kty, KeyType::Ec);
    assert_eq!(did_result.info.jwk.crv, Some(Curve::P256));

    // --------------------------------------------------
    // The same key by kid and by JWK: identical thumbprints
    // --------------------------------------------------
    let by_kid = resolve_managed_by_kid(ManagedOpts::new("signing"), &holder)
        .await
        .expect("should resolve kid");
    let by_jwk =
        resolve_managed_by_jwk(ManagedOpts::new(did_result.info.jwk.clone()), &holder)
            .await
            .expect("should resolve JWK");

    assert_eq!(by_kid.info().jwk_thumbprint, did_result.info.jwk_thumbprint);
    assert_eq!(by_jwk.info().jwk_thumbprint, did_result.info.jwk_thumbprint);
    assert_eq!(by_kid.jwks()[0].jwk_thumbprint, by_kid.info().jwk_thumbprint);
}

// A previously produced result short-circuits unchanged, even against a
// provider holding no keys at all.
#[tokio::test]
async fn resolved_input_is_passed_through() {
    let holder = Holder::new();
    holder.add_identity("signing", &Curve::Ed25519).expect("should create identity");

    let result = resolve_managed_by_kid(ManagedOpts::new("signing"), &holder)
        .await
        .expect("should resolve kid");

    let empty = Holder::new();
    let again =
        resolve_managed(result.clone(), &empty).await.expect("should pass result through");
    assert_eq!(again, result);
}

// The per-method wrapper is the generic call with the method pinned.
#[tokio::test]
async fn wrapper_equals_pinned_method() {
    let holder = Holder::new();
    let identifier =
        holder.add_identity("signing", &Curve::P256).expect("should create identity");

    let wrapped = resolve_managed_by_did(ManagedOpts::new(identifier.did.clone()), &holder)
        .await
        .expect("should resolve");
    let pinned =
        resolve_managed(ManagedOpts::new(identifier.did.clone()).method(Method::Did), &holder)
            .await
            .expect("should resolve");
    assert_eq!(wrapped, pinned);
}

// A supplied key object passes through without a Key Manager lookup.
#[tokio::test]
async fn key_object_pass_through() {
    let holder = Holder::new();
    let key = holder.vault.generate("local", &Curve::Ed25519).expect("should generate");

    let result = resolve_managed_by_key(ManagedOpts::new(key.clone()), &Holder::new())
        .await
        .expect("should pass key through");
    assert_eq!(result.method(), Method::Key);
    assert_eq!(result.kid(), "local");
    assert_eq!(result.info().key, key);
}

#[tokio::test]
async fn unknown_kid_is_not_found() {
    let holder = Holder::new();
    let err = resolve_managed_by_kid(ManagedOpts::new("missing"), &holder)
        .await
        .expect_err("should not resolve");
    assert!(matches!(err, Error::NotFound(_)));
}

// Certificate-chain and COSE identifiers match local custody through the
// thumbprint, and all representations agree on it.
#[tokio::test]
async fn x5c_and_cose_match_local_key() {
    let holder = Holder::new();
    // the leaf certificate's public key, held locally without a DID
    holder.vault.import(ManagedKey {
        kid: "leaf".to_string(),
        key_type: Curve::P256,
        public_key_hex: "046ec6185743c643b21626a821f3812a097f3552e7f14f924dbd07d92691873b3c01bbaa91ecc2c611a5523ca2c3b2b7b94540956eb7dd1e3e8a2a5d88b1bd73f8".to_string(),
        kms_key_ref: Some("hsm:leaf".to_string()),
    });

    let chain = test_utils::certs::x5c_chain().expect("should load fixture chain");
    let by_x5c = resolve_managed_by_x5c(ManagedOpts::new(chain.clone()), &holder)
        .await
        .expect("should resolve chain");
    let ManagedResult::X5c(x5c_result) = &by_x5c else {
        panic!("expected an x5c result");
    };
    assert_eq!(x5c_result.certificate, chain[0]);
    assert_eq!(by_x5c.kid(), "leaf");

    let cose_key = CoseKey {
        kty: CoseKeyType::Ec2,
        kid: None,
        crv: CoseCurve::P256,
        x: "bsYYV0PGQ7IWJqgh84EqCX81UufxT5JNvQfZJpGHOzw".to_string(),
        y: Some("AbuqkezCxhGlUjyiw7K3uUVAlW633R4-iipdiLG9c_g".to_string()),
        base_iv: None,
        x5chain: None,
    };
    let by_cose = resolve_managed_by_cose_key(ManagedOpts::new(cose_key), &holder)
        .await
        .expect("should resolve COSE key");

    assert_eq!(by_cose.info().jwk_thumbprint, by_x5c.info().jwk_thumbprint);
    assert_eq!(by_cose.info().kms_key_ref.as_deref(), Some("hsm:leaf"));
}

// A key registered for a DID that is not yet published is usable only
// when offline resolution is requested.
#[tokio::test]
async fn unpublished_did_requires_offline() {
    let holder = Holder::new();
    let key = holder.vault.generate("draft", &Curve::P256).expect("should generate");
    holder
        .identity
        .register_as("did:ebsi:zvHWX359A3CvfJnCYaAiAde", &key)
        .expect("should register");

    let opts = ManagedOpts::new("did:ebsi:zvHWX359A3CvfJnCYaAiAde");
    let err = resolve_managed_by_did(opts.clone(), &holder)
        .await
        .expect_err("unpublished DID should not resolve");
    assert!(matches!(err, Error::NotFound(_)));

    let result =
        resolve_managed_by_did(opts.offline_when_no_did_registered(), &holder)
            .await
            .expect("draft key should resolve offline");
    assert_eq!(result.kid(), "did:ebsi:zvHWX359A3CvfJnCYaAiAde#draft");
}

// Issuer metadata delegates to the method the issuer's signing key uses
// and wraps the delegated result.
#[tokio::test]
async fn issuer_metadata_delegates() {
    const ISSUER: &str = "https://issuer.example.com";

    let holder = Holder::new();
    let key = holder.vault.generate("issuer-signing", &Curve::P256).expect("should generate");
    let jwk = key.jwk().expect("should convert");

    holder.fetcher.add(
        format!("{ISSUER}/.well-known/openid-credential-issuer"),
        json!({
            "credential_issuer": ISSUER,
            "jwks": {"keys": [jwk]},
            "credential_configurations_supported": {}
        }),
    );

    let result = resolve_managed_by_issuer(ManagedOpts::new(ISSUER), &holder)
        .await
        .expect("should resolve issuer");

    assert_eq!(result.method(), Method::Oid4vciIssuer);
    let ManagedResult::Oid4vciIssuer(issuer_result) = &result else {
        panic!("expected an issuer result");
    };
    assert_eq!(issuer_result.issuer_metadata.credential_issuer, ISSUER);
    assert_eq!(issuer_result.resolved.method(), Method::Jwk);
    assert_eq!(result.kid(), "issuer-signing");
    assert_eq!(result.info().issuer.as_deref(), Some(ISSUER));
}

// A structurally unclassifiable JSON value is rejected at the boundary.
#[test]
fn loose_value_classification() {
    let identifier =
        Identifier::from_value(json!({"did": "did:example:alice", "keys": []}))
            .expect("should classify");
    assert!(matches!(identifier, Identifier::DidIdentifier(_)));

    let err = Identifier::from_value(json!({"unknown": true})).expect_err("should reject");
    assert!(matches!(err, Error::Classification(_)));
}

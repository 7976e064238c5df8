//! # External Resolution
//!
//! Resolution of external identifiers: identifiers belonging to a remote
//! party, resolved to verifiable key material without local key custody.
//!
//! Failures of individual verification units are data, not errors: a DID
//! that does not resolve reports the failure in its resolution metadata, a
//! certificate chain that does not validate reports it in the verification
//! result, and a failing trust anchor lands in the federation error list.
//! Errors are reserved for violated preconditions.

use std::collections::BTreeMap;

use anyhow::Context as _;
use chrono::Utc;
use tracing::instrument;
use veridian_core::did::{Did, DidResolutionResult, VerificationRelationship};
use veridian_core::jwk::JwkInfo;
use veridian_core::x509;

use crate::classify::classify;
use crate::error::{Error, Result};
use crate::federation;
use crate::managed::{fetch_issuer_metadata, fetch_jwks};
use crate::provider::{
    ChainValidationResult, ChainValidator, DidResolver, ExternalProvider, Fetcher,
};
use crate::types::{
    ExternalCoseKeyResult, ExternalDidResult, ExternalIssuerResult, ExternalJwkResult,
    ExternalOpts, ExternalResult, Identifier, Method, UrlJwksResult, X5cResult,
};

/// Resolve an external identifier.
///
/// # Errors
///
/// Returns [`Error::InvalidIdentifier`] when the identifier violates a
/// structural precondition (e.g. an unparsable DID string),
/// [`Error::Configuration`] when a required option is missing (no trust
/// anchors for an entity id), and [`Error::UnsupportedMethod`] when the
/// classified method has no external resolver.
#[instrument(level = "debug", skip(provider))]
pub async fn resolve_external<P>(opts: ExternalOpts, provider: &P) -> Result<ExternalResult>
where
    P: ExternalProvider,
{
    match classify(&opts.identifier, opts.method, !opts.trust_anchors.is_empty()) {
        Method::Did => resolve_did(&opts, provider).await.map(ExternalResult::Did),
        Method::Jwk => resolve_jwk(&opts, provider).await.map(ExternalResult::Jwk),
        Method::X5c => resolve_x5c(&opts, provider).await.map(ExternalResult::X5c),
        Method::CoseKey => resolve_cose_key(&opts).map(ExternalResult::CoseKey),
        Method::EntityId => {
            federation::resolve_entity_id(&opts, provider).await.map(ExternalResult::EntityId)
        }
        Method::OidcDiscovery => {
            resolve_oidc_discovery(&opts, provider).await.map(ExternalResult::OidcDiscovery)
        }
        Method::JwksUrl => resolve_jwks_url(&opts, provider).await.map(ExternalResult::JwksUrl),
        Method::Oid4vciIssuer => {
            resolve_issuer(&opts, provider).await.map(ExternalResult::Oid4vciIssuer)
        }
        // kid and key refer to locally held keys
        method => Err(Error::UnsupportedMethod(method.to_string())),
    }
}

/// Resolve an external identifier as a DID.
///
/// # Errors
///
/// As [`resolve_external`].
pub async fn resolve_external_did<P: ExternalProvider>(
    opts: ExternalOpts, provider: &P,
) -> Result<ExternalResult> {
    resolve_external(opts.method(Method::Did), provider).await
}

/// Resolve an external identifier as a JWK.
///
/// # Errors
///
/// As [`resolve_external`].
pub async fn resolve_external_jwk<P: ExternalProvider>(
    opts: ExternalOpts, provider: &P,
) -> Result<ExternalResult> {
    resolve_external(opts.method(Method::Jwk), provider).await
}

/// Resolve an external identifier as a certificate chain.
///
/// # Errors
///
/// As [`resolve_external`].
pub async fn resolve_external_x5c<P: ExternalProvider>(
    opts: ExternalOpts, provider: &P,
) -> Result<ExternalResult> {
    resolve_external(opts.method(Method::X5c), provider).await
}

/// Resolve an external identifier as a COSE key.
///
/// # Errors
///
/// As [`resolve_external`].
pub async fn resolve_external_cose_key<P: ExternalProvider>(
    opts: ExternalOpts, provider: &P,
) -> Result<ExternalResult> {
    resolve_external(opts.method(Method::CoseKey), provider).await
}

/// Resolve an external identifier as a federation entity id.
///
/// # Errors
///
/// As [`resolve_external`].
pub async fn resolve_external_entity_id<P: ExternalProvider>(
    opts: ExternalOpts, provider: &P,
) -> Result<ExternalResult> {
    resolve_external(opts.method(Method::EntityId), provider).await
}

/// Resolve an external identifier as an OpenID Connect discovery URL.
///
/// # Errors
///
/// As [`resolve_external`].
pub async fn resolve_external_oidc_discovery<P: ExternalProvider>(
    opts: ExternalOpts, provider: &P,
) -> Result<ExternalResult> {
    resolve_external(opts.method(Method::OidcDiscovery), provider).await
}

/// Resolve an external identifier as a JWKS URL.
///
/// # Errors
///
/// As [`resolve_external`].
pub async fn resolve_external_jwks_url<P: ExternalProvider>(
    opts: ExternalOpts, provider: &P,
) -> Result<ExternalResult> {
    resolve_external(opts.method(Method::JwksUrl), provider).await
}

/// Resolve an external identifier as an OID4VCI credential issuer.
///
/// # Errors
///
/// As [`resolve_external`].
pub async fn resolve_external_issuer<P: ExternalProvider>(
    opts: ExternalOpts, provider: &P,
) -> Result<ExternalResult> {
    resolve_external(opts.method(Method::Oid4vciIssuer), provider).await
}

async fn resolve_did<P: ExternalProvider>(
    opts: &ExternalOpts, provider: &P,
) -> Result<ExternalDidResult> {
    let Identifier::Text(did_url) = &opts.identifier else {
        return Err(Error::InvalidIdentifier("a DID string is required".to_string()));
    };
    // an unparsable DID is a precondition violation and fails here;
    // resolution failures below are reported inline
    let parsed = Did::parse(did_url).map_err(|e| Error::InvalidIdentifier(e.to_string()))?;
    let did = parsed.did();

    let resolution = match provider.resolve(&did).await {
        Ok(resolution) => resolution,
        Err(e) => DidResolutionResult::error("internalError", e.to_string()),
    };

    let mut did_jwks: BTreeMap<VerificationRelationship, Vec<JwkInfo>> = BTreeMap::new();
    let mut jwks = Vec::new();

    if let Some(document) = &resolution.did_document {
        for relationship in VerificationRelationship::FALLBACK_ORDER {
            let infos: Vec<JwkInfo> = document
                .methods_for(relationship)
                .iter()
                .filter_map(|vm| vm.jwk().ok())
                .filter_map(|jwk| JwkInfo::try_from(jwk).ok())
                .collect();
            if !infos.is_empty() {
                did_jwks.insert(relationship, infos);
            }
        }

        let requested = opts.vm_relationship.unwrap_or_default();
        jwks = did_jwks.get(&requested).cloned().unwrap_or_default();
        if jwks.is_empty() && !opts.no_verification_method_fallback {
            for relationship in VerificationRelationship::FALLBACK_ORDER {
                if let Some(infos) = did_jwks.get(&relationship) {
                    jwks.clone_from(infos);
                    break;
                }
            }
        }
    }

    Ok(ExternalDidResult {
        did,
        did_parsed: parsed,
        did_document: resolution.did_document.clone(),
        did_jwks,
        did_resolution_result: resolution,
        jwks,
    })
}

async fn resolve_jwk<P: ExternalProvider>(
    opts: &ExternalOpts, provider: &P,
) -> Result<ExternalJwkResult> {
    let Identifier::Jwk(jwk) = &opts.identifier else {
        return Err(Error::InvalidIdentifier("a JWK is required".to_string()));
    };
    let info = JwkInfo::try_from(jwk.clone())?;

    // a JWK embedding a certificate chain cascades into chain verification
    let x5c = if let Some(chain) = &jwk.x5c {
        let inner = ExternalOpts {
            method: Some(Method::X5c),
            identifier: Identifier::Chain(chain.clone()),
            ..opts.clone()
        };
        Some(Box::new(resolve_x5c(&inner, provider).await?))
    } else {
        None
    };

    Ok(ExternalJwkResult {
        jwk: jwk.clone(),
        x5c,
        jwks: vec![info],
    })
}

async fn resolve_x5c<P: ExternalProvider>(
    opts: &ExternalOpts, provider: &P,
) -> Result<X5cResult> {
    let Identifier::Chain(chain) = &opts.identifier else {
        return Err(Error::InvalidIdentifier("a certificate chain is required".to_string()));
    };
    if chain.is_empty() {
        return Err(Error::InvalidIdentifier("certificate chain is empty".to_string()));
    }

    // certificates and keys are returned regardless of the verification
    // outcome
    let certificates = x509::parse_chain(chain)?;
    let jwks = certificates
        .iter()
        .map(|cert| JwkInfo::try_from(cert.jwk.clone()))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let issuer_jwk = jwks[0].clone();

    let verification_result = if opts.verify == Some(false) {
        None
    } else {
        let at = opts.verification_time.unwrap_or_else(Utc::now);
        let verdict = match provider.validate(chain, &opts.trust_anchors, at).await {
            Ok(verdict) => verdict,
            Err(e) => ChainValidationResult::failure(e.to_string()),
        };
        Some(verdict)
    };

    Ok(X5cResult {
        x5c: chain.clone(),
        certificate: chain[0].clone(),
        certificates,
        issuer_jwk,
        verification_result,
        jwks,
    })
}

fn resolve_cose_key(opts: &ExternalOpts) -> Result<ExternalCoseKeyResult> {
    let Identifier::CoseKey(cose_key) = &opts.identifier else {
        return Err(Error::InvalidIdentifier("a COSE key is required".to_string()));
    };
    // structural conversion only, no trust step
    let jwk = cose_key.to_jwk()?;
    let info = JwkInfo::try_from(jwk.clone())?;

    Ok(ExternalCoseKeyResult {
        cose_key: cose_key.clone(),
        jwk,
        jwks: vec![info],
    })
}

async fn resolve_oidc_discovery<P: ExternalProvider>(
    opts: &ExternalOpts, provider: &P,
) -> Result<UrlJwksResult> {
    let Identifier::Text(url) = &opts.identifier else {
        return Err(Error::InvalidIdentifier("a discovery URL is required".to_string()));
    };

    let configuration =
        provider.fetch_json(url).await.context("fetching OpenID configuration")?;
    let jwks_uri = configuration
        .get("jwks_uri")
        .and_then(|uri| uri.as_str())
        .ok_or_else(|| {
            Error::NotFound(format!("OpenID configuration at {url} names no jwks_uri"))
        })?
        .to_string();

    let jwks = fetch_jwks(&jwks_uri, provider).await?;
    let jwks = jwks
        .keys
        .into_iter()
        .map(JwkInfo::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(UrlJwksResult {
        url: url.clone(),
        jwks_uri: Some(jwks_uri),
        jwks,
    })
}

async fn resolve_jwks_url<P: ExternalProvider>(
    opts: &ExternalOpts, provider: &P,
) -> Result<UrlJwksResult> {
    let Identifier::Text(url) = &opts.identifier else {
        return Err(Error::InvalidIdentifier("a JWKS URL is required".to_string()));
    };

    let jwks = fetch_jwks(url, provider).await?;
    let jwks = jwks
        .keys
        .into_iter()
        .map(JwkInfo::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(UrlJwksResult {
        url: url.clone(),
        jwks_uri: None,
        jwks,
    })
}

async fn resolve_issuer<P: ExternalProvider>(
    opts: &ExternalOpts, provider: &P,
) -> Result<ExternalIssuerResult> {
    let Identifier::Text(url) = &opts.identifier else {
        return Err(Error::InvalidIdentifier("an issuer URL is required".to_string()));
    };

    let metadata = fetch_issuer_metadata(url, provider).await?;

    let keys = if let Some(jwks) = &metadata.jwks {
        jwks.keys.clone()
    } else if let Some(jwks_uri) = &metadata.jwks_uri {
        fetch_jwks(jwks_uri, provider).await?.keys
    } else {
        return Err(Error::NotFound(format!(
            "issuer metadata of {url} carries no signing key material"
        )));
    };
    let jwks =
        keys.into_iter().map(JwkInfo::try_from).collect::<anyhow::Result<Vec<_>>>()?;

    Ok(ExternalIssuerResult {
        url: url.clone(),
        issuer_metadata: metadata,
        jwks,
    })
}

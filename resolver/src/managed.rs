//! # Managed Resolution
//!
//! Resolution of managed identifiers: identifiers backed by a locally
//! controlled signing key. The output is a handle to that key plus its
//! JWK, thumbprint, issuer, and kid context, suitable for signing.
//!
//! Output is all-or-nothing: a result is fully populated or resolution
//! fails with an error. Passing a previously produced result back in
//! returns it unchanged without re-entering any collaborator.

use std::fmt::Debug;

use anyhow::Context as _;
use tracing::instrument;
use veridian_core::did::{Did, VerificationRelationship};
use veridian_core::jwk::{JwkInfo, Jwks, PublicKeyJwk};
use veridian_core::x509;

use crate::classify::{WELL_KNOWN_CREDENTIAL_ISSUER, classify};
use crate::error::{Error, Result};
use crate::provider::{DidResolver, DidStore, Fetcher, KeyStore, ManagedProvider};
use crate::types::{
    Identifier, IssuerMetadata, ManagedCoseKeyResult, ManagedDidResult, ManagedInput,
    ManagedIssuerResult, ManagedKey, ManagedKeyInfo, ManagedKeyResult, ManagedOpts, ManagedResult,
    ManagedX5cResult, Method, OwnedIdentifier,
};

/// Resolve a managed identifier.
///
/// The input is either resolution options or a previously produced
/// result; a result short-circuits unchanged.
///
/// # Errors
///
/// Returns [`Error::NotFound`] when no local key matches the identifier,
/// [`Error::InvalidIdentifier`] when the identifier violates a structural
/// precondition, and [`Error::UnsupportedMethod`] when the classified
/// method has no managed resolver.
#[instrument(level = "debug", skip(provider))]
pub async fn resolve_managed<P>(
    input: impl Into<ManagedInput> + Debug, provider: &P,
) -> Result<ManagedResult>
where
    P: ManagedProvider,
{
    let opts = match input.into() {
        ManagedInput::Resolved(result) => return Ok(*result),
        ManagedInput::Pending(opts) => *opts,
    };

    // managed options carry no trust anchors
    match classify(&opts.identifier, opts.method, false) {
        Method::Did => resolve_did(opts, provider).await,
        Method::Kid => resolve_kid(opts, provider).await,
        Method::Key => resolve_key(opts),
        Method::Jwk => resolve_jwk(opts, provider).await,
        Method::X5c => resolve_x5c(opts, provider).await,
        Method::CoseKey => resolve_cose_key(opts, provider).await,
        Method::Oid4vciIssuer => resolve_issuer(opts, provider).await,
        method => Err(Error::UnsupportedMethod(method.to_string())),
    }
}

/// Resolve a managed identifier as a DID.
///
/// # Errors
///
/// As [`resolve_managed`].
pub async fn resolve_managed_by_did<P: ManagedProvider>(
    opts: ManagedOpts, provider: &P,
) -> Result<ManagedResult> {
    resolve_managed(opts.method(Method::Did), provider).await
}

/// Resolve a managed identifier as a key id.
///
/// # Errors
///
/// As [`resolve_managed`].
pub async fn resolve_managed_by_kid<P: ManagedProvider>(
    opts: ManagedOpts, provider: &P,
) -> Result<ManagedResult> {
    resolve_managed(opts.method(Method::Kid), provider).await
}

/// Resolve a managed identifier as a key object.
///
/// # Errors
///
/// As [`resolve_managed`].
pub async fn resolve_managed_by_key<P: ManagedProvider>(
    opts: ManagedOpts, provider: &P,
) -> Result<ManagedResult> {
    resolve_managed(opts.method(Method::Key), provider).await
}

/// Resolve a managed identifier as a JWK.
///
/// # Errors
///
/// As [`resolve_managed`].
pub async fn resolve_managed_by_jwk<P: ManagedProvider>(
    opts: ManagedOpts, provider: &P,
) -> Result<ManagedResult> {
    resolve_managed(opts.method(Method::Jwk), provider).await
}

/// Resolve a managed identifier as a certificate chain.
///
/// # Errors
///
/// As [`resolve_managed`].
pub async fn resolve_managed_by_x5c<P: ManagedProvider>(
    opts: ManagedOpts, provider: &P,
) -> Result<ManagedResult> {
    resolve_managed(opts.method(Method::X5c), provider).await
}

/// Resolve a managed identifier as a COSE key.
///
/// # Errors
///
/// As [`resolve_managed`].
pub async fn resolve_managed_by_cose_key<P: ManagedProvider>(
    opts: ManagedOpts, provider: &P,
) -> Result<ManagedResult> {
    resolve_managed(opts.method(Method::CoseKey), provider).await
}

/// Resolve a managed identifier as an OID4VCI credential issuer.
///
/// # Errors
///
/// As [`resolve_managed`].
pub async fn resolve_managed_by_issuer<P: ManagedProvider>(
    opts: ManagedOpts, provider: &P,
) -> Result<ManagedResult> {
    resolve_managed(opts.method(Method::Oid4vciIssuer), provider).await
}

async fn resolve_did<P: ManagedProvider>(
    opts: ManagedOpts, provider: &P,
) -> Result<ManagedResult> {
    let identifier = match &opts.identifier {
        Identifier::DidIdentifier(owned) => owned.clone(),
        Identifier::Text(text) => {
            let parsed =
                Did::parse(text).map_err(|e| Error::InvalidIdentifier(e.to_string()))?;
            let did = parsed.did();
            provider
                .identifier(&did)
                .await
                .context("looking up identifier")?
                .ok_or_else(|| Error::NotFound(format!("no identifier registered for {did}")))?
        }
        _ => {
            return Err(Error::InvalidIdentifier(
                "a DID string or DID identifier is required".to_string(),
            ));
        }
    };

    let (key, vm_id) = select_key(&identifier, &opts, provider).await?;
    let issuer = opts.issuer.clone().unwrap_or_else(|| identifier.did.clone());
    let info = key_info(key, vm_id, &ManagedOpts { issuer: Some(issuer), ..opts })?;

    Ok(ManagedResult::Did(ManagedDidResult {
        did: identifier.did.clone(),
        identifier,
        info,
    }))
}

// Select the identifier's signing key: an explicit KMS reference or the
// controller key when requested, otherwise the key referenced by the
// requested verification relationship of the resolved DID document.
async fn select_key<P: ManagedProvider>(
    identifier: &OwnedIdentifier, opts: &ManagedOpts, provider: &P,
) -> Result<(ManagedKey, String)> {
    if let Some(kms_key_ref) = &opts.kms_key_ref {
        let key = identifier
            .keys
            .iter()
            .find(|k| k.kms_key_ref.as_deref() == Some(kms_key_ref) || &k.kid == kms_key_ref)
            .ok_or_else(|| {
                Error::NotFound(format!("{} holds no key {kms_key_ref}", identifier.did))
            })?;
        return Ok((key.clone(), fragment_kid(&identifier.did, &key.kid)));
    }

    if opts.controller_key {
        let kid = identifier.controller_key_id.as_ref().ok_or_else(|| {
            Error::NotFound(format!("{} has no controller key", identifier.did))
        })?;
        let key = identifier.keys.iter().find(|k| &k.kid == kid).ok_or_else(|| {
            Error::NotFound(format!("{} holds no key {kid}", identifier.did))
        })?;
        return Ok((key.clone(), fragment_kid(&identifier.did, &key.kid)));
    }

    let relationship = opts.vm_relationship.unwrap_or_default();
    let resolution = provider.resolve(&identifier.did).await.context("resolving DID")?;

    let Some(document) = resolution.did_document else {
        // the DID is not (yet) resolvable, e.g. registration is external
        // and the document has not been published
        if opts.offline_when_no_did_registered {
            let key = identifier
                .controller_key_id
                .as_ref()
                .and_then(|kid| identifier.keys.iter().find(|k| &k.kid == kid))
                .or_else(|| identifier.keys.first())
                .ok_or_else(|| {
                    Error::NotFound(format!("{} holds no keys", identifier.did))
                })?;
            return Ok((key.clone(), fragment_kid(&identifier.did, &key.kid)));
        }
        let reason = resolution
            .did_resolution_metadata
            .error_message
            .or(resolution.did_resolution_metadata.error)
            .unwrap_or_else(|| "document not found".to_string());
        return Err(Error::NotFound(format!(
            "could not resolve {}: {reason}",
            identifier.did
        )));
    };

    let mut methods = document.methods_for(relationship);
    if methods.is_empty() && relationship == VerificationRelationship::AssertionMethod {
        methods = document.methods_for(VerificationRelationship::Authentication);
    }

    for vm in &methods {
        let Ok(vm_jwk) = vm.jwk() else { continue };
        let Ok(vm_thumbprint) = vm_jwk.thumbprint() else { continue };
        for key in &identifier.keys {
            let matches = key
                .jwk()
                .and_then(|jwk| jwk.thumbprint())
                .is_ok_and(|thumbprint| thumbprint == vm_thumbprint);
            if matches {
                return Ok((key.clone(), vm.id.clone()));
            }
        }
    }

    Err(Error::NotFound(format!(
        "no local key matches a {relationship} verification method of {}",
        identifier.did
    )))
}

// kid of a key within a DID document, when no verification method names it
fn fragment_kid(did: &str, kid: &str) -> String {
    format!("{did}#{kid}")
}

async fn resolve_kid<P: ManagedProvider>(
    opts: ManagedOpts, provider: &P,
) -> Result<ManagedResult> {
    let Identifier::Text(kid) = &opts.identifier else {
        return Err(Error::InvalidIdentifier("a key id string is required".to_string()));
    };
    let key = provider
        .key(kid)
        .await
        .context("looking up key")?
        .ok_or_else(|| Error::NotFound(format!("no key with kid {kid}")))?;
    let kid = key.kid.clone();
    Ok(ManagedResult::Kid(ManagedKeyResult {
        info: key_info(key, kid, &opts)?,
    }))
}

fn resolve_key(opts: ManagedOpts) -> Result<ManagedResult> {
    let Identifier::Key(key) = &opts.identifier else {
        return Err(Error::InvalidIdentifier("a key object is required".to_string()));
    };
    let key = key.clone();
    let kid = key.kid.clone();
    Ok(ManagedResult::Key(ManagedKeyResult {
        info: key_info(key, kid, &opts)?,
    }))
}

async fn resolve_jwk<P: ManagedProvider>(
    opts: ManagedOpts, provider: &P,
) -> Result<ManagedResult> {
    let Identifier::Jwk(jwk) = &opts.identifier else {
        return Err(Error::InvalidIdentifier("a JWK is required".to_string()));
    };
    let thumbprint = jwk.thumbprint()?;
    let key = find_by_thumbprint(provider, &thumbprint).await?.ok_or_else(|| {
        Error::NotFound(format!("no local key with thumbprint {thumbprint}"))
    })?;
    let kid = key.kid.clone();
    Ok(ManagedResult::Jwk(ManagedKeyResult {
        info: key_info(key, kid, &opts)?,
    }))
}

async fn resolve_x5c<P: ManagedProvider>(
    opts: ManagedOpts, provider: &P,
) -> Result<ManagedResult> {
    let Identifier::Chain(chain) = &opts.identifier else {
        return Err(Error::InvalidIdentifier("a certificate chain is required".to_string()));
    };
    if chain.is_empty() {
        return Err(Error::InvalidIdentifier("certificate chain is empty".to_string()));
    }

    let certificates = x509::decode_x5c(chain)?;
    let leaf_jwk = x509::cert_jwk(&certificates[0])?;
    let thumbprint = leaf_jwk.thumbprint()?;
    let key = find_by_thumbprint(provider, &thumbprint).await?.ok_or_else(|| {
        Error::NotFound(format!("no local key matches the leaf certificate ({thumbprint})"))
    })?;
    let kid = key.kid.clone();

    Ok(ManagedResult::X5c(ManagedX5cResult {
        x5c: chain.clone(),
        certificate: chain[0].clone(),
        info: key_info(key, kid, &opts)?,
    }))
}

async fn resolve_cose_key<P: ManagedProvider>(
    opts: ManagedOpts, provider: &P,
) -> Result<ManagedResult> {
    let Identifier::CoseKey(cose_key) = &opts.identifier else {
        return Err(Error::InvalidIdentifier("a COSE key is required".to_string()));
    };
    let thumbprint = cose_key.thumbprint()?;
    let key = find_by_thumbprint(provider, &thumbprint).await?.ok_or_else(|| {
        Error::NotFound(format!("no local key with thumbprint {thumbprint}"))
    })?;
    let kid = key.kid.clone();

    Ok(ManagedResult::CoseKey(ManagedCoseKeyResult {
        cose_key: cose_key.clone(),
        info: key_info(key, kid, &opts)?,
    }))
}

// Fetch the issuer's metadata and delegate to the method its signing key
// actually uses: inline JWKS, then JWKS by reference, then a DID-valued
// issuer identifier.
async fn resolve_issuer<P: ManagedProvider>(
    opts: ManagedOpts, provider: &P,
) -> Result<ManagedResult> {
    let Identifier::Text(url) = &opts.identifier else {
        return Err(Error::InvalidIdentifier("an issuer URL is required".to_string()));
    };

    let metadata = fetch_issuer_metadata(url, provider).await?;
    let issuer = opts.issuer.clone().unwrap_or_else(|| metadata.credential_issuer.clone());

    let (method, identifier) = if let Some(jwks) = &metadata.jwks {
        let jwk = jwks.keys.first().ok_or_else(|| {
            Error::NotFound(format!("issuer metadata of {url} carries an empty JWKS"))
        })?;
        (Method::Jwk, Identifier::Jwk(jwk.clone()))
    } else if let Some(jwks_uri) = &metadata.jwks_uri {
        let jwks = fetch_jwks(jwks_uri, provider).await?;
        let jwk = jwks.keys.first().ok_or_else(|| {
            Error::NotFound(format!("JWKS at {jwks_uri} is empty"))
        })?;
        (Method::Jwk, Identifier::Jwk(jwk.clone()))
    } else if metadata.credential_issuer.starts_with("did:") {
        (Method::Did, Identifier::Text(metadata.credential_issuer.clone()))
    } else {
        return Err(Error::NotFound(format!(
            "issuer metadata of {url} carries no signing key material"
        )));
    };

    let inner = ManagedOpts {
        method: Some(method),
        identifier,
        issuer: Some(issuer),
        ..opts
    };
    let resolved = Box::pin(resolve_managed(inner, provider)).await?;

    Ok(ManagedResult::Oid4vciIssuer(ManagedIssuerResult {
        issuer_metadata: metadata,
        resolved: Box::new(resolved),
    }))
}

pub(crate) async fn fetch_issuer_metadata<F: Fetcher>(
    url: &str, fetcher: &F,
) -> Result<IssuerMetadata> {
    let metadata_url = if url.ends_with(WELL_KNOWN_CREDENTIAL_ISSUER) {
        url.to_string()
    } else {
        format!("{}{WELL_KNOWN_CREDENTIAL_ISSUER}", url.trim_end_matches('/'))
    };
    let value =
        fetcher.fetch_json(&metadata_url).await.context("fetching issuer metadata")?;
    let metadata = serde_json::from_value(value)
        .map_err(|e| Error::InvalidIdentifier(format!("malformed issuer metadata: {e}")))?;
    Ok(metadata)
}

pub(crate) async fn fetch_jwks<F: Fetcher>(url: &str, fetcher: &F) -> Result<Jwks> {
    let value = fetcher.fetch_json(url).await.context("fetching JWKS")?;
    let jwks: Jwks = serde_json::from_value(value)
        .map_err(|e| Error::InvalidIdentifier(format!("malformed JWKS at {url}: {e}")))?;
    Ok(jwks)
}

// Linear scan of the Key Manager for a key with the given thumbprint.
async fn find_by_thumbprint<P: KeyStore>(
    provider: &P, thumbprint: &str,
) -> Result<Option<ManagedKey>> {
    for key in provider.keys().await.context("listing keys")? {
        let Ok(jwk) = key.jwk() else { continue };
        if jwk.thumbprint().is_ok_and(|t| t == thumbprint) {
            return Ok(Some(key));
        }
    }
    Ok(None)
}

fn key_info(key: ManagedKey, kid: String, opts: &ManagedOpts) -> Result<ManagedKeyInfo> {
    let jwk: PublicKeyJwk = key.jwk()?;
    let jwk_thumbprint = jwk.thumbprint()?;
    Ok(ManagedKeyInfo {
        kid: opts.kid.clone().unwrap_or(kid),
        kms_key_ref: key.kms_key_ref.clone().or_else(|| opts.kms_key_ref.clone()),
        jwk: jwk.clone(),
        jwk_thumbprint: jwk_thumbprint.clone(),
        jwks: vec![JwkInfo { jwk, jwk_thumbprint }],
        issuer: opts.issuer.clone(),
        client_id: opts.client_id.clone(),
        client_id_scheme: opts.client_id_scheme,
        key,
    })
}

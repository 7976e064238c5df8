use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use base64ct::{Base64UrlUnpadded, Encoding};
use veridian_core::Kind;
use veridian_core::did::{
    Did, DidResolutionResult, Document, VerificationMethod,
};
use veridian_core::jwk::PublicKeyJwk;
use veridian_resolver::provider::{DidResolver, DidStore};
use veridian_resolver::{ManagedKey, OwnedIdentifier};

/// The `did:jwk` encoding of a public key.
pub fn did_jwk(jwk: &PublicKeyJwk) -> Result<String> {
    let json = serde_json::to_vec(jwk)?;
    Ok(format!("did:jwk:{}", Base64UrlUnpadded::encode_string(&json)))
}

/// An in-memory DID store and resolver. Registered identifiers answer DID
/// Manager lookups; `did:jwk` documents are derived from the DID itself,
/// other methods resolve only if a document was added explicitly.
#[derive(Clone, Default)]
pub struct IdentityStore {
    identifiers: Arc<Mutex<HashMap<String, OwnedIdentifier>>>,
    documents: Arc<Mutex<HashMap<String, Document>>>,
}

impl IdentityStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a `did:jwk` identifier backed by the given key.
    pub fn register(&self, key: &ManagedKey) -> Result<OwnedIdentifier> {
        let did = did_jwk(&key.jwk()?)?;
        self.register_as(&did, key)
    }

    /// Register an identifier under the given DID, backed by the given
    /// key. The DID is not required to be resolvable: registering a draft
    /// identifier for an unpublished DID is exactly this.
    pub fn register_as(&self, did: &str, key: &ManagedKey) -> Result<OwnedIdentifier> {
        let identifier = OwnedIdentifier {
            did: did.to_string(),
            controller_key_id: Some(key.kid.clone()),
            keys: vec![key.clone()],
            alias: None,
        };
        self.identifiers
            .lock()
            .expect("should lock")
            .insert(did.to_string(), identifier.clone());
        Ok(identifier)
    }

    /// Make the given document resolvable under its id.
    pub fn add_document(&self, document: Document) {
        self.documents.lock().expect("should lock").insert(document.id.clone(), document);
    }
}

impl DidStore for IdentityStore {
    async fn identifier(&self, did: &str) -> Result<Option<OwnedIdentifier>> {
        Ok(self.identifiers.lock().expect("should lock").get(did).cloned())
    }
}

impl DidResolver for IdentityStore {
    async fn resolve(&self, did: &str) -> Result<DidResolutionResult> {
        if let Some(document) = self.documents.lock().expect("should lock").get(did) {
            return Ok(DidResolutionResult::success(document.clone()));
        }
        let parsed = match Did::parse(did) {
            Ok(parsed) => parsed,
            Err(e) => return Ok(DidResolutionResult::error("invalidDid", e.to_string())),
        };
        if parsed.method == "jwk" {
            return Ok(DidResolutionResult::success(did_jwk_document(&parsed)?));
        }
        Ok(DidResolutionResult::error("notFound", format!("{did} is not registered")))
    }
}

// Expand a did:jwk into its DID document: a single verification method
// `#0` referenced by every signing relationship.
fn did_jwk_document(parsed: &Did) -> Result<Document> {
    let json = Base64UrlUnpadded::decode_vec(&parsed.id)
        .map_err(|e| anyhow!("issue decoding did:jwk: {e}"))?;
    let jwk: PublicKeyJwk = serde_json::from_slice(&json)?;

    let did = parsed.did();
    let vm_id = format!("{did}#0");
    let vm = VerificationMethod {
        id: vm_id.clone(),
        type_: "JsonWebKey2020".to_string(),
        controller: did.clone(),
        public_key_jwk: Some(jwk),
        public_key_multibase: None,
    };
    Ok(Document {
        id: did,
        verification_method: Some(vec![vm]),
        authentication: Some(vec![Kind::String(vm_id.clone())]),
        assertion_method: Some(vec![Kind::String(vm_id.clone())]),
        capability_invocation: Some(vec![Kind::String(vm_id.clone())]),
        capability_delegation: Some(vec![Kind::String(vm_id)]),
        ..Document::default()
    })
}

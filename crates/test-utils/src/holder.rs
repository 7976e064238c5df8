use anyhow::Result;
use serde_json::Value;
use veridian_core::did::DidResolutionResult;
use veridian_core::jwk::Curve;
use veridian_resolver::provider::{DidResolver, DidStore, Fetcher, KeyStore};
use veridian_resolver::{ManagedKey, OwnedIdentifier};

use crate::fetch::StaticFetcher;
use crate::identity::IdentityStore;
use crate::vault::KeyVault;

/// A managed-side provider: key custody, identifier registration, and a
/// canned fetcher, composed for managed resolution tests.
#[derive(Clone, Default)]
pub struct Holder {
    /// Key custody.
    pub vault: KeyVault,

    /// Registered identifiers and DID resolution.
    pub identity: IdentityStore,

    /// Canned metadata documents.
    pub fetcher: StaticFetcher,
}

impl Holder {
    /// A holder with no keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a key and register a `did:jwk` identifier backed by it.
    pub fn add_identity(&self, kid: &str, curve: &Curve) -> Result<OwnedIdentifier> {
        let key = self.vault.generate(kid, curve)?;
        self.identity.register(&key)
    }
}

impl KeyStore for Holder {
    async fn key(&self, kid: &str) -> Result<Option<ManagedKey>> {
        self.vault.key(kid).await
    }

    async fn keys(&self) -> Result<Vec<ManagedKey>> {
        self.vault.keys().await
    }

    async fn sign(&self, kid: &str, msg: &[u8]) -> Result<Vec<u8>> {
        self.vault.sign(kid, msg).await
    }
}

impl DidStore for Holder {
    async fn identifier(&self, did: &str) -> Result<Option<OwnedIdentifier>> {
        self.identity.identifier(did).await
    }
}

impl DidResolver for Holder {
    async fn resolve(&self, did: &str) -> Result<DidResolutionResult> {
        self.identity.resolve(did).await
    }
}

impl Fetcher for Holder {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        self.fetcher.fetch_json(url).await
    }
}

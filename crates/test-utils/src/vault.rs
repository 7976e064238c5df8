use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use ed25519_dalek::Signer as _;
use p256::ecdsa::signature::Signer as _;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand_core::OsRng;
use veridian_core::jwk::Curve;
use veridian_resolver::ManagedKey;
use veridian_resolver::provider::KeyStore;

/// An in-memory key vault: generates signing keys and answers Key Manager
/// lookups over them.
#[derive(Clone, Default)]
pub struct KeyVault {
    keys: Arc<Mutex<HashMap<String, Entry>>>,
}

#[derive(Clone)]
struct Entry {
    key: ManagedKey,
    signer: Option<VaultSigner>,
}

#[derive(Clone)]
enum VaultSigner {
    Ed25519(ed25519_dalek::SigningKey),
    P256(p256::ecdsa::SigningKey),
}

impl KeyVault {
    /// An empty vault.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a signing key under the given key id.
    pub fn generate(&self, kid: impl ToString, curve: &Curve) -> Result<ManagedKey> {
        let kid = kid.to_string();
        let (signer, public_key_hex) = match curve {
            Curve::Ed25519 => {
                let signing = ed25519_dalek::SigningKey::generate(&mut OsRng);
                let public = hex::encode(signing.verifying_key().to_bytes());
                (VaultSigner::Ed25519(signing), public)
            }
            Curve::P256 => {
                let signing = p256::ecdsa::SigningKey::random(&mut OsRng);
                let point = signing.verifying_key().to_encoded_point(false);
                (VaultSigner::P256(signing), hex::encode(point.as_bytes()))
            }
            other => return Err(anyhow!("vault does not generate {other} keys")),
        };

        let key = ManagedKey {
            kid: kid.clone(),
            key_type: *curve,
            public_key_hex,
            kms_key_ref: Some(format!("vault:{kid}")),
        };
        self.keys.lock().expect("should lock").insert(kid, Entry {
            key: key.clone(),
            signer: Some(signer),
        });
        Ok(key)
    }

    /// Import public key material, e.g. a key whose private half lives in
    /// an external KMS. The key is listed and matched but cannot sign.
    pub fn import(&self, key: ManagedKey) {
        self.keys.lock().expect("should lock").insert(key.kid.clone(), Entry {
            key,
            signer: None,
        });
    }
}

impl KeyStore for KeyVault {
    async fn key(&self, kid: &str) -> Result<Option<ManagedKey>> {
        Ok(self.keys.lock().expect("should lock").get(kid).map(|entry| entry.key.clone()))
    }

    async fn keys(&self) -> Result<Vec<ManagedKey>> {
        Ok(self.keys.lock().expect("should lock").values().map(|entry| entry.key.clone()).collect())
    }

    async fn sign(&self, kid: &str, msg: &[u8]) -> Result<Vec<u8>> {
        let keys = self.keys.lock().expect("should lock");
        let entry = keys.get(kid).ok_or_else(|| anyhow!("no key with kid {kid}"))?;
        let signer =
            entry.signer.as_ref().ok_or_else(|| anyhow!("{kid} has no private key here"))?;
        let signature = match signer {
            VaultSigner::Ed25519(signing) => signing.sign(msg).to_bytes().to_vec(),
            VaultSigner::P256(signing) => {
                let signature: p256::ecdsa::Signature = signing.sign(msg);
                signature.to_bytes().to_vec()
            }
        };
        Ok(signature)
    }
}

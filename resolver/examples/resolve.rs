//! # Resolve
//!
//! Resolve a locally held identifier for signing, then the same key
//! material as a remote party would see it.

use test_utils::certs::{CA_PEM, x5c_chain};
use test_utils::{Holder, Verifier};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use veridian_core::jwk::Curve;
use veridian_resolver::{
    ExternalOpts, ManagedOpts, resolve_external_x5c, resolve_managed_by_did,
};

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("should set subscriber");

    // a locally controlled did:jwk, resolved for signing
    let holder = Holder::new();
    let identifier =
        holder.add_identity("signing", &Curve::P256).expect("should create identity");
    let managed = resolve_managed_by_did(ManagedOpts::new(identifier.did.clone()), &holder)
        .await
        .expect("should resolve identity");
    println!("signing key for {}:", identifier.did);
    println!("{}", serde_json::to_string_pretty(&managed).expect("should serialize"));

    // a remote party's certificate chain, resolved for verification
    let verifier = Verifier::new();
    let chain = x5c_chain().expect("should load chain");
    let opts = ExternalOpts::new(chain).trust_anchors([CA_PEM]);
    let external = resolve_external_x5c(opts, &verifier).await.expect("should resolve chain");
    println!("remote chain:");
    println!("{}", serde_json::to_string_pretty(&external).expect("should serialize"));
}

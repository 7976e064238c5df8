//! Resolution options.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use veridian_core::did::VerificationRelationship;

use crate::types::{ClientIdScheme, Identifier, ManagedResult, Method};

/// Options for resolving a managed identifier: an identifier backed by a
/// locally controlled signing key.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedOpts {
    /// The resolution method. Derived from the identifier's shape when not
    /// supplied; an explicit method always wins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<Method>,

    /// The identifier to resolve.
    pub identifier: Identifier,

    /// Select the key with this KMS reference (or key id).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_ref: Option<String>,

    /// Issuer to associate with the result. Defaults to the DID for DID
    /// identifiers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// Override the key id carried by the result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// OpenID client id to carry through the result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// The scheme of `client_id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id_scheme: Option<ClientIdScheme>,

    /// The verification relationship used to select a DID key. Defaults to
    /// assertion method, falling back to authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_relationship: Option<VerificationRelationship>,

    /// Select the identifier's controller key instead of a verification
    /// relationship.
    #[serde(default)]
    pub controller_key: bool,

    /// Use the locally registered draft key when the DID document cannot
    /// be resolved. Required for methods where registration is external
    /// and a key must be usable before the DID is published.
    #[serde(default)]
    pub offline_when_no_did_registered: bool,
}

impl ManagedOpts {
    /// Options for resolving the given identifier.
    #[must_use]
    pub fn new(identifier: impl Into<Identifier>) -> Self {
        Self {
            method: None,
            identifier: identifier.into(),
            kms_key_ref: None,
            issuer: None,
            kid: None,
            client_id: None,
            client_id_scheme: None,
            vm_relationship: None,
            controller_key: false,
            offline_when_no_did_registered: false,
        }
    }

    /// Pin the resolution method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Select the key with the given KMS reference.
    #[must_use]
    pub fn kms_key_ref(mut self, kms_key_ref: impl Into<String>) -> Self {
        self.kms_key_ref = Some(kms_key_ref.into());
        self
    }

    /// Set the issuer to associate with the result.
    #[must_use]
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Override the key id carried by the result.
    #[must_use]
    pub fn kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    /// Set the OpenID client id to carry through the result.
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>, scheme: ClientIdScheme) -> Self {
        self.client_id = Some(client_id.into());
        self.client_id_scheme = Some(scheme);
        self
    }

    /// Select DID keys by the given verification relationship.
    #[must_use]
    pub const fn vm_relationship(mut self, relationship: VerificationRelationship) -> Self {
        self.vm_relationship = Some(relationship);
        self
    }

    /// Select the identifier's controller key.
    #[must_use]
    pub const fn controller_key(mut self) -> Self {
        self.controller_key = true;
        self
    }

    /// Permit resolution against the locally registered draft key when the
    /// DID document cannot be resolved.
    #[must_use]
    pub const fn offline_when_no_did_registered(mut self) -> Self {
        self.offline_when_no_did_registered = true;
        self
    }
}

/// Options for resolving an external identifier: an identifier belonging
/// to a remote party, resolved without local key custody.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalOpts {
    /// The resolution method. Derived from the identifier's shape when not
    /// supplied; an explicit method always wins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<Method>,

    /// The identifier to resolve.
    pub identifier: Identifier,

    /// Trust anchors: certificate chain roots for `x5c`, federation
    /// entity ids for `entity_id`. Required for `entity_id`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trust_anchors: Vec<String>,

    /// Whether to verify certificate chains. Defaults to verifying;
    /// `Some(false)` skips the chain validator entirely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify: Option<bool>,

    /// The instant at which certificate chain validity is assessed.
    /// Defaults to now.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_time: Option<DateTime<Utc>>,

    /// The verification relationship whose keys populate the result's
    /// `jwks`. Defaults to assertion method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_relationship: Option<VerificationRelationship>,

    /// Disable the fallback search across the other verification
    /// relationships when the requested one yields no keys.
    #[serde(default)]
    pub no_verification_method_fallback: bool,
}

impl ExternalOpts {
    /// Options for resolving the given identifier.
    #[must_use]
    pub fn new(identifier: impl Into<Identifier>) -> Self {
        Self {
            method: None,
            identifier: identifier.into(),
            trust_anchors: Vec::new(),
            verify: None,
            verification_time: None,
            vm_relationship: None,
            no_verification_method_fallback: false,
        }
    }

    /// Pin the resolution method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the trust anchors to verify against.
    #[must_use]
    pub fn trust_anchors(mut self, anchors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.trust_anchors = anchors.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable chain verification.
    #[must_use]
    pub const fn verify(mut self, verify: bool) -> Self {
        self.verify = Some(verify);
        self
    }

    /// Assess certificate validity at the given instant.
    #[must_use]
    pub const fn verification_time(mut self, at: DateTime<Utc>) -> Self {
        self.verification_time = Some(at);
        self
    }

    /// Populate the result's `jwks` from the given verification
    /// relationship.
    #[must_use]
    pub const fn vm_relationship(mut self, relationship: VerificationRelationship) -> Self {
        self.vm_relationship = Some(relationship);
        self
    }

    /// Disable the verification relationship fallback search.
    #[must_use]
    pub const fn no_verification_method_fallback(mut self) -> Self {
        self.no_verification_method_fallback = true;
        self
    }
}

/// The managed resolver's input: fresh options, or a previously produced
/// result. Resolving a `Resolved` input is a pure pass-through: the
/// result is returned unchanged and no collaborator is re-entered.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ManagedInput {
    /// A result produced by an earlier resolution.
    Resolved(Box<ManagedResult>),

    /// Options not yet resolved.
    Pending(Box<ManagedOpts>),
}

impl From<ManagedOpts> for ManagedInput {
    fn from(opts: ManagedOpts) -> Self {
        Self::Pending(Box::new(opts))
    }
}

impl From<ManagedResult> for ManagedInput {
    fn from(result: ManagedResult) -> Self {
        Self::Resolved(Box::new(result))
    }
}

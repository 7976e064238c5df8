//! # DID Documents
//!
//! Types for DID documents and DID resolution results, per
//! [DID core](https://www.w3.org/TR/did-core/). Resolution itself is a
//! collaborator capability; these types carry its output, including
//! resolution errors reported inline in the resolution metadata.

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Kind;
use crate::jwk::PublicKeyJwk;

/// A parsed DID URL: `did:<method>:<id>[?<query>][#<fragment>]`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Did {
    /// The DID method, e.g. `jwk` or `web`.
    pub method: String,

    /// The method-specific identifier.
    pub id: String,

    /// DID URL query, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    /// DID URL fragment, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragment: Option<String>,
}

impl Did {
    /// Parse a DID URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not valid DID syntax. This is a
    /// hard precondition for resolution: an unparsable DID never reaches a
    /// resolver.
    pub fn parse(s: &str) -> Result<Self> {
        let Some(remainder) = s.strip_prefix("did:") else {
            bail!("DID must start with `did:`: {s}");
        };

        let (remainder, fragment) = match remainder.split_once('#') {
            Some((r, f)) => (r, Some(f.to_string())),
            None => (remainder, None),
        };
        let (remainder, query) = match remainder.split_once('?') {
            Some((r, q)) => (r, Some(q.to_string())),
            None => (remainder, None),
        };

        let Some((method, id)) = remainder.split_once(':') else {
            bail!("DID has no method-specific identifier: {s}");
        };
        if method.is_empty() || !method.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            bail!("invalid DID method: {s}");
        }
        if id.is_empty() {
            bail!("empty method-specific identifier: {s}");
        }

        Ok(Self {
            method: method.to_string(),
            id: id.to_string(),
            query,
            fragment,
        })
    }

    /// The bare DID, without query or fragment.
    #[must_use]
    pub fn did(&self) -> String {
        format!("did:{}:{}", self.method, self.id)
    }
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.did())?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

/// A DID document.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// The JSON-LD context.
    #[serde(rename = "@context")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// The DID the document describes.
    pub id: String,

    /// Other identifiers for the same subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub also_known_as: Option<Vec<String>>,

    /// Entities authorized to make changes to the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<Vec<String>>,

    /// Verification methods the subject can use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<Vec<VerificationMethod>>,

    /// Authentication relationship.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Vec<Kind<VerificationMethod>>>,

    /// Assertion method relationship.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion_method: Option<Vec<Kind<VerificationMethod>>>,

    /// Key agreement relationship.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_agreement: Option<Vec<Kind<VerificationMethod>>>,

    /// Capability invocation relationship.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability_invocation: Option<Vec<Kind<VerificationMethod>>>,

    /// Capability delegation relationship.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability_delegation: Option<Vec<Kind<VerificationMethod>>>,

    /// Services associated with the subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<Vec<Service>>,
}

impl Document {
    /// Verification methods referenced by the given relationship.
    ///
    /// Entries given as bare ids are looked up in the document's
    /// `verificationMethod` list; inline entries are returned as-is.
    /// `VerificationRelationship::VerificationMethod` returns the full
    /// `verificationMethod` list.
    #[must_use]
    pub fn methods_for(&self, relationship: VerificationRelationship) -> Vec<VerificationMethod> {
        let entries = match relationship {
            VerificationRelationship::VerificationMethod => {
                return self.verification_method.clone().unwrap_or_default();
            }
            VerificationRelationship::Authentication => &self.authentication,
            VerificationRelationship::AssertionMethod => &self.assertion_method,
            VerificationRelationship::KeyAgreement => &self.key_agreement,
            VerificationRelationship::CapabilityInvocation => &self.capability_invocation,
            VerificationRelationship::CapabilityDelegation => &self.capability_delegation,
        };

        let Some(entries) = entries else {
            return Vec::new();
        };
        entries
            .iter()
            .filter_map(|entry| match entry {
                Kind::Object(vm) => Some(vm.clone()),
                Kind::String(id) => self
                    .verification_method
                    .as_ref()
                    .and_then(|vms| vms.iter().find(|vm| &vm.id == id))
                    .cloned(),
            })
            .collect()
    }
}

/// A verification method within a DID document.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// The verification method id, a DID URL.
    pub id: String,

    /// The verification method type, e.g. `JsonWebKey2020`.
    #[serde(rename = "type")]
    pub type_: String,

    /// The DID controlling the verification method.
    pub controller: String,

    /// Key material as a JWK.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_jwk: Option<PublicKeyJwk>,

    /// Key material as a multibase string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_multibase: Option<String>,
}

impl VerificationMethod {
    /// The verification method's key as a JWK.
    ///
    /// # Errors
    ///
    /// Returns an error if the verification method carries no JWK.
    pub fn jwk(&self) -> Result<PublicKeyJwk> {
        self.public_key_jwk
            .clone()
            .ok_or_else(|| anyhow!("verification method {} has no JWK", self.id))
    }
}

/// A service endpoint within a DID document.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// The service id.
    pub id: String,

    /// The service type.
    #[serde(rename = "type")]
    pub type_: String,

    /// The service endpoint: a URL or a richer object.
    pub service_endpoint: Value,
}

/// A verification relationship between a DID subject and a verification
/// method.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum VerificationRelationship {
    /// Assertion method (issuing credentials, signing statements).
    #[default]
    AssertionMethod,

    /// Authentication.
    Authentication,

    /// Key agreement (encryption).
    KeyAgreement,

    /// Capability invocation.
    CapabilityInvocation,

    /// Capability delegation.
    CapabilityDelegation,

    /// The document's full verification method list.
    VerificationMethod,
}

impl VerificationRelationship {
    /// The search order used when a requested relationship yields no keys
    /// and fallback is permitted.
    pub const FALLBACK_ORDER: [Self; 6] = [
        Self::AssertionMethod,
        Self::Authentication,
        Self::KeyAgreement,
        Self::CapabilityInvocation,
        Self::CapabilityDelegation,
        Self::VerificationMethod,
    ];
}

impl std::fmt::Display for VerificationRelationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AssertionMethod => write!(f, "assertionMethod"),
            Self::Authentication => write!(f, "authentication"),
            Self::KeyAgreement => write!(f, "keyAgreement"),
            Self::CapabilityInvocation => write!(f, "capabilityInvocation"),
            Self::CapabilityDelegation => write!(f, "capabilityDelegation"),
            Self::VerificationMethod => write!(f, "verificationMethod"),
        }
    }
}

/// Returned by DID resolution.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DidResolutionResult {
    /// The DID resolution context.
    #[serde(rename = "@context")]
    pub context: String,

    /// The resolved DID document. Empty when resolution failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub did_document: Option<Document>,

    /// Resolution metadata, including any resolution error.
    pub did_resolution_metadata: ResolutionMetadata,

    /// DID document metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub did_document_metadata: Option<DocumentMetadata>,
}

impl DidResolutionResult {
    const CONTEXT: &'static str = "https://w3id.org/did-resolution/v1";

    /// A successful resolution result for the given document.
    #[must_use]
    pub fn success(document: Document) -> Self {
        Self {
            context: Self::CONTEXT.to_string(),
            did_document: Some(document),
            ..Self::default()
        }
    }

    /// A failed resolution result. The failure is carried in the
    /// resolution metadata, not thrown.
    #[must_use]
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            context: Self::CONTEXT.to_string(),
            did_resolution_metadata: ResolutionMetadata {
                error: Some(code.into()),
                error_message: Some(message.into()),
                ..ResolutionMetadata::default()
            },
            ..Self::default()
        }
    }
}

/// Metadata describing the outcome of the resolution process.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionMetadata {
    /// The Media Type of the returned resource.
    pub content_type: ContentType,

    /// The resolution error code, if resolution failed. Common values are
    /// `invalidDid` and `notFound`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// A human-readable explanation of the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// The Media Type of the returned resource.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum ContentType {
    /// JSON-LD representation of a DID document.
    #[default]
    #[serde(rename = "application/did+ld+json")]
    DidLdJson,
}

/// DID document metadata.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// Timestamp of the document's creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// Timestamp of the document's last update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,

    /// Whether the DID has been deactivated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivated: Option<bool>,
}

//! DID documents and the public keys they publish.

use serde::{Deserialize, Serialize};

/// A resolved DID document, reduced to what signature verification needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    /// The DID this document describes.
    pub id: String,
    /// Keys the subject may sign with.
    #[serde(default)]
    pub public_key: Vec<PublicKey>,
}

impl DidDocument {
    /// Create a document with no keys.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            public_key: Vec::new(),
        }
    }

    /// Add a key to this document.
    pub fn with_key(mut self, key: PublicKey) -> Self {
        self.public_key.push(key);
        self
    }

    /// Find the key a commit's `kid` refers to.
    ///
    /// Key ids may be absolute (`did:example:alice#key-1`) or relative to the
    /// document (`#key-1`); both forms match an absolute `kid`.
    pub fn public_key(&self, kid: &str) -> Option<&PublicKey> {
        self.public_key.iter().find(|key| {
            if key.id == kid {
                return true;
            }
            key.id.starts_with('#')
                && kid
                    .strip_prefix(self.id.as_str())
                    .is_some_and(|fragment| fragment == key.id)
        })
    }
}

/// A public key entry in a DID document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKey {
    /// Key id, absolute or `#fragment`.
    pub id: String,
    /// Verification method type, e.g. `Ed25519VerificationKey2018`.
    #[serde(rename = "type")]
    pub key_type: String,
    /// DID that controls the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    /// The key material.
    pub public_key_jwk: Jwk,
}

/// JSON Web Key material. Coordinates are base64url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type: `OKP` or `EC`.
    pub kty: String,
    /// Curve name: `Ed25519` or `secp256k1`.
    pub crv: String,
    /// Public point x coordinate (or the whole key for `OKP`).
    pub x: String,
    /// Public point y coordinate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

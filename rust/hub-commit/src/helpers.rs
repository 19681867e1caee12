//! Test helpers for issuing signed commits.
//!
//! A [`TestIdentity`] owns a deterministic Ed25519 key, publishes a matching
//! DID document, and signs commit envelopes built with [`CommitBuilder`].

use ed25519_dalek::{Signer, SigningKey};
use hub_common::encoding;
use serde_json::{Map, Value, json};

use crate::{
    did::{DidDocument, Jwk, PublicKey},
    headers::{BASIC_COMMIT_STRATEGY, Operation},
    resolver::StaticResolver,
    signed::SignedCommit,
};

/// A DID with an Ed25519 signing key.
#[derive(Debug, Clone)]
pub struct TestIdentity {
    did: String,
    key: SigningKey,
}

impl TestIdentity {
    /// `did:example:<name>` with a key derived from `seed`.
    pub fn new(name: &str, seed: u8) -> Self {
        Self {
            did: format!("did:example:{name}"),
            key: SigningKey::from_bytes(&[seed; 32]),
        }
    }

    /// This identity's DID.
    pub fn did(&self) -> &str {
        &self.did
    }

    /// Id of the signing key inside the DID document.
    pub fn kid(&self) -> String {
        format!("{}#key-1", self.did)
    }

    /// A DID document publishing the signing key.
    pub fn document(&self) -> DidDocument {
        DidDocument::new(&self.did).with_key(PublicKey {
            id: "#key-1".into(),
            key_type: "Ed25519VerificationKey2018".into(),
            controller: Some(self.did.clone()),
            public_key_jwk: Jwk {
                kty: "OKP".into(),
                crv: "Ed25519".into(),
                x: encoding::encode(self.key.verifying_key().as_bytes()),
                y: None,
            },
        })
    }

    /// Sign a protected header and payload into a commit envelope.
    pub fn sign(&self, protected: &Value, payload: &Value) -> Value {
        let protected = encoding::encode(serde_json::to_vec(protected).unwrap_or_default());
        let payload = encoding::encode(serde_json::to_vec(payload).unwrap_or_default());
        let signature = self.key.sign(format!("{protected}.{payload}").as_bytes());
        json!({
            "protected": protected,
            "payload": payload,
            "signature": encoding::encode(signature.to_bytes()),
        })
    }

    /// Start a commit signed by this identity, owned by this identity.
    pub fn commit(&self) -> CommitBuilder<'_> {
        CommitBuilder::new(self)
    }
}

/// A resolver knowing the documents of `identities`.
pub fn resolver_for(identities: &[&TestIdentity]) -> StaticResolver {
    identities
        .iter()
        .fold(StaticResolver::new(), |resolver, identity| {
            resolver.with_document(identity.document())
        })
}

/// Builds protected headers for a [`TestIdentity`] to sign.
///
/// Defaults to a `basic` create of a `example.com`/`Person` object in
/// `Collections`, committed at 2019-01-01T00:00:00Z.
#[derive(Debug, Clone)]
pub struct CommitBuilder<'a> {
    identity: &'a TestIdentity,
    headers: Map<String, Value>,
    payload: Value,
}

impl<'a> CommitBuilder<'a> {
    fn new(identity: &'a TestIdentity) -> Self {
        let mut headers = Map::new();
        headers.insert("interface".into(), json!("Collections"));
        headers.insert("context".into(), json!("example.com"));
        headers.insert("type".into(), json!("Person"));
        headers.insert("operation".into(), json!("create"));
        headers.insert("committed_at".into(), json!("2019-01-01T00:00:00Z"));
        headers.insert("commit_strategy".into(), json!(BASIC_COMMIT_STRATEGY));
        headers.insert("sub".into(), json!(identity.did()));
        headers.insert("kid".into(), json!(identity.kid()));
        headers.insert("alg".into(), json!("EdDSA"));
        Self {
            identity,
            headers,
            payload: json!({}),
        }
    }

    /// Set an arbitrary protected header.
    pub fn header(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    /// Target interface.
    pub fn interface(self, interface: &str) -> Self {
        self.header("interface", interface)
    }

    /// Object context.
    pub fn context(self, context: &str) -> Self {
        self.header("context", context)
    }

    /// Object type.
    pub fn object_type(self, object_type: &str) -> Self {
        self.header("type", object_type)
    }

    /// Owner DID.
    pub fn sub(self, sub: &str) -> Self {
        self.header("sub", sub)
    }

    /// Commit strategy.
    pub fn strategy(self, strategy: &str) -> Self {
        self.header("commit_strategy", strategy)
    }

    /// Commit timestamp, RFC 3339.
    pub fn committed_at(self, committed_at: &str) -> Self {
        self.header("committed_at", committed_at)
    }

    /// An update of `object_id`.
    pub fn update(self, object_id: &str) -> Self {
        self.header("operation", Operation::Update.as_str())
            .header("object_id", object_id)
    }

    /// A delete of `object_id`.
    pub fn delete(self, object_id: &str) -> Self {
        self.header("operation", Operation::Delete.as_str())
            .header("object_id", object_id)
    }

    /// Commit payload.
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// The signed wire envelope.
    pub fn envelope(&self) -> Value {
        self.identity
            .sign(&Value::Object(self.headers.clone()), &self.payload)
    }

    /// The parsed signed commit.
    ///
    /// # Panics
    ///
    /// Panics if the headers do not form a valid commit.
    pub fn build(&self) -> SignedCommit {
        SignedCommit::parse(&self.envelope()).expect("builder produced an invalid commit")
    }
}

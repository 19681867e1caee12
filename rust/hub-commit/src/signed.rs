//! Commits carrying a signature.

use std::{ops::Deref, sync::Arc};

use hub_common::{HubError, encoding};
use serde_json::Value;

use crate::{
    commit::Commit,
    resolver::{DidResolver, ResolveError},
    suite::{CryptoRegistry, VerifyError},
};

/// Everything [`SignedCommit::validate`] needs to check a signature.
///
/// Built once by the caller and passed to every validation, so no resolver or
/// suite registry lives in global state.
#[derive(Clone)]
pub struct VerificationContext {
    resolver: Arc<dyn DidResolver>,
    suites: CryptoRegistry,
}

impl VerificationContext {
    /// A context resolving DIDs with `resolver` and verifying with every
    /// compiled suite.
    pub fn new(resolver: impl DidResolver + 'static) -> Self {
        Self {
            resolver: Arc::new(resolver),
            suites: CryptoRegistry::default(),
        }
    }

    /// Replace the suite registry.
    pub fn with_suites(mut self, suites: CryptoRegistry) -> Self {
        self.suites = suites;
        self
    }

    /// The DID resolver.
    pub fn resolver(&self) -> &dyn DidResolver {
        self.resolver.as_ref()
    }

    /// The suite registry.
    pub fn suites(&self) -> &CryptoRegistry {
        &self.suites
    }
}

impl std::fmt::Debug for VerificationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationContext")
            .field("suites", &self.suites)
            .finish_non_exhaustive()
    }
}

/// A [`Commit`] together with its signature.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedCommit {
    commit: Commit,
    signature: String,
}

impl SignedCommit {
    /// Parse a commit envelope that must carry a `signature` string.
    pub fn parse(envelope: &Value) -> Result<Self, HubError> {
        let commit = Commit::parse(envelope)?;
        let signature = match envelope.get("signature") {
            None | Some(Value::Null) => {
                return Err(HubError::missing_parameter("commit.signature"));
            }
            Some(Value::String(signature)) => signature.clone(),
            Some(_) => return Err(HubError::incorrect_parameter("commit.signature")),
        };
        Ok(Self { commit, signature })
    }

    /// The encoded signature.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The unsigned commit.
    pub fn commit(&self) -> &Commit {
        &self.commit
    }

    /// Verify the signature against the key the issuer's DID document
    /// publishes under the commit's `kid`.
    ///
    /// # Errors
    ///
    /// - `BadRequest("commit", "public key not found")` when the document has
    ///   no key for `kid`.
    /// - `BadRequest("commit.signature", ..)` when the signature does not
    ///   verify, carrying the crypto layer's reason.
    #[tracing::instrument(skip_all, fields(rev = %self.revision(), iss = self.issuer()))]
    pub async fn validate(&self, context: &VerificationContext) -> Result<(), HubError> {
        let headers = self.protected_headers();
        let alg = headers
            .alg
            .as_deref()
            .ok_or_else(|| HubError::missing_parameter("commit.protected.alg"))?;
        let suite = context.suites().get(alg).ok_or_else(|| {
            HubError::bad_request(
                "commit.protected.alg",
                format!("unsupported signature algorithm: {alg}"),
            )
        })?;

        let document = context
            .resolver()
            .resolve(self.issuer())
            .await
            .map_err(|e| match e {
                ResolveError::NotFound(_) => {
                    HubError::bad_request("commit.protected.kid", e.to_string())
                }
                ResolveError::Unavailable(_) => HubError::server_error(e.to_string()),
            })?;

        let key = document
            .public_key(&headers.kid)
            .ok_or_else(|| HubError::bad_request("commit", "public key not found"))?;

        let signature = encoding::decode(&self.signature)
            .map_err(|_| HubError::incorrect_parameter("commit.signature"))?;

        suite
            .verify(key, &self.signing_input(), &signature)
            .map_err(|e| match e {
                VerifyError::UnsupportedKey { .. } | VerifyError::MalformedKey(_) => {
                    HubError::bad_request("commit.protected.kid", e.to_string())
                }
                VerifyError::MalformedSignature => {
                    HubError::incorrect_parameter("commit.signature")
                }
                VerifyError::Mismatch(_) => HubError::bad_request(
                    "commit.signature",
                    format!("signature verification failed: {e}"),
                ),
            })?;

        tracing::debug!("commit signature verified");
        Ok(())
    }

    /// Re-emit the signed envelope.
    pub fn to_json(&self) -> Value {
        let mut envelope = self.commit.to_json();
        envelope["signature"] = Value::String(self.signature.clone());
        envelope
    }
}

impl Deref for SignedCommit {
    type Target = Commit;

    fn deref(&self) -> &Self::Target {
        &self.commit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        did::{DidDocument, Jwk, PublicKey},
        resolver::StaticResolver,
    };
    use ed25519_dalek::{Signer, SigningKey};
    use hub_common::ErrorCode;
    use serde_json::json;
    use testresult::TestResult;

    const ALICE: &str = "did:example:alice";

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[9u8; 32])
    }

    fn document(key: &SigningKey) -> DidDocument {
        DidDocument::new(ALICE).with_key(PublicKey {
            id: "#key-1".into(),
            key_type: "Ed25519VerificationKey2018".into(),
            controller: Some(ALICE.into()),
            public_key_jwk: Jwk {
                kty: "OKP".into(),
                crv: "Ed25519".into(),
                x: encoding::encode(key.verifying_key().as_bytes()),
                y: None,
            },
        })
    }

    fn signed_envelope(key: &SigningKey, kid: &str) -> Value {
        let protected = encoding::encode(
            serde_json::to_vec(&json!({
                "interface": "Collections",
                "context": "example.com",
                "type": "Person",
                "operation": "create",
                "committed_at": "2019-01-01T00:00:00Z",
                "commit_strategy": "basic",
                "sub": ALICE,
                "kid": kid,
                "alg": "EdDSA",
            }))
            .unwrap(),
        );
        let payload = encoding::encode(br#"{"name":"Alice"}"#);
        let signature = key.sign(format!("{protected}.{payload}").as_bytes());
        json!({
            "protected": protected,
            "payload": payload,
            "signature": encoding::encode(signature.to_bytes()),
        })
    }

    fn context(key: &SigningKey) -> VerificationContext {
        VerificationContext::new(StaticResolver::new().with_document(document(key)))
    }

    #[tokio::test]
    async fn it_validates_a_correct_signature() -> TestResult {
        let key = signing_key();
        let commit = SignedCommit::parse(&signed_envelope(&key, "did:example:alice#key-1"))?;
        commit.validate(&context(&key)).await?;
        Ok(())
    }

    #[tokio::test]
    async fn it_fails_when_the_key_is_not_published() -> TestResult {
        let key = signing_key();
        let commit = SignedCommit::parse(&signed_envelope(&key, "did:example:alice#key-9"))?;
        let err = commit.validate(&context(&key)).await.unwrap_err();
        assert_eq!(err, HubError::bad_request("commit", "public key not found"));
        Ok(())
    }

    #[tokio::test]
    async fn it_reports_signature_mismatches_distinctly() -> TestResult {
        let key = signing_key();
        let impostor = SigningKey::from_bytes(&[10u8; 32]);
        let commit = SignedCommit::parse(&signed_envelope(&impostor, "did:example:alice#key-1"))?;

        let err = commit.validate(&context(&key)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRequest);
        assert_eq!(err.property.as_deref(), Some("commit.signature"));
        assert!(
            err.developer_message
                .as_deref()
                .is_some_and(|m| m.starts_with("signature verification failed"))
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_fails_for_unresolvable_issuers() -> TestResult {
        let key = signing_key();
        let commit = SignedCommit::parse(&signed_envelope(&key, "did:example:alice#key-1"))?;
        let context = VerificationContext::new(StaticResolver::new());

        let err = commit.validate(&context).await.unwrap_err();
        assert_eq!(err.property.as_deref(), Some("commit.protected.kid"));
        Ok(())
    }

    #[tokio::test]
    async fn it_fails_for_unregistered_algorithms() -> TestResult {
        let key = signing_key();
        let commit = SignedCommit::parse(&signed_envelope(&key, "did:example:alice#key-1"))?;
        let context = context(&key).with_suites(CryptoRegistry::empty());

        let err = commit.validate(&context).await.unwrap_err();
        assert_eq!(err.property.as_deref(), Some("commit.protected.alg"));
        Ok(())
    }

    #[test]
    fn it_requires_a_signature() {
        let mut envelope = signed_envelope(&signing_key(), "did:example:alice#key-1");
        envelope.as_object_mut().unwrap().remove("signature");
        let err = SignedCommit::parse(&envelope).unwrap_err();
        assert_eq!(err.property.as_deref(), Some("commit.signature"));
    }

    #[test]
    fn it_round_trips_the_signed_envelope() {
        let envelope = signed_envelope(&signing_key(), "did:example:alice#key-1");
        let commit = SignedCommit::parse(&envelope).unwrap();
        assert_eq!(commit.to_json(), envelope);
    }
}

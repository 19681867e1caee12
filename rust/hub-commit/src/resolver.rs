//! DID-to-document resolution.

use std::collections::HashMap;

use async_trait::async_trait;
use hub_common::ConditionalSync;
use thiserror::Error;

use crate::did::DidDocument;

/// Errors a [`DidResolver`] can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No document exists for the DID.
    #[error("DID not found: {0}")]
    NotFound(String),

    /// The resolution backend failed.
    #[error("DID resolution failed: {0}")]
    Unavailable(String),
}

/// Resolves a DID to its document.
///
/// Async to support network-based DID methods. Timeouts are the
/// implementation's concern.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait DidResolver: ConditionalSync {
    /// Resolve `did` to its document.
    async fn resolve(&self, did: &str) -> Result<DidDocument, ResolveError>;
}

/// A resolver over a fixed set of documents.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    documents: HashMap<String, DidDocument>,
}

impl StaticResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document, keyed by its id.
    pub fn with_document(mut self, document: DidDocument) -> Self {
        self.documents.insert(document.id.clone(), document);
        self
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl DidResolver for StaticResolver {
    async fn resolve(&self, did: &str) -> Result<DidDocument, ResolveError> {
        self.documents
            .get(did)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound(did.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn it_resolves_known_documents() {
        let resolver = StaticResolver::new().with_document(DidDocument::new("did:example:alice"));

        let document = resolver.resolve("did:example:alice").await.unwrap();
        assert_eq!(document.id, "did:example:alice");

        let missing = resolver.resolve("did:example:bob").await;
        assert_eq!(missing, Err(ResolveError::NotFound("did:example:bob".into())));
    }
}

//! A [`Store`] wrapper recording every call.
//!
//! Useful in tests that need to assert which lookups a code path performs,
//! e.g. that the owner never triggers a permission grant lookup.

use std::sync::Arc;

use async_trait::async_trait;
use hub_common::HubError;
use hub_commit::SignedCommit;
use parking_lot::RwLock;

use super::{CommitResult, ObjectContainer, QueryRequest, QueryResult, Store};

/// The store method a journal entry records.
#[derive(Debug, Clone, PartialEq)]
pub enum JournalEntry {
    /// A commit was written for `owner`.
    Commit {
        /// Partition written.
        owner: String,
        /// Revision written.
        rev: String,
    },
    /// Objects were queried.
    QueryObjects(QueryRequest),
    /// Commits were queried.
    QueryCommits(QueryRequest),
}

/// Wraps a store and records the calls made to it.
#[derive(Debug, Clone)]
pub struct JournaledStore<S> {
    inner: S,
    log: Arc<RwLock<Vec<JournalEntry>>>,
}

impl<S> JournaledStore<S> {
    /// Start journaling calls to `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            log: Arc::default(),
        }
    }

    /// Entries recorded so far, oldest first.
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.log.read().clone()
    }

    /// Forget recorded entries.
    pub fn clear(&self) {
        self.log.write().clear();
    }

    fn record(&self, entry: JournalEntry) {
        self.log.write().push(entry);
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl<S: Store> Store for JournaledStore<S> {
    async fn commit(&self, owner: &str, commit: &SignedCommit) -> Result<CommitResult, HubError> {
        self.record(JournalEntry::Commit {
            owner: owner.to_string(),
            rev: commit.revision().to_string(),
        });
        self.inner.commit(owner, commit).await
    }

    async fn query_objects(
        &self,
        query: &QueryRequest,
    ) -> Result<QueryResult<ObjectContainer>, HubError> {
        self.record(JournalEntry::QueryObjects(query.clone()));
        self.inner.query_objects(query).await
    }

    async fn query_commits(
        &self,
        query: &QueryRequest,
    ) -> Result<QueryResult<SignedCommit>, HubError> {
        self.record(JournalEntry::QueryCommits(query.clone()));
        self.inner.query_commits(query).await
    }
}

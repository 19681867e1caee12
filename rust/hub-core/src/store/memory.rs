//! Volatile in-memory store.
//!
//! Each owner DID maps to a `Partition` holding the owner's commits in
//! arrival order and one [`ObjectContainer`] per create commit. Data is lost
//! when the store is dropped. Pages are addressed by offset: the skip token is
//! the decimal index of the first record on the next page.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use hub_common::{DEFAULT_PAGE_SIZE, HubError, Revision, Settings};
use hub_commit::{Operation, SignedCommit};
use parking_lot::RwLock;

use super::{
    CommitResult, ObjectContainer, QueryFilter, QueryRequest, QueryResult, Store, commit_field,
};

#[derive(Debug, Default)]
struct Partition {
    commits: Vec<SignedCommit>,
    revisions: HashSet<Revision>,
    objects: Vec<ObjectContainer>,
}

/// A [`Store`] keeping everything in process memory.
#[derive(Debug)]
pub struct VolatileStore {
    page_size: usize,
    partitions: RwLock<HashMap<String, Partition>>,
}

impl Default for VolatileStore {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl VolatileStore {
    /// An empty store with the default page size.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty store returning at most `page_size` records per page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            partitions: RwLock::new(HashMap::new()),
        }
    }

    /// An empty store configured from `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_page_size(settings.page_size)
    }

    fn page<T: Clone>(
        &self,
        matching: Vec<&T>,
        skip_token: Option<&str>,
    ) -> Result<QueryResult<T>, HubError> {
        let offset = match skip_token {
            None => 0,
            Some(token) => token.parse::<usize>().map_err(|_| {
                HubError::bad_request("skip_token", format!("invalid skip token: {token}"))
            })?,
        };
        let end = offset.saturating_add(self.page_size).min(matching.len());
        let results = matching
            .get(offset..end)
            .map(|page| page.iter().map(|record| (*record).clone()).collect())
            .unwrap_or_default();
        let skip_token = (end < matching.len()).then(|| end.to_string());
        Ok(QueryResult {
            results,
            skip_token,
        })
    }
}

fn satisfies<'a>(filters: &[QueryFilter], field: impl Fn(&str) -> Option<&'a str>) -> bool {
    filters.iter().all(|filter| filter.matches(field(&filter.field)))
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Store for VolatileStore {
    async fn commit(&self, owner: &str, commit: &SignedCommit) -> Result<CommitResult, HubError> {
        let mut partitions = self.partitions.write();
        let partition = partitions.entry(owner.to_string()).or_default();

        if partition.revisions.insert(commit.revision().clone()) {
            if commit.operation() == Operation::Create {
                partition.objects.push(ObjectContainer::from_create(commit));
            }
            partition.commits.push(commit.clone());
            tracing::debug!(owner, rev = %commit.revision(), "stored commit");
        } else {
            tracing::debug!(owner, rev = %commit.revision(), "commit already stored");
        }

        let known_revisions = partition
            .commits
            .iter()
            .filter(|known| known.object_id() == commit.object_id())
            .map(|known| known.revision().clone())
            .collect();
        Ok(CommitResult { known_revisions })
    }

    async fn query_objects(
        &self,
        query: &QueryRequest,
    ) -> Result<QueryResult<ObjectContainer>, HubError> {
        let partitions = self.partitions.read();
        let Some(partition) = partitions.get(&query.owner) else {
            return self.page(Vec::new(), query.skip_token.as_deref());
        };
        let matching = partition
            .objects
            .iter()
            .filter(|object| satisfies(&query.filters, |field| object.field(field)))
            .collect();
        self.page(matching, query.skip_token.as_deref())
    }

    async fn query_commits(
        &self,
        query: &QueryRequest,
    ) -> Result<QueryResult<SignedCommit>, HubError> {
        let partitions = self.partitions.read();
        let Some(partition) = partitions.get(&query.owner) else {
            return self.page(Vec::new(), query.skip_token.as_deref());
        };
        let matching = partition
            .commits
            .iter()
            .filter(|commit| satisfies(&query.filters, |field| commit_field(commit, field)))
            .collect();
        self.page(matching, query.skip_token.as_deref())
    }
}

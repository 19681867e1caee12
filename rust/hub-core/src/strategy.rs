//! Folding an object's commits into its current state.
//!
//! The `basic` strategy picks one winning commit per object:
//!
//! 1. a commit that is not a create beats a create,
//! 2. a delete beats a commit that is not a delete,
//! 3. otherwise the later `committed_at` wins,
//! 4. and equal timestamps fall back to the greater revision.
//!
//! The rules are applied in both directions, which makes them a total order
//! and the fold independent of the order the store returns commits in. Once
//! an object has a delete, no later create or update can displace it.

use std::cmp::Ordering;

use hub_common::HubError;
use hub_commit::{BASIC_COMMIT_STRATEGY, Commit, Operation, SignedCommit};

use crate::{
    store::{QueryFilter, QueryRequest, Store},
    store_utils::query_get_all,
};

/// The `basic` commit strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicStrategy;

impl BasicStrategy {
    /// Resolve the winning commit of `object_id` in `owner`'s partition.
    ///
    /// Returns `None` when the object has no `basic` commits.
    pub async fn resolve_object<S>(
        owner: &str,
        object_id: &str,
        store: &S,
    ) -> Result<Option<SignedCommit>, HubError>
    where
        S: Store + ?Sized,
    {
        let query = QueryRequest::new(owner, vec![QueryFilter::eq("object_id", object_id)]);
        let commits = query_get_all(|skip_token| {
            let query = query.clone().with_skip_token(skip_token);
            async move { store.query_commits(&query).await }
        })
        .await?;
        Ok(Self::fold(commits))
    }

    /// The winning commit among `commits`, ignoring those of other strategies.
    pub fn fold<C>(commits: impl IntoIterator<Item = C>) -> Option<C>
    where
        C: std::ops::Deref<Target = Commit>,
    {
        commits
            .into_iter()
            .filter(|commit| commit.commit_strategy() == BASIC_COMMIT_STRATEGY)
            .reduce(|latest, current| {
                if Self::compare(&current, &latest) == Ordering::Greater {
                    current
                } else {
                    latest
                }
            })
    }

    /// Order two commits of the same object; the greater one wins.
    pub fn compare(a: &Commit, b: &Commit) -> Ordering {
        rank(a.operation())
            .cmp(&rank(b.operation()))
            .then_with(|| {
                a.protected_headers()
                    .committed_at
                    .cmp(&b.protected_headers().committed_at)
            })
            .then_with(|| a.revision().cmp(b.revision()))
    }
}

fn rank(operation: Operation) -> u8 {
    match operation {
        Operation::Create => 0,
        Operation::Update => 1,
        Operation::Delete => 2,
    }
}

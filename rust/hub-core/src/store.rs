//! Persistence seam for commits and object metadata.
//!
//! Stores are partitioned by owner DID. Queries are paged: a result carrying a
//! `skip_token` has more records behind it, and the token is passed back to
//! fetch the next page.

mod journal;
mod memory;

pub use journal::*;
pub use memory::*;

use async_trait::async_trait;
use hub_common::{ConditionalSend, ConditionalSync, HubError, Revision};
use hub_commit::SignedCommit;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Right-hand side of an equality filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// The field equals this value.
    One(String),
    /// The field equals any of these values.
    Any(Vec<String>),
}

/// An equality predicate on a named field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilter {
    /// Field name, e.g. `interface` or `object_id`.
    pub field: String,
    /// Accepted value(s).
    pub value: FilterValue,
}

impl QueryFilter {
    /// `field == value`
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: FilterValue::One(value.into()),
        }
    }

    /// `field` equals any of `values`.
    pub fn any<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            field: field.into(),
            value: FilterValue::Any(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Whether `actual` satisfies this filter.
    pub fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match &self.value {
            FilterValue::One(expected) => expected == actual,
            FilterValue::Any(expected) => expected.iter().any(|value| value == actual),
        }
    }
}

/// Metadata describing one logical object, derived from its create commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectContainer {
    /// Interface the object lives in.
    pub interface: String,
    /// Schema context.
    pub context: String,
    /// Schema type.
    #[serde(rename = "type")]
    pub r#type: String,
    /// Object id: the revision of the create commit.
    pub id: String,
    /// DID that issued the create commit.
    pub created_by: String,
    /// `committed_at` of the create commit.
    pub created_at: String,
    /// Owner DID.
    pub sub: String,
    /// Strategy folding the object's commits.
    pub commit_strategy: String,
    /// Store-specific extras.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ObjectContainer {
    /// Metadata for the object `commit` creates.
    pub fn from_create(commit: &SignedCommit) -> Self {
        let headers = commit.protected_headers();
        Self {
            interface: headers.interface.to_string(),
            context: headers.context.clone(),
            r#type: headers.r#type.clone(),
            id: commit.object_id().to_string(),
            created_by: commit.issuer().to_string(),
            created_at: headers.committed_at.to_rfc3339(),
            sub: headers.sub.clone(),
            commit_strategy: headers.commit_strategy.clone(),
            meta: None,
        }
    }

    /// Value of a filterable field.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "interface" => Some(&self.interface),
            "context" => Some(&self.context),
            "type" => Some(&self.r#type),
            "id" | "object_id" => Some(&self.id),
            "created_by" => Some(&self.created_by),
            "sub" => Some(&self.sub),
            "commit_strategy" => Some(&self.commit_strategy),
            _ => None,
        }
    }
}

/// Value of a filterable commit field.
pub fn commit_field<'a>(commit: &'a SignedCommit, name: &str) -> Option<&'a str> {
    let headers = commit.protected_headers();
    match name {
        "object_id" => Some(commit.object_id()),
        "rev" => Some(commit.revision().as_str()),
        "interface" => Some(headers.interface.as_str()),
        "context" => Some(&headers.context),
        "type" => Some(&headers.r#type),
        "operation" => Some(headers.operation.as_str()),
        "commit_strategy" => Some(&headers.commit_strategy),
        "sub" => Some(&headers.sub),
        "iss" => Some(commit.issuer()),
        _ => None,
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    /// Records on this page.
    pub results: Vec<T>,
    /// Token for the next page, `None` when this is the last.
    pub skip_token: Option<String>,
}

impl<T> QueryResult<T> {
    /// A last page holding `results`.
    pub fn last(results: Vec<T>) -> Self {
        Self {
            results,
            skip_token: None,
        }
    }
}

/// A query scoped to one owner's partition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryRequest {
    /// Owner DID.
    pub owner: String,
    /// Conjunction of filters.
    pub filters: Vec<QueryFilter>,
    /// Token from the previous page.
    pub skip_token: Option<String>,
}

impl QueryRequest {
    /// Query everything in `owner`'s partition matching `filters`.
    pub fn new(owner: impl Into<String>, filters: Vec<QueryFilter>) -> Self {
        Self {
            owner: owner.into(),
            filters,
            skip_token: None,
        }
    }

    /// Continue from `skip_token`.
    pub fn with_skip_token(mut self, skip_token: Option<String>) -> Self {
        self.skip_token = skip_token;
        self
    }
}

/// Outcome of persisting a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitResult {
    /// Every revision the store holds for the commit's object.
    pub known_revisions: Vec<Revision>,
}

/// Storage for commits and the objects they describe.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait Store: ConditionalSend + ConditionalSync {
    /// Persist `commit` in `owner`'s partition. Committing a revision the
    /// store already holds is a no-op.
    async fn commit(&self, owner: &str, commit: &SignedCommit) -> Result<CommitResult, HubError>;

    /// One page of object metadata matching the query.
    async fn query_objects(
        &self,
        query: &QueryRequest,
    ) -> Result<QueryResult<ObjectContainer>, HubError>;

    /// One page of commits matching the query.
    async fn query_commits(
        &self,
        query: &QueryRequest,
    ) -> Result<QueryResult<SignedCommit>, HubError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_matches_single_and_any_values() {
        let single = QueryFilter::eq("type", "Person");
        assert!(single.matches(Some("Person")));
        assert!(!single.matches(Some("Place")));
        assert!(!single.matches(None));

        let any = QueryFilter::any("object_id", ["a", "b"]);
        assert!(any.matches(Some("b")));
        assert!(!any.matches(Some("c")));
    }

    #[test]
    fn it_reads_filters_from_json() {
        let filter: QueryFilter =
            serde_json::from_value(serde_json::json!({"field": "object_id", "value": ["a"]}))
                .unwrap();
        assert_eq!(filter, QueryFilter::any("object_id", ["a"]));
    }
}

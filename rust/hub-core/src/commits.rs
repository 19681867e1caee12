//! Answering commit queries.

use hub_common::HubError;
use hub_commit::SignedCommit;
use serde_json::{Map, Value};

use crate::{
    authorization::AuthorizationController,
    request::{CommitField, CommitQueryRequest},
    response::CommitQueryResponse,
    store::{QueryFilter, QueryRequest, Store},
};

/// Fetch one page of the requested commits and check the requester may read
/// each of them.
pub async fn handle_commit_query<S>(
    store: &S,
    authorization: &AuthorizationController,
    request: &CommitQueryRequest,
) -> Result<CommitQueryResponse, HubError>
where
    S: Store + ?Sized,
{
    let mut filters = vec![QueryFilter::any("object_id", request.object_ids.iter().cloned())];
    if let Some(revisions) = &request.revisions {
        filters.push(QueryFilter::any("rev", revisions.iter().cloned()));
    }

    let query = QueryRequest::new(request.base.sub.as_str(), filters)
        .with_skip_token(request.skip_token.clone());
    let page = store.query_commits(&query).await?;
    let commits = authorization.authorize_commits(request, page.results).await?;

    Ok(CommitQueryResponse {
        commits: commits
            .iter()
            .map(|commit| project(commit, request.fields.as_deref()))
            .collect(),
        skip_token: page.skip_token,
    })
}

fn project(commit: &SignedCommit, fields: Option<&[CommitField]>) -> Value {
    let Some(fields) = fields else {
        return commit.to_json();
    };
    let mut projected = Map::new();
    for field in fields {
        let value = match field {
            CommitField::Protected => Value::String(commit.encoded_protected().to_string()),
            CommitField::Payload => Value::String(commit.encoded_payload().to_string()),
            CommitField::Header => Value::Object(commit.unprotected_headers().clone()),
            CommitField::Signature => Value::String(commit.signature().to_string()),
        };
        projected.insert(field.as_str().to_string(), value);
    }
    Value::Object(projected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{request::BaseRequest, store::VolatileStore};
    use hub_commit::helpers::TestIdentity;
    use hub_common::ErrorCode;
    use serde_json::json;
    use std::sync::Arc;
    use testresult::TestResult;

    fn alice() -> TestIdentity {
        TestIdentity::new("alice", 1)
    }

    fn request(iss: &str, object_ids: Vec<String>) -> CommitQueryRequest {
        CommitQueryRequest {
            base: BaseRequest {
                iss: iss.into(),
                aud: "did:example:hub".into(),
                sub: alice().did().into(),
                r#type: "CommitQueryRequest".into(),
            },
            object_ids,
            revisions: None,
            fields: None,
            skip_token: None,
        }
    }

    #[tokio::test]
    async fn it_returns_an_objects_commits_to_the_owner() -> TestResult {
        let store = Arc::new(VolatileStore::new());
        let authorization = AuthorizationController::new(store.clone());
        let create = alice().commit().build();
        let update = alice()
            .commit()
            .update(create.object_id())
            .committed_at("2019-01-02T00:00:00Z")
            .build();
        store.commit(alice().did(), &create).await?;
        store.commit(alice().did(), &update).await?;
        let unrelated = alice().commit().committed_at("2019-05-05T00:00:00Z").build();
        store.commit(alice().did(), &unrelated).await?;

        let mut query = request(alice().did(), vec![create.object_id().into()]);
        let response = handle_commit_query(store.as_ref(), &authorization, &query).await?;
        assert_eq!(response.commits, vec![create.to_json(), update.to_json()]);

        query.revisions = Some(vec![update.revision().to_string()]);
        query.fields = Some(vec![CommitField::Signature]);
        let response = handle_commit_query(store.as_ref(), &authorization, &query).await?;
        assert_eq!(response.commits, vec![json!({"signature": update.signature()})]);
        Ok(())
    }

    #[tokio::test]
    async fn it_refuses_commits_the_requester_cannot_read() -> TestResult {
        let store = Arc::new(VolatileStore::new());
        let authorization = AuthorizationController::new(store.clone());
        let create = alice().commit().build();
        store.commit(alice().did(), &create).await?;

        let query = request("did:example:mallory", vec![create.object_id().into()]);
        let err = handle_commit_query(store.as_ref(), &authorization, &query)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionsRequired);
        Ok(())
    }
}

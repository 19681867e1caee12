//! Helpers built on the [`Store`] trait.

use std::future::Future;

use hub_common::HubError;

use crate::{
    permission::PermissionGrant,
    request::WriteRequest,
    response::WriteResponse,
    store::{QueryFilter, QueryRequest, QueryResult, Store},
};

/// Drain a paged query.
///
/// `fetch` is called with `None` first and then with each returned token,
/// until a page carries no token. An empty token also ends the query.
pub async fn query_get_all<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, HubError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<QueryResult<T>, HubError>>,
{
    let mut results = Vec::new();
    let mut skip_token = None;
    loop {
        let page = fetch(skip_token.take()).await?;
        results.extend(page.results);
        match page.skip_token {
            Some(token) if !token.is_empty() => skip_token = Some(token),
            _ => return Ok(results),
        }
    }
}

/// Whether the object a write addresses exists in the owner's partition.
///
/// When `grants` are given, the object must also have been created by a DID
/// some grant is not restricted away from.
///
/// # Errors
///
/// `ServerError` if more than one object matches, `PermissionsRequired` if the
/// object exists but no grant covers its creator.
pub async fn object_exists<S>(
    request: &WriteRequest,
    store: &S,
    grants: Option<&[PermissionGrant]>,
) -> Result<bool, HubError>
where
    S: Store + ?Sized,
{
    let query = QueryRequest::new(
        request.base.sub.as_str(),
        vec![
            QueryFilter::eq("interface", request.interface().as_str()),
            QueryFilter::eq("object_id", request.commit.object_id()),
            QueryFilter::eq("context", request.context()),
            QueryFilter::eq("type", request.object_type()),
        ],
    );
    let objects = store.query_objects(&query).await?.results;

    let object = match objects.as_slice() {
        [] => return Ok(false),
        [object] => object,
        _ => {
            tracing::warn!(
                count = objects.len(),
                object_id = request.commit.object_id(),
                "object id is not unique"
            );
            return Err(HubError::server_error(format!(
                "{} objects share id {}",
                objects.len(),
                request.commit.object_id()
            )));
        }
    };

    if let Some(grants) = grants {
        let covered = grants.iter().any(|grant| {
            grant
                .created_by
                .as_deref()
                .is_none_or(|creator| creator == object.created_by)
        });
        if !covered {
            return Err(HubError::permissions_required());
        }
    }
    Ok(true)
}

/// Persist the write's commit under the request owner.
pub async fn write_commit<S>(request: &WriteRequest, store: &S) -> Result<WriteResponse, HubError>
where
    S: Store + ?Sized,
{
    let result = store.commit(&request.base.sub, &request.commit).await?;
    Ok(WriteResponse {
        revisions: result
            .known_revisions
            .into_iter()
            .map(String::from)
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        permission::{OWNER_PERMISSION, PermissionGrant},
        request::BaseRequest,
        store::{CommitResult, ObjectContainer, VolatileStore},
    };
    use async_trait::async_trait;
    use hub_commit::{SignedCommit, helpers::TestIdentity};
    use hub_common::ErrorCode;
    use testresult::TestResult;

    fn alice() -> TestIdentity {
        TestIdentity::new("alice", 1)
    }

    fn write(commit: SignedCommit) -> WriteRequest {
        WriteRequest {
            base: BaseRequest {
                iss: alice().did().into(),
                aud: "did:example:hub".into(),
                sub: alice().did().into(),
                r#type: "WriteRequest".into(),
            },
            commit,
        }
    }

    fn grant(created_by: Option<&str>) -> PermissionGrant {
        PermissionGrant {
            owner: alice().did().into(),
            grantee: "did:example:bob".into(),
            allow: "-RU--".parse().unwrap(),
            context: "example.com".into(),
            r#type: "Person".into(),
            created_by: created_by.map(str::to_string),
        }
    }

    /// Returns the same object twice for any query.
    struct DuplicatingStore(ObjectContainer);

    #[async_trait]
    impl Store for DuplicatingStore {
        async fn commit(&self, _: &str, _: &SignedCommit) -> Result<CommitResult, HubError> {
            Err(HubError::not_implemented("commit"))
        }

        async fn query_objects(
            &self,
            _: &QueryRequest,
        ) -> Result<QueryResult<ObjectContainer>, HubError> {
            Ok(QueryResult::last(vec![self.0.clone(), self.0.clone()]))
        }

        async fn query_commits(
            &self,
            _: &QueryRequest,
        ) -> Result<QueryResult<SignedCommit>, HubError> {
            Ok(QueryResult::last(vec![]))
        }
    }

    #[tokio::test]
    async fn it_drains_every_page() -> TestResult {
        let pages = [Some("1"), Some("2"), None];
        let mut calls = Vec::new();
        let all = query_get_all(|token| {
            let index = token
                .as_deref()
                .map_or(0, |token| token.parse::<usize>().unwrap());
            calls.push(token);
            let skip_token = pages[index].map(str::to_string);
            async move {
                Ok::<_, HubError>(QueryResult {
                    results: vec![index],
                    skip_token,
                })
            }
        })
        .await?;

        assert_eq!(all, vec![0, 1, 2]);
        assert_eq!(calls, vec![None, Some("1".into()), Some("2".into())]);
        Ok(())
    }

    #[tokio::test]
    async fn it_stops_on_the_first_error() {
        let result: Result<Vec<()>, _> =
            query_get_all(|_| async { Err(HubError::server_error("down")) }).await;
        assert_eq!(result.unwrap_err().code, ErrorCode::ServerError);
    }

    #[tokio::test]
    async fn it_reports_whether_the_object_exists() -> TestResult {
        let store = VolatileStore::new();
        let create = alice().commit().build();
        let update = write(alice().commit().update(create.object_id()).build());

        assert!(!object_exists(&update, &store, None).await?);
        write_commit(&write(create), &store).await?;
        assert!(object_exists(&update, &store, None).await?);
        Ok(())
    }

    #[tokio::test]
    async fn it_checks_the_creator_against_restricted_grants() -> TestResult {
        let store = VolatileStore::new();
        let create = alice().commit().build();
        let update = write(alice().commit().update(create.object_id()).build());
        write_commit(&write(create), &store).await?;

        let restricted = [grant(Some("did:example:bob"))];
        let err = object_exists(&update, &store, Some(&restricted))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionsRequired);

        let mixed = [grant(Some("did:example:bob")), grant(Some(alice().did()))];
        assert!(object_exists(&update, &store, Some(&mixed)).await?);
        assert!(object_exists(&update, &store, Some(&[OWNER_PERMISSION.clone()])).await?);
        Ok(())
    }

    #[tokio::test]
    async fn it_fails_when_object_ids_collide() {
        let create = alice().commit().build();
        let store = DuplicatingStore(ObjectContainer::from_create(&create));
        let update = write(alice().commit().update(create.object_id()).build());

        let err = object_exists(&update, &store, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ServerError);
    }

    #[tokio::test]
    async fn it_returns_known_revisions_after_writing() -> TestResult {
        let store = VolatileStore::new();
        let create = alice().commit().build();
        let revision = create.revision().to_string();
        let response = write_commit(&write(create), &store).await?;
        assert_eq!(response.revisions, vec![revision]);
        Ok(())
    }
}

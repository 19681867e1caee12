//! Deciding which permission grants entitle a request.
//!
//! The owner of a partition is entitled to everything and never triggers a
//! grant lookup. Anyone else needs a grant the owner stored in their
//! `Permissions` interface, naming the requester, the context and type
//! addressed, and the operation requested:
//!
//! ```text
//! request ──► iss == sub? ──yes──► [OWNER_PERMISSION]
//!                │
//!                no
//!                ▼
//! query Permissions objects (all pages)
//!   └── resolve each via BasicStrategy
//!         └── keep grants matching owner, grantee, context, type, operation
//! ```

use std::{collections::HashMap, sync::Arc};

use futures::future::try_join_all;
use hub_common::HubError;
use hub_commit::{BASIC_COMMIT_STRATEGY, Interface, Operation, SignedCommit};

use crate::{
    permission::{
        OWNER_PERMISSION, PERMISSION_GRANT_CONTEXT, PERMISSION_GRANT_TYPE, PermissionGrant,
        PermissionOperation,
    },
    request::{CommitQueryRequest, Request},
    store::{ObjectContainer, QueryFilter, QueryRequest, Store},
    store_utils::query_get_all,
    strategy::BasicStrategy,
};

/// What a requester wants to do to whose objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantQuery<'a> {
    /// Owner DID.
    pub owner: &'a str,
    /// Requester DID.
    pub requester: &'a str,
    /// Schema context addressed.
    pub context: &'a str,
    /// Schema type addressed.
    pub r#type: &'a str,
    /// Entitlement needed.
    pub operation: PermissionOperation,
}

/// Looks up and applies permission grants.
#[derive(Clone)]
pub struct AuthorizationController {
    store: Arc<dyn Store>,
}

impl std::fmt::Debug for AuthorizationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationController").finish_non_exhaustive()
    }
}

impl AuthorizationController {
    /// A controller reading grants from `store`.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Grants entitling `request`.
    ///
    /// # Errors
    ///
    /// - `PermissionsRequired` when no grant matches.
    /// - `ServerError` for commit queries, which are authorized per commit by
    ///   [`AuthorizationController::authorize_commits`].
    #[tracing::instrument(skip_all, fields(iss = request.iss(), sub = request.sub()))]
    pub async fn get_permission_grants_for_request(
        &self,
        request: &Request,
    ) -> Result<Vec<PermissionGrant>, HubError> {
        if request.base().is_owner() {
            tracing::debug!("requester owns the partition");
            return Ok(vec![OWNER_PERMISSION.clone()]);
        }

        let (context, r#type, operation) = match request {
            Request::ObjectQuery(query) => (
                query.context.as_str(),
                query.r#type.as_str(),
                PermissionOperation::Read,
            ),
            Request::Write(write) => (
                write.context(),
                write.object_type(),
                write.operation().into(),
            ),
            Request::CommitQuery(_) => {
                return Err(HubError::server_error(
                    "commit queries are authorized per commit",
                ));
            }
        };

        let grants = self
            .matching_grants(&GrantQuery {
                owner: request.sub(),
                requester: request.iss(),
                context,
                r#type,
                operation,
            })
            .await?;

        if grants.is_empty() {
            tracing::debug!(context, object_type = r#type, ?operation, "no grant matches");
            return Err(HubError::permissions_required());
        }
        tracing::debug!(count = grants.len(), "grants match");
        Ok(grants)
    }

    /// Every stored grant matching `query`; possibly none.
    pub async fn matching_grants(
        &self,
        query: &GrantQuery<'_>,
    ) -> Result<Vec<PermissionGrant>, HubError> {
        let grants = self.stored_grants(query.owner).await?;
        Ok(grants
            .into_iter()
            .filter(|grant| accepts(grant, query))
            .collect())
    }

    /// Every live grant in `owner`'s `Permissions` interface.
    async fn stored_grants(&self, owner: &str) -> Result<Vec<PermissionGrant>, HubError> {
        let store = self.store.as_ref();
        let query = QueryRequest::new(
            owner,
            vec![
                QueryFilter::eq("interface", Interface::Permissions.as_str()),
                QueryFilter::eq("context", PERMISSION_GRANT_CONTEXT),
                QueryFilter::eq("type", PERMISSION_GRANT_TYPE),
            ],
        );
        let objects = query_get_all(|skip_token| {
            let query = query.clone().with_skip_token(skip_token);
            async move { store.query_objects(&query).await }
        })
        .await?;

        let resolved = try_join_all(
            objects
                .iter()
                .filter(|object| {
                    let basic = object.commit_strategy == BASIC_COMMIT_STRATEGY;
                    if !basic {
                        tracing::debug!(
                            id = %object.id,
                            strategy = %object.commit_strategy,
                            "skipping grant"
                        );
                    }
                    basic
                })
                .map(|object| BasicStrategy::resolve_object(owner, &object.id, store)),
        )
        .await?;

        Ok(resolved
            .into_iter()
            .flatten()
            .filter(|commit| commit.operation() != Operation::Delete)
            .filter_map(|commit| match PermissionGrant::from_commit(&commit) {
                Ok(grant) => Some(grant),
                Err(error) => {
                    tracing::warn!(id = commit.object_id(), %error, "ignoring malformed grant");
                    None
                }
            })
            .collect())
    }

    /// Restrict `objects` to those some grant covers.
    ///
    /// A grant without `created_by` covers everything; otherwise an object is
    /// kept when a grant names its creator.
    ///
    /// # Errors
    ///
    /// `PermissionsRequired` when objects were found but none is covered.
    pub fn prune_results(
        objects: Vec<ObjectContainer>,
        grants: &[PermissionGrant],
    ) -> Result<Vec<ObjectContainer>, HubError> {
        if grants.iter().any(|grant| grant.created_by.is_none()) {
            return Ok(objects);
        }

        let found = objects.len();
        let kept: Vec<_> = objects
            .into_iter()
            .filter(|object| {
                grants
                    .iter()
                    .any(|grant| grant.created_by.as_deref() == Some(object.created_by.as_str()))
            })
            .collect();

        if found > 0 && kept.is_empty() {
            return Err(HubError::permissions_required());
        }
        Ok(kept)
    }

    /// Check that the requester of a commit query may read every commit.
    ///
    /// Grants are looked up once per context and type among `commits`.
    ///
    /// # Errors
    ///
    /// `PermissionsRequired` when any commit is not readable.
    pub async fn authorize_commits(
        &self,
        request: &CommitQueryRequest,
        commits: Vec<SignedCommit>,
    ) -> Result<Vec<SignedCommit>, HubError> {
        if request.base.is_owner() {
            return Ok(commits);
        }

        let mut readable: HashMap<(String, String), bool> = HashMap::new();
        for commit in &commits {
            let headers = commit.protected_headers();
            let key = (headers.context.clone(), headers.r#type.clone());
            if !readable.contains_key(&key) {
                let grants = self
                    .matching_grants(&GrantQuery {
                        owner: &request.base.sub,
                        requester: &request.base.iss,
                        context: &key.0,
                        r#type: &key.1,
                        operation: PermissionOperation::Read,
                    })
                    .await?;
                readable.insert(key.clone(), !grants.is_empty());
            }
            if readable.get(&key) != Some(&true) {
                tracing::debug!(rev = %commit.revision(), "commit not readable");
                return Err(HubError::permissions_required());
            }
        }
        Ok(commits)
    }
}

fn accepts(grant: &PermissionGrant, query: &GrantQuery<'_>) -> bool {
    grant.owner == query.owner
        && grant.grantee == query.requester
        && grant.context == query.context
        && grant.r#type == query.r#type
        && grant.permits(query.operation)
        && (query.operation != PermissionOperation::Create
            || grant
                .created_by
                .as_deref()
                .is_none_or(|creator| creator == query.requester))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        request::BaseRequest,
        store::{JournaledStore, VolatileStore},
    };
    use hub_commit::helpers::TestIdentity;
    use hub_common::ErrorCode;
    use pretty_assertions::assert_eq;
    use testresult::TestResult;

    fn alice() -> TestIdentity {
        TestIdentity::new("alice", 1)
    }

    fn bob() -> TestIdentity {
        TestIdentity::new("bob", 2)
    }

    fn grant(allow: &str, object_type: &str, created_by: Option<&str>) -> PermissionGrant {
        PermissionGrant {
            owner: alice().did().into(),
            grantee: bob().did().into(),
            allow: allow.parse().unwrap(),
            context: "example.com".into(),
            r#type: object_type.into(),
            created_by: created_by.map(str::to_string),
        }
    }

    async fn store_grant(store: &VolatileStore, grant: &PermissionGrant) -> SignedCommit {
        let commit = alice()
            .commit()
            .interface("Permissions")
            .context(PERMISSION_GRANT_CONTEXT)
            .object_type(PERMISSION_GRANT_TYPE)
            .payload(grant.to_json())
            .build();
        store.commit(alice().did(), &commit).await.unwrap();
        commit
    }

    fn object_query(iss: &str, object_type: &str) -> Request {
        Request::ObjectQuery(crate::request::ObjectQueryRequest {
            base: BaseRequest {
                iss: iss.into(),
                aud: "did:example:hub".into(),
                sub: alice().did().into(),
                r#type: "ObjectQueryRequest".into(),
            },
            interface: Interface::Collections,
            context: "example.com".into(),
            r#type: object_type.into(),
            object_ids: None,
            filters: vec![],
            skip_token: None,
        })
    }

    fn object(created_by: &str) -> ObjectContainer {
        let mut object = ObjectContainer::from_create(&alice().commit().build());
        object.created_by = created_by.into();
        object
    }

    #[tokio::test]
    async fn it_entitles_the_owner_without_a_lookup() -> TestResult {
        let store = Arc::new(JournaledStore::new(VolatileStore::new()));
        let seeded = alice()
            .commit()
            .interface("Permissions")
            .context(PERMISSION_GRANT_CONTEXT)
            .object_type(PERMISSION_GRANT_TYPE)
            .payload(grant("-R---", "Person", None).to_json())
            .build();
        store.commit(alice().did(), &seeded).await?;
        assert_eq!(store.entries().len(), 1);
        store.clear();
        let controller = AuthorizationController::new(store.clone());

        let grants = controller
            .get_permission_grants_for_request(&object_query(alice().did(), "Person"))
            .await?;
        assert_eq!(grants, vec![OWNER_PERMISSION.clone()]);
        assert!(store.entries().is_empty());
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn it_finds_grants_for_the_requested_type() -> TestResult {
        let store = Arc::new(VolatileStore::new());
        let granted = grant("-R---", "Person", None);
        store_grant(&store, &granted).await;
        let controller = AuthorizationController::new(store.clone());

        let grants = controller
            .get_permission_grants_for_request(&object_query(bob().did(), "Person"))
            .await?;
        assert_eq!(grants, vec![granted]);

        let err = controller
            .get_permission_grants_for_request(&object_query(bob().did(), "Place"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionsRequired);
        Ok(())
    }

    #[tokio::test]
    async fn it_requires_the_requested_entitlement() -> TestResult {
        let store = Arc::new(VolatileStore::new());
        store_grant(&store, &grant("C-U--", "Person", None)).await;
        let controller = AuthorizationController::new(store.clone());

        let err = controller
            .get_permission_grants_for_request(&object_query(bob().did(), "Person"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionsRequired);
        Ok(())
    }

    fn read_query() -> GrantQuery<'static> {
        GrantQuery {
            owner: "did:example:alice",
            requester: "did:example:bob",
            context: "example.com",
            r#type: "Person",
            operation: PermissionOperation::Read,
        }
    }

    #[test_log::test(tokio::test)]
    async fn it_skips_grants_under_other_strategies() -> TestResult {
        let store = Arc::new(VolatileStore::new());
        let custom = alice()
            .commit()
            .interface("Permissions")
            .context(PERMISSION_GRANT_CONTEXT)
            .object_type(PERMISSION_GRANT_TYPE)
            .strategy("custom")
            .payload(grant("-R---", "Person", None).to_json())
            .build();
        store.commit(alice().did(), &custom).await?;
        let controller = AuthorizationController::new(store.clone());

        assert!(controller.matching_grants(&read_query()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn it_rejects_grants_naming_another_owner() -> TestResult {
        let store = Arc::new(VolatileStore::new());
        let mut foreign = grant("-R---", "Person", None);
        foreign.owner = "did:example:carol".into();
        store_grant(&store, &foreign).await;
        let controller = AuthorizationController::new(store.clone());

        assert!(controller.matching_grants(&read_query()).await?.is_empty());

        store_grant(&store, &grant("-R---", "Person", None)).await;
        assert_eq!(controller.matching_grants(&read_query()).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn it_ignores_deleted_grants() -> TestResult {
        let store = Arc::new(VolatileStore::new());
        let created = store_grant(&store, &grant("-R---", "Person", None)).await;
        let deleted = alice()
            .commit()
            .interface("Permissions")
            .context(PERMISSION_GRANT_CONTEXT)
            .object_type(PERMISSION_GRANT_TYPE)
            .delete(created.object_id())
            .committed_at("2019-02-01T00:00:00Z")
            .build();
        store.commit(alice().did(), &deleted).await?;
        let controller = AuthorizationController::new(store.clone());

        let grants = controller
            .matching_grants(&GrantQuery {
                owner: alice().did(),
                requester: bob().did(),
                context: "example.com",
                r#type: "Person",
                operation: PermissionOperation::Read,
            })
            .await?;
        assert!(grants.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn it_restricts_create_grants_to_the_requester() -> TestResult {
        let store = Arc::new(VolatileStore::new());
        store_grant(&store, &grant("C----", "Person", Some("did:example:carol"))).await;
        let own = grant("C----", "Place", Some(bob().did()));
        store_grant(&store, &own).await;
        let controller = AuthorizationController::new(store.clone());

        let (alice, bob) = (alice(), bob());
        let query = |object_type: &'static str| GrantQuery {
            owner: alice.did(),
            requester: bob.did(),
            context: "example.com",
            r#type: object_type,
            operation: PermissionOperation::Create,
        };
        assert!(controller.matching_grants(&query("Person")).await?.is_empty());
        assert_eq!(controller.matching_grants(&query("Place")).await?, vec![own]);
        Ok(())
    }

    #[tokio::test]
    async fn it_refuses_to_authorize_commit_queries_as_a_whole() {
        let controller = AuthorizationController::new(Arc::new(VolatileStore::new()));
        let request = Request::CommitQuery(CommitQueryRequest {
            base: BaseRequest {
                iss: bob().did().into(),
                aud: "did:example:hub".into(),
                sub: alice().did().into(),
                r#type: "CommitQueryRequest".into(),
            },
            object_ids: vec!["a".into()],
            revisions: None,
            fields: None,
            skip_token: None,
        });
        let err = controller
            .get_permission_grants_for_request(&request)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ServerError);
    }

    #[test]
    fn it_keeps_everything_under_an_unrestricted_grant() -> TestResult {
        let objects = vec![object("did:example:carol"), object(bob().did())];
        let grants = [
            grant("-R---", "Person", Some(bob().did())),
            grant("-R---", "Person", None),
        ];
        assert_eq!(
            AuthorizationController::prune_results(objects.clone(), &grants)?,
            objects
        );
        Ok(())
    }

    #[test]
    fn it_prunes_to_objects_of_named_creators() -> TestResult {
        let objects = vec![object("did:example:carol"), object(bob().did())];
        let grants = [grant("-R---", "Person", Some(bob().did()))];
        let kept = AuthorizationController::prune_results(objects, &grants)?;
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].created_by, bob().did());
        Ok(())
    }

    #[test]
    fn it_fails_when_pruning_removes_everything() {
        let grants = [grant("-R---", "Person", Some(bob().did()))];
        let err =
            AuthorizationController::prune_results(vec![object("did:example:carol")], &grants)
                .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionsRequired);

        let empty = AuthorizationController::prune_results(vec![], &grants).unwrap();
        assert!(empty.is_empty());
    }
}

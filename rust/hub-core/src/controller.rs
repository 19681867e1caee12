//! Per-interface request handlers.

use std::sync::Arc;

use async_trait::async_trait;
use hub_common::{ConditionalSend, ConditionalSync, HubError};
use hub_commit::Operation;

use crate::{
    authorization::AuthorizationController,
    permission::PermissionGrant,
    request::{ObjectQueryRequest, WriteRequest},
    response::{ObjectQueryResponse, WriteResponse},
    store::{QueryFilter, QueryRequest, Store},
    store_utils::{object_exists, write_commit},
};

/// Handles the requests addressed to one interface.
///
/// Every method receives the grants that entitled the request, already
/// checked for the requested operation.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait InterfaceController: ConditionalSend + ConditionalSync {
    /// Write a create commit.
    async fn handle_create_request(
        &self,
        request: &WriteRequest,
        grants: &[PermissionGrant],
    ) -> Result<WriteResponse, HubError>;

    /// Write an update commit.
    async fn handle_update_request(
        &self,
        request: &WriteRequest,
        grants: &[PermissionGrant],
    ) -> Result<WriteResponse, HubError>;

    /// Write a delete commit.
    async fn handle_delete_request(
        &self,
        request: &WriteRequest,
        grants: &[PermissionGrant],
    ) -> Result<WriteResponse, HubError>;

    /// Answer an object query.
    async fn handle_query_request(
        &self,
        request: &ObjectQueryRequest,
        grants: &[PermissionGrant],
    ) -> Result<ObjectQueryResponse, HubError>;

    /// Route a write to the handler of its operation.
    async fn handle_write_request(
        &self,
        request: &WriteRequest,
        grants: &[PermissionGrant],
    ) -> Result<WriteResponse, HubError> {
        match request.operation() {
            Operation::Create => self.handle_create_request(request, grants).await,
            Operation::Update => self.handle_update_request(request, grants).await,
            Operation::Delete => self.handle_delete_request(request, grants).await,
        }
    }
}

/// Stores objects as plain commit histories. Serves `Collections` and
/// `Permissions`.
#[derive(Clone)]
pub struct CollectionsController {
    store: Arc<dyn Store>,
}

impl std::fmt::Debug for CollectionsController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionsController").finish_non_exhaustive()
    }
}

impl CollectionsController {
    /// A controller persisting into `store`.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn write_existing(
        &self,
        request: &WriteRequest,
        grants: &[PermissionGrant],
    ) -> Result<WriteResponse, HubError> {
        if !object_exists(request, self.store.as_ref(), Some(grants)).await? {
            return Err(HubError::not_found());
        }
        write_commit(request, self.store.as_ref()).await
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl InterfaceController for CollectionsController {
    async fn handle_create_request(
        &self,
        request: &WriteRequest,
        _grants: &[PermissionGrant],
    ) -> Result<WriteResponse, HubError> {
        write_commit(request, self.store.as_ref()).await
    }

    async fn handle_update_request(
        &self,
        request: &WriteRequest,
        grants: &[PermissionGrant],
    ) -> Result<WriteResponse, HubError> {
        self.write_existing(request, grants).await
    }

    async fn handle_delete_request(
        &self,
        request: &WriteRequest,
        grants: &[PermissionGrant],
    ) -> Result<WriteResponse, HubError> {
        self.write_existing(request, grants).await
    }

    async fn handle_query_request(
        &self,
        request: &ObjectQueryRequest,
        grants: &[PermissionGrant],
    ) -> Result<ObjectQueryResponse, HubError> {
        let mut filters = vec![
            QueryFilter::eq("interface", request.interface.as_str()),
            QueryFilter::eq("context", request.context.as_str()),
            QueryFilter::eq("type", request.r#type.as_str()),
        ];
        if let Some(object_ids) = &request.object_ids {
            filters.push(QueryFilter::any("object_id", object_ids.iter().cloned()));
        }
        filters.extend(request.filters.iter().cloned());

        let query = QueryRequest::new(request.base.sub.as_str(), filters)
            .with_skip_token(request.skip_token.clone());
        let page = self.store.query_objects(&query).await?;

        Ok(ObjectQueryResponse {
            objects: AuthorizationController::prune_results(page.results, grants)?,
            skip_token: page.skip_token,
        })
    }
}

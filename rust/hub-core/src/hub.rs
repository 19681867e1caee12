//! The request entry point.
//!
//! ```text
//! Hub::handle(json)
//!   ├── Request::parse
//!   ├── Write?        SignedCommit::validate(verification)
//!   ├── CommitQuery?  handle_commit_query ──► authorize_commits
//!   └── otherwise     get_permission_grants_for_request
//!                       └── controllers[interface].handle_*(request, grants)
//! ```

use std::{collections::HashMap, sync::Arc};

use hub_common::{HubError, Settings};
use hub_commit::{Interface, VerificationContext};
use serde_json::Value;

use crate::{
    authorization::AuthorizationController,
    commits::handle_commit_query,
    controller::{CollectionsController, InterfaceController},
    request::Request,
    response::Response,
    store::Store,
};

/// Dispatches requests for every owner whose data `store` holds.
pub struct Hub {
    settings: Settings,
    store: Arc<dyn Store>,
    verification: VerificationContext,
    authorization: AuthorizationController,
    controllers: HashMap<Interface, Arc<dyn InterfaceController>>,
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut interfaces: Vec<_> = self.controllers.keys().collect();
        interfaces.sort();
        f.debug_struct("Hub")
            .field("settings", &self.settings)
            .field("verification", &self.verification)
            .field("interfaces", &interfaces)
            .finish_non_exhaustive()
    }
}

impl Hub {
    /// A hub serving `Collections` and `Permissions` from `store`.
    pub fn new(
        settings: Settings,
        store: Arc<dyn Store>,
        verification: VerificationContext,
    ) -> Self {
        let collections: Arc<dyn InterfaceController> =
            Arc::new(CollectionsController::new(store.clone()));
        let controllers = HashMap::from([
            (Interface::Collections, collections.clone()),
            (Interface::Permissions, collections),
        ]);
        Self {
            settings,
            authorization: AuthorizationController::new(store.clone()),
            store,
            verification,
            controllers,
        }
    }

    /// Serve `interface` with `controller`, replacing any earlier one.
    pub fn with_controller(
        mut self,
        interface: Interface,
        controller: impl InterfaceController + 'static,
    ) -> Self {
        self.controllers.insert(interface, Arc::new(controller));
        self
    }

    /// The hub's settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Handle a request body, rendering failures as error responses.
    pub async fn handle(&self, body: &Value) -> Value {
        let context = self.settings.schema_context.as_str();
        let result = match Request::parse(body) {
            Ok(request) => self.handle_request(&request).await,
            Err(error) => Err(error),
        };
        match result {
            Ok(response) => response.to_json(context),
            Err(error) => {
                tracing::debug!(%error, "request failed");
                error.to_response_in(context)
            }
        }
    }

    /// Handle a parsed request.
    #[tracing::instrument(skip_all, fields(iss = request.iss(), sub = request.sub()))]
    pub async fn handle_request(&self, request: &Request) -> Result<Response, HubError> {
        let interface = match request {
            Request::CommitQuery(query) => {
                return handle_commit_query(self.store.as_ref(), &self.authorization, query)
                    .await
                    .map(Response::CommitQuery);
            }
            Request::Write(write) => {
                write.commit.validate(&self.verification).await?;
                write.interface()
            }
            Request::ObjectQuery(query) => query.interface,
        };

        let controller = self.controllers.get(&interface).ok_or_else(|| {
            HubError::not_implemented(format!("no controller serves the {interface} interface"))
        })?;

        let grants = self
            .authorization
            .get_permission_grants_for_request(request)
            .await?;

        match request {
            Request::ObjectQuery(query) => controller
                .handle_query_request(query, &grants)
                .await
                .map(Response::ObjectQuery),
            Request::Write(write) => controller
                .handle_write_request(write, &grants)
                .await
                .map(Response::Write),
            Request::CommitQuery(_) => Err(HubError::server_error("commit query not dispatched")),
        }
    }
}

//! The store's view of the remote API, and an HTTP-backed implementation.
//!
//! # Design
//! `RemoteApi` is one async method per CRUD verb. `HttpRemote` satisfies it
//! by pairing the stateless `EntityClient` with a host-supplied
//! `HttpExecutor`, so the actual network library stays outside this crate.
//! Timeouts are the executor's concern.

use tracing::debug;

use crate::auth::AuthProvider;
use crate::client::EntityClient;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::types::{EntityPatch, EntityPayload, RemoteRecord};

/// Remote source of truth for the entity collection.
#[allow(async_fn_in_trait)]
pub trait RemoteApi {
    async fn list_entities(&self) -> Result<Vec<RemoteRecord>, ApiError>;

    async fn create_entity(&self, payload: &EntityPayload) -> Result<RemoteRecord, ApiError>;

    async fn update_entity(&self, id: &str, patch: &EntityPatch) -> Result<RemoteRecord, ApiError>;

    async fn delete_entity(&self, id: &str) -> Result<(), ApiError>;
}

/// Performs one HTTP round-trip.
///
/// Non-2xx statuses must come back as `Ok(HttpResponse)`; `Err` is reserved
/// for failures that produced no response at all.
#[allow(async_fn_in_trait)]
pub trait HttpExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// `RemoteApi` over HTTP, attaching the session's bearer token to every call.
#[derive(Debug, Clone)]
pub struct HttpRemote<E, A> {
    client: EntityClient,
    executor: E,
    auth: A,
}

impl<E: HttpExecutor, A: AuthProvider> HttpRemote<E, A> {
    pub fn new(client: EntityClient, executor: E, auth: A) -> Self {
        Self {
            client,
            executor,
            auth,
        }
    }

    fn authorize(&self, request: HttpRequest) -> HttpRequest {
        match self.auth.access_token() {
            Some(token) => request.with_header("authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let request = self.authorize(request);
        debug!(method = ?request.method, path = %request.path, "sending request");
        let response = self.executor.execute(request).await?;
        debug!(status = response.status, "received response");
        Ok(response)
    }
}

impl<E: HttpExecutor, A: AuthProvider> RemoteApi for HttpRemote<E, A> {
    async fn list_entities(&self) -> Result<Vec<RemoteRecord>, ApiError> {
        let response = self.send(self.client.build_list()).await?;
        self.client.parse_list(response)
    }

    async fn create_entity(&self, payload: &EntityPayload) -> Result<RemoteRecord, ApiError> {
        let request = self.client.build_create(payload)?;
        let response = self.send(request).await?;
        self.client.parse_create(response)
    }

    async fn update_entity(&self, id: &str, patch: &EntityPatch) -> Result<RemoteRecord, ApiError> {
        let request = self.client.build_update(id, patch)?;
        let response = self.send(request).await?;
        self.client.parse_update(response)
    }

    async fn delete_entity(&self, id: &str) -> Result<(), ApiError> {
        let response = self.send(self.client.build_delete(id)).await?;
        self.client.parse_delete(response)
    }
}

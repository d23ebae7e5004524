//! Client-side CRUD synchronization core for remote entity collections.
//!
//! # Overview
//! `EntityStore` keeps an in-memory mirror of a collection owned by a REST
//! API (categories, in the finance app). Mutations go to the server first;
//! the local collection changes only after the server accepts them.
//!
//! # Design
//! - Collaborators are injected: `RemoteApi` for the server, `AuthProvider`
//!   for "is anyone signed in".
//! - `HttpRemote` implements `RemoteApi` with the stateless `EntityClient`
//!   (`build_*` produces a request, `parse_*` consumes a response) and a
//!   host-supplied `HttpExecutor`, keeping network I/O outside the crate.
//! - Record/payload conversions are free functions in `types`.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod remote;
pub mod store;
pub mod types;

pub use auth::{AuthProvider, SessionAuth};
pub use client::EntityClient;
pub use config::ClientConfig;
pub use error::{ApiError, Operation, StoreError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use remote::{HttpExecutor, HttpRemote, RemoteApi};
pub use store::{EntityStore, StoreState};
pub use types::{
    entity_from_record, payload_from_draft, Entity, EntityDraft, EntityKind, EntityPatch,
    EntityPayload, RemoteRecord, DEFAULT_COLOR, DEFAULT_ICON,
};

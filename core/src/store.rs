//! In-memory mirror of a remote entity collection.
//!
//! # Design
//! State lives in a `tokio::sync::watch` channel. Every transition is a
//! single `send_modify` call, so a subscriber or a `snapshot()` reader sees
//! either the state before a transition or the state after it, never a mix.
//!
//! Operations run on `&self` and may overlap. Each applies its transition
//! when its remote call completes, against whatever the state is at that
//! moment: completion order wins. A slow `fetch_all` that resolves after a
//! `create` overwrites the collection without the created entity.
//!
//! No public operation returns an error. Failures are recorded in
//! `StoreState::last_error` and signalled through the return value
//! (`None` / `false`).

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::auth::AuthProvider;
use crate::error::{ApiError, Operation, StoreError};
use crate::remote::RemoteApi;
use crate::types::{entity_from_record, payload_from_draft, Entity, EntityDraft, EntityKind, EntityPatch};

/// Everything a view needs to render the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreState {
    /// Insertion order from the last fetch, then creation order.
    pub entities: Vec<Entity>,
    /// True while at least one operation awaits the remote API.
    pub is_loading: bool,
    pub last_error: Option<StoreError>,
    pub is_authenticated: bool,
    in_flight: usize,
}

impl StoreState {
    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }
}

/// Client-side CRUD synchronization core.
pub struct EntityStore<R, A> {
    remote: R,
    auth: A,
    state: watch::Sender<StoreState>,
    detached: AtomicBool,
}

impl<R: RemoteApi, A: AuthProvider> EntityStore<R, A> {
    pub fn new(remote: R, auth: A) -> Self {
        let initial = StoreState {
            is_authenticated: auth.is_authenticated(),
            ..StoreState::default()
        };
        let (state, _) = watch::channel(initial);
        Self {
            remote,
            auth,
            state,
            detached: AtomicBool::new(false),
        }
    }

    /// Replace the collection with the server's current list.
    pub async fn fetch_all(&self) {
        if !self.check_auth(Operation::Fetch) {
            return;
        }
        self.begin();
        match self.remote.list_entities().await {
            Ok(records) => {
                let entities: Vec<Entity> = records.into_iter().map(entity_from_record).collect();
                debug!(count = entities.len(), "fetched entities");
                self.finish(|s| s.entities = entities);
            }
            Err(err) => self.fail(Operation::Fetch, &err),
        }
    }

    /// Create on the server and append the result. `None` on failure.
    pub async fn create(&self, draft: EntityDraft) -> Option<Entity> {
        if !self.check_auth(Operation::Create) {
            return None;
        }
        self.begin();
        match self.remote.create_entity(&payload_from_draft(&draft)).await {
            Ok(record) => {
                let entity = entity_from_record(record);
                debug!(id = %entity.id, "created entity");
                let appended = entity.clone();
                self.finish(|s| s.entities.push(appended));
                Some(entity)
            }
            Err(err) => {
                self.fail(Operation::Create, &err);
                None
            }
        }
    }

    /// Update on the server and replace the local copy in place.
    ///
    /// If no local entity has `id` the server's answer is returned but not
    /// inserted.
    pub async fn update(&self, id: &str, patch: EntityPatch) -> Option<Entity> {
        if !self.check_auth(Operation::Update) {
            return None;
        }
        self.begin();
        match self.remote.update_entity(id, &patch).await {
            Ok(record) => {
                let entity = entity_from_record(record);
                let replacement = entity.clone();
                self.finish(|s| {
                    let mut replaced = 0;
                    for slot in s.entities.iter_mut().filter(|e| e.id == id) {
                        *slot = replacement.clone();
                        replaced += 1;
                    }
                    if replaced == 0 {
                        debug!(%id, "updated entity is not held locally");
                    }
                });
                Some(entity)
            }
            Err(err) => {
                self.fail(Operation::Update, &err);
                None
            }
        }
    }

    /// Delete on the server, then drop the entity and detach its direct
    /// children in one transition.
    pub async fn delete(&self, id: &str) -> bool {
        if !self.check_auth(Operation::Delete) {
            return false;
        }
        self.begin();
        match self.remote.delete_entity(id).await {
            Ok(()) => {
                self.finish(|s| {
                    s.entities.retain(|e| e.id != id);
                    for child in s
                        .entities
                        .iter_mut()
                        .filter(|e| e.parent_id.as_deref() == Some(id))
                    {
                        child.parent_id = None;
                    }
                });
                debug!(%id, "deleted entity");
                true
            }
            Err(err) => {
                self.fail(Operation::Delete, &err);
                false
            }
        }
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.last_error.take().is_some());
    }

    /// Stop applying transitions. In-flight calls still complete and return
    /// their results, but the collection and `last_error` no longer change.
    /// Loading bookkeeping keeps running, so `is_loading` drops back to
    /// `false` once the outstanding calls finish.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    /// Receiver notified after every transition.
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> StoreState {
        self.state.borrow().clone()
    }

    pub fn entities(&self) -> Vec<Entity> {
        self.state.borrow().entities.clone()
    }

    pub fn get(&self, id: &str) -> Option<Entity> {
        self.state.borrow().get(id).cloned()
    }

    pub fn by_kind(&self, kind: EntityKind) -> Vec<Entity> {
        self.select(|e| e.kind == kind)
    }

    /// Direct children of `parent_id`, in collection order.
    pub fn children_of(&self, parent_id: &str) -> Vec<Entity> {
        self.select(|e| e.parent_id.as_deref() == Some(parent_id))
    }

    pub fn roots(&self) -> Vec<Entity> {
        self.select(Entity::is_root)
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn last_error(&self) -> Option<StoreError> {
        self.state.borrow().last_error.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    fn select(&self, keep: impl Fn(&Entity) -> bool) -> Vec<Entity> {
        self.state
            .borrow()
            .entities
            .iter()
            .filter(|e| keep(e))
            .cloned()
            .collect()
    }

    /// Refresh the auth flag. Records `AuthenticationRequired` when signed out.
    ///
    /// Subscribers are only woken when the flag or the error actually changes.
    fn check_auth(&self, operation: Operation) -> bool {
        let authenticated = self.auth.is_authenticated();
        if !self.is_detached() {
            self.state.send_if_modified(|s| {
                let mut changed = s.is_authenticated != authenticated;
                s.is_authenticated = authenticated;
                if !authenticated && s.last_error != Some(StoreError::AuthenticationRequired) {
                    s.last_error = Some(StoreError::AuthenticationRequired);
                    changed = true;
                }
                changed
            });
        }
        if !authenticated {
            warn!(%operation, "skipped: not authenticated");
        }
        authenticated
    }

    fn begin(&self) {
        self.track(|s| {
            s.in_flight += 1;
            s.is_loading = true;
            s.last_error = None;
        });
    }

    fn finish(&self, transition: impl FnOnce(&mut StoreState)) {
        self.track(|s| {
            transition(s);
            s.in_flight = s.in_flight.saturating_sub(1);
            s.is_loading = s.in_flight > 0;
        });
    }

    fn fail(&self, operation: Operation, err: &ApiError) {
        let error = StoreError::remote(operation, err);
        warn!(%operation, error = %err, "remote operation failed");
        self.finish(|s| s.last_error = Some(error));
    }

    /// Apply a transition that also moves the in-flight counter. Once
    /// detached, only `in_flight` and `is_loading` are written back.
    fn track(&self, transition: impl FnOnce(&mut StoreState)) {
        if !self.is_detached() {
            self.state.send_modify(transition);
            return;
        }
        trace!("store detached; only loading bookkeeping applied");
        self.state.send_modify(|s| {
            let mut scratch = s.clone();
            transition(&mut scratch);
            s.in_flight = scratch.in_flight;
            s.is_loading = scratch.is_loading;
        });
    }
}

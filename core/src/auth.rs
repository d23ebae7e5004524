//! Authentication status, injected into the store and the HTTP remote.

use std::sync::Arc;

use parking_lot::RwLock;

/// Answers "is someone signed in right now?" at call time.
pub trait AuthProvider: Send + Sync {
    fn is_authenticated(&self) -> bool;

    /// Bearer token for outgoing requests, if any.
    fn access_token(&self) -> Option<String> {
        None
    }
}

impl<T: AuthProvider + ?Sized> AuthProvider for Arc<T> {
    fn is_authenticated(&self) -> bool {
        (**self).is_authenticated()
    }

    fn access_token(&self) -> Option<String> {
        (**self).access_token()
    }
}

/// Session holding an optional bearer token. Clones share the same session,
/// so signing out through one handle is seen by the store immediately.
#[derive(Debug, Clone, Default)]
pub struct SessionAuth {
    token: Arc<RwLock<Option<String>>>,
}

impl SessionAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.sign_in(token);
        session
    }

    pub fn sign_in(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    pub fn sign_out(&self) {
        *self.token.write() = None;
    }
}

impl AuthProvider for SessionAuth {
    fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    fn access_token(&self) -> Option<String> {
        self.token.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_session() {
        let session = SessionAuth::new();
        let handle = session.clone();
        assert!(!handle.is_authenticated());

        session.sign_in("t0k3n");
        assert!(handle.is_authenticated());
        assert_eq!(handle.access_token().as_deref(), Some("t0k3n"));

        handle.sign_out();
        assert!(!session.is_authenticated());
        assert_eq!(session.access_token(), None);
    }

    #[test]
    fn arc_forwards() {
        let session = Arc::new(SessionAuth::with_token("abc"));
        assert!(AuthProvider::is_authenticated(&session));
        assert_eq!(AuthProvider::access_token(&session).as_deref(), Some("abc"));
    }
}

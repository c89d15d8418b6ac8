//! Process-wide authentication state.
//!
//! Exactly one `Session` value exists per running app, owned by a
//! `SessionHandle` and fanned out to subscribers over a watch channel. It
//! starts as `Loading`, resolves to `Anonymous` or `Authenticated` once the
//! credential store has been consulted, and never returns to `Loading`.
//! Only the auth service mutates it.

use std::sync::Arc;

use tokio::sync::watch;

use crate::models::UserProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Loading,
    Anonymous,
    Authenticated,
}

/// The session value observed by the rest of the app.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: Option<UserProfile>,
    pub state: AuthState,
}

impl Session {
    fn loading() -> Self {
        Self {
            user: None,
            state: AuthState::Loading,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }
}

/// Subscriber side of the session; `changed()` resolves on every transition.
pub type SessionWatcher = watch::Receiver<Session>;

/// Owner of the process-wide session value. Cheap to clone; all clones
/// share the same underlying channel.
#[derive(Clone)]
pub struct SessionHandle {
    tx: Arc<watch::Sender<Session>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Session::loading());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> SessionWatcher {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn state(&self) -> AuthState {
        self.tx.borrow().state
    }

    pub(crate) fn set_authenticated(&self, user: UserProfile) {
        self.tx.send_replace(Session {
            user: Some(user),
            state: AuthState::Authenticated,
        });
    }

    pub(crate) fn set_anonymous(&self) {
        self.tx.send_replace(Session {
            user: None,
            state: AuthState::Anonymous,
        });
    }

    /// Replace the cached user without touching the state. Ignored unless
    /// the session is currently authenticated.
    pub(crate) fn update_user(&self, user: UserProfile) {
        self.tx.send_if_modified(|session| {
            if session.state == AuthState::Authenticated {
                session.user = Some(user);
                true
            } else {
                false
            }
        });
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

//! Host application surfaces the liveness client talks to.
//!
//! The client only reads the session identity from the auth store and asks it
//! to log out; showing notices and navigating are fire-and-forget.

use std::fmt::Debug;

use tokio::sync::watch;

/// Authentication state as seen by the liveness client
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// no session, initial state
    #[default]
    Unauthenticated,
    /// logged in with a session identity
    Authenticated {
        /// opaque per-login session identity, never empty
        session_id: String,
    },
}

impl AuthState {
    /// Map the `{ sessionId, isAuthenticated }` pair of an auth store.
    ///
    /// Authenticated without a (non-empty) session identity is unauthenticated
    /// here, there is no stream to open for it.
    pub fn from_parts(session_id: Option<String>, is_authenticated: bool) -> Self {
        match session_id {
            Some(session_id) if is_authenticated && !session_id.is_empty() => {
                Self::Authenticated { session_id }
            }
            _ => Self::Unauthenticated,
        }
    }

    /// session identity, if authenticated
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Authenticated { session_id } => Some(session_id),
            Self::Unauthenticated => None,
        }
    }

    /// true if authenticated
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

/// Read/logout surface of the auth store
pub trait AuthStore: Send + Sync + Debug {
    /// current state
    fn state(&self) -> AuthState;
    /// receiver observing every later state change
    fn subscribe(&self) -> watch::Receiver<AuthState>;
    /// clear local session state, idempotent
    fn logout(&self);
}

/// Kind of a user visible notice
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    /// something went wrong for the user
    Error,
    /// informational
    Info,
}

/// Toast-like notification surface
pub trait Notifier: Send + Sync + Debug {
    /// show a notice, no result relied upon
    fn notify(&self, kind: NoticeKind, title: &str, description: &str);
}

/// Navigation surface
pub trait Navigator: Send + Sync + Debug {
    /// full navigation to `path`
    fn redirect_to(&self, path: &str);
}

/// In-process auth store backed by a watch channel.
///
/// Hosts that keep their session elsewhere can mirror it in here with
/// [`login`](Self::login) and [`logout`](AuthStore::logout).
#[derive(Debug)]
pub struct SharedAuthStore {
    tx: watch::Sender<AuthState>,
}

impl Default for SharedAuthStore {
    fn default() -> Self {
        Self::new(AuthState::Unauthenticated)
    }
}

impl SharedAuthStore {
    /// Create store with initial state
    pub fn new(initial: AuthState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Record a login, replace any previous session
    pub fn login<S: Into<String>>(&self, session_id: S) {
        let state = AuthState::from_parts(Some(session_id.into()), true);
        log::debug!("Auth store login: {:?}", state);
        self.tx.send_replace(state);
    }
}

impl AuthStore for SharedAuthStore {
    fn state(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }

    fn logout(&self) {
        let changed = self.tx.send_if_modified(|state| {
            if state.is_authenticated() {
                *state = AuthState::Unauthenticated;
                true
            } else {
                false
            }
        });

        if changed {
            log::debug!("Auth store logout");
        }
    }
}

//! Route inbound payloads to their side effect.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    event::{InboundEvent, LogoutReason},
    host::{AuthStore, Navigator, NoticeKind, Notifier},
};

static FORCE_LOGOUT_TITLE: &str = "Logged out";
static SESSION_EXPIRED_TITLE: &str = "Session expired";
static SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";
static GENERIC_LOGOUT_MESSAGE: &str = "You have been logged out.";

/// Human readable message for a force logout reason
pub fn logout_message(reason: Option<&LogoutReason>) -> &'static str {
    match reason {
        Some(LogoutReason::NewDeviceLogin) => "Your account was signed in on another device.",
        Some(LogoutReason::SessionExpired) => SESSION_EXPIRED_MESSAGE,
        Some(LogoutReason::AdminLogout) => "You were signed out by an administrator.",
        Some(LogoutReason::Other(_)) | None => GENERIC_LOGOUT_MESSAGE,
    }
}

/// One payload received on the stream of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// session identity the stream was opened for
    pub session_id: String,
    /// raw event payload
    pub payload: String,
}

/// What a dispatch did
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// event has no side effect
    Ignored,
    /// session was logged out and user sent to sign-in
    Invalidated,
    /// session was already invalidated, nothing done again
    Duplicate,
    /// event belongs to a session that is no longer the current login
    Stale,
    /// payload could not be decoded, discarded
    Malformed,
}

/// Decode payloads and perform the side effect of each event
pub struct Dispatcher {
    auth: Arc<dyn AuthStore>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    sign_in_path: String,
    invalidated: Option<String>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("sign_in_path", &self.sign_in_path)
            .field("invalidated", &self.invalidated)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher redirecting to `sign_in_path` after invalidation
    pub fn new<S: Into<String>>(
        auth: Arc<dyn AuthStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        sign_in_path: S,
    ) -> Self {
        Self {
            auth,
            notifier,
            navigator,
            sign_in_path: sign_in_path.into(),
            invalidated: None,
        }
    }

    /// Decode and dispatch a delivered payload, malformed ones are logged and dropped
    pub fn dispatch_delivery(&mut self, delivery: &Delivery) -> Dispatched {
        match InboundEvent::decode(&delivery.payload) {
            Ok(event) => self.dispatch(&delivery.session_id, &event),
            Err(err) => {
                log::warn!("Discard malformed event payload: {}", err);
                Dispatched::Malformed
            }
        }
    }

    /// Perform the side effect of an event received for `session_id`
    pub fn dispatch(&mut self, session_id: &str, event: &InboundEvent) -> Dispatched {
        log::trace!("Dispatch {} event of session {}", event.type_name(), session_id);

        if event.invalidates_session() {
            if self.invalidated.as_deref() == Some(session_id) {
                log::debug!("Session {} already invalidated, skip", session_id);
                return Dispatched::Duplicate;
            }

            // buffered from a stream of a replaced login
            if self.auth.state().session_id() != Some(session_id) {
                log::debug!(
                    "Session {} is not the current login, drop its {} event",
                    session_id,
                    event.type_name()
                );
                return Dispatched::Stale;
            }
        }

        match event {
            InboundEvent::Connected => {
                log::debug!("Event stream of session {} confirmed by server", session_id);
                Dispatched::Ignored
            }
            InboundEvent::Heartbeat => Dispatched::Ignored,
            InboundEvent::Unknown => {
                log::debug!("Ignore unknown event type");
                Dispatched::Ignored
            }
            InboundEvent::ForceLogout { reason } => {
                log::info!(
                    "Session {} forced to log out, reason: {}",
                    session_id,
                    reason.as_ref().map_or("<none>", LogoutReason::as_str)
                );
                self.invalidate(
                    session_id,
                    NoticeKind::Error,
                    FORCE_LOGOUT_TITLE,
                    logout_message(reason.as_ref()),
                )
            }
            InboundEvent::SessionExpired => {
                log::info!("Session {} expired", session_id);
                self.invalidate(
                    session_id,
                    NoticeKind::Info,
                    SESSION_EXPIRED_TITLE,
                    SESSION_EXPIRED_MESSAGE,
                )
            }
        }
    }

    fn invalidate(
        &mut self,
        session_id: &str,
        kind: NoticeKind,
        title: &str,
        description: &str,
    ) -> Dispatched {
        self.invalidated = Some(session_id.to_string());

        // logout must happen before the user is moved away
        self.auth.logout();
        self.notifier.notify(kind, title, description);
        self.navigator.redirect_to(&self.sign_in_path);

        Dispatched::Invalidated
    }

    /// Consume deliveries in order until every sender is dropped
    pub async fn run(mut self, mut rx: mpsc::Receiver<Delivery>) {
        log::debug!("Dispatcher start");

        while let Some(delivery) = rx.recv().await {
            self.dispatch_delivery(&delivery);
        }

        log::debug!("Delivery channel closed, dispatcher stop");
    }
}

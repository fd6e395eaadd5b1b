//! Bind the connection manager to authentication state.

use std::sync::Arc;

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::{
    config::Config,
    dispatch::Dispatcher,
    host::{AuthState, AuthStore, Navigator, Notifier},
    manager::{ConnectionManager, Status},
    transport::{HttpTransport, Transport},
    Result,
};

/// Manager call implied by an auth state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// open the stream of this session
    Open(String),
    /// tear the stream down
    Close,
    /// nothing to do
    Stay,
}

impl Transition {
    /// Transition from `prev` to `next`
    pub fn between(prev: &AuthState, next: &AuthState) -> Self {
        match (prev.session_id(), next.session_id()) {
            (None, None) => Self::Stay,
            (Some(_), None) => Self::Close,
            (Some(a), Some(b)) if a == b => Self::Stay,
            (_, Some(b)) => Self::Open(b.to_string()),
        }
    }
}

/// Session liveness client, not yet running
pub struct LivenessClient {
    config: Config,
    transport: Arc<dyn Transport>,
    auth: Arc<dyn AuthStore>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl std::fmt::Debug for LivenessClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivenessClient")
            .field("config", &self.config)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl LivenessClient {
    /// Create client using the http event stream transport
    pub fn new(
        config: Config,
        auth: Arc<dyn AuthStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let transport = HttpTransport::new(config.endpoint.clone(), &config.credentials)?;

        log::info!("Create liveness client for {} success", config.endpoint);

        Ok(Self::with_transport(
            config,
            Arc::new(transport),
            auth,
            notifier,
            navigator,
        ))
    }

    /// Create client with a custom transport
    pub fn with_transport(
        config: Config,
        transport: Arc<dyn Transport>,
        auth: Arc<dyn AuthStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            config,
            transport,
            auth,
            notifier,
            navigator,
        }
    }

    /// Start following the auth store, must be called inside a tokio runtime
    pub fn start(self) -> LivenessHandle {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));

        let manager = Arc::new(ConnectionManager::new(
            self.transport,
            self.config.policy,
            tx,
        ));

        let dispatcher = Dispatcher::new(
            self.auth.clone(),
            self.notifier,
            self.navigator,
            self.config.sign_in_path,
        );

        let dispatcher = tokio::spawn(dispatcher.run(rx));
        let binder = tokio::spawn(bind(manager.clone(), self.auth.subscribe()));

        log::debug!("Liveness client started");

        LivenessHandle {
            manager,
            binder,
            dispatcher,
        }
    }
}

async fn bind(manager: Arc<ConnectionManager>, mut auth_rx: watch::Receiver<AuthState>) {
    log::debug!("Binder start");

    let mut current = AuthState::Unauthenticated;

    loop {
        let next = auth_rx.borrow_and_update().clone();

        match Transition::between(&current, &next) {
            Transition::Open(session_id) => {
                log::info!("Authenticated as session {}, open event stream", session_id);
                manager.open(&session_id);
            }
            Transition::Close => {
                log::info!("Unauthenticated, close event stream");
                manager.close();
            }
            Transition::Stay => {}
        }

        current = next;

        if auth_rx.changed().await.is_err() {
            log::debug!("Auth store dropped, close and stop");
            manager.close();
            break;
        }
    }
}

/// Running liveness client, stops everything when dropped
#[derive(Debug)]
pub struct LivenessHandle {
    manager: Arc<ConnectionManager>,
    binder: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
}

impl LivenessHandle {
    /// connection manager status
    pub fn status(&self) -> Status {
        self.manager.status()
    }

    /// Stop following auth state, close the stream and cancel any pending retry
    pub fn shutdown(self) {
        drop(self)
    }

    fn teardown(&self) {
        self.binder.abort();
        self.manager.close();
        self.dispatcher.abort();
    }
}

impl Drop for LivenessHandle {
    fn drop(&mut self) {
        log::debug!("Liveness client teardown");
        self.teardown();
    }
}

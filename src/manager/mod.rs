//! Owner of the single inbound event stream and its retry timer.

mod status;

pub use status::{ConnectionStatus, Status};

use std::sync::Arc;

use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    dispatch::Delivery,
    policy::{Decision, ReconnectPolicy},
    transport::Transport,
};

#[derive(Debug, Default)]
struct ManagerState {
    // bumped on every open and close, async callbacks of an older value are stale
    generation: u64,
    session_id: Option<String>,
    attempts: u32,
    status: ConnectionStatus,
    stream: Option<JoinHandle<()>>,
    retry: Option<JoinHandle<()>>,
}

impl ManagerState {
    fn teardown(&mut self) {
        self.generation += 1;

        if let Some(stream) = self.stream.take() {
            log::trace!("Abort stream task");
            stream.abort();
        }

        if let Some(retry) = self.retry.take() {
            log::trace!("Cancel pending retry");
            retry.abort();
        }
    }

    fn snapshot(&self) -> Status {
        Status {
            session_id: self.session_id.clone(),
            status: self.status,
            attempts: self.attempts,
            has_stream: self.stream.is_some(),
            has_pending_retry: self.retry.is_some(),
        }
    }
}

struct Shared {
    transport: Arc<dyn Transport>,
    policy: ReconnectPolicy,
    deliveries: mpsc::Sender<Delivery>,
    state: Mutex<ManagerState>,
}

impl Shared {
    fn start(self: &Arc<Self>, state: &mut ManagerState, session_id: String) {
        state.generation += 1;
        state.status = ConnectionStatus::Connecting;
        state.session_id = Some(session_id.clone());

        log::debug!(
            "Move to connecting state, session {}, generation {}",
            session_id,
            state.generation
        );

        let task = Self::stream_background(self.clone(), state.generation, session_id);
        state.stream = Some(tokio::spawn(task));
    }

    async fn stream_background(self: Arc<Self>, generation: u64, session_id: String) {
        match self.transport.connect(&session_id).await {
            Ok(mut frames) => {
                if !self.on_open(generation) {
                    return;
                }

                loop {
                    match frames.next().await {
                        Some(Ok(payload)) => {
                            log::trace!("Received payload: {}", payload);

                            let delivery = Delivery {
                                session_id: session_id.clone(),
                                payload,
                            };

                            if self.deliveries.send(delivery).await.is_err() {
                                log::debug!("Delivery receive side dropped, stop");
                                return;
                            }
                        }
                        Some(Err(err)) => {
                            log::warn!("Event stream broken: {}", err);
                            break;
                        }
                        None => {
                            log::warn!("Event stream closed by server");
                            break;
                        }
                    }
                }
            }
            Err(err) => {
                log::warn!("Open event stream of session {} failed: {}", session_id, err);
            }
        }

        self.on_terminated(generation);
    }

    fn on_open(&self, generation: u64) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation {
            log::trace!("Stale stream of generation {} opened, drop it", generation);
            return false;
        }

        state.attempts = 0;
        state.status = ConnectionStatus::Open;

        log::info!("Event stream established, move to open state");

        true
    }

    fn on_terminated(self: &Arc<Self>, generation: u64) {
        let mut state = self.state.lock();
        if state.generation != generation {
            log::trace!("Stale stream of generation {} terminated, ignore", generation);
            return;
        }

        // the finishing task is the current stream task itself
        state.stream = None;

        let decision = self.policy.decide(state.attempts);
        match decision {
            Decision::RetryAfter(delay) => {
                state.attempts += 1;
                state.status = ConnectionStatus::Waiting { delay };

                log::info!(
                    "Reconnect event stream in {:?}, attempt {}",
                    delay,
                    state.attempts
                );

                let shared = self.clone();
                let timer = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    shared.on_retry(generation);
                });

                if let Some(prev) = state.retry.replace(timer) {
                    prev.abort();
                }
            }
            Decision::GiveUp => {
                state.status = ConnectionStatus::GaveUp;

                log::warn!(
                    "Event stream failed {} times, give up, session liveness push unavailable",
                    state.attempts
                );
            }
        }
    }

    fn on_retry(self: &Arc<Self>, generation: u64) {
        let mut state = self.state.lock();
        if state.generation != generation {
            log::trace!("Stale retry of generation {} fired, ignore", generation);
            return;
        }

        // the firing task is the current retry timer itself
        state.retry = None;

        match state.session_id.clone() {
            Some(session_id) => self.start(&mut state, session_id),
            None => state.status = ConnectionStatus::Idle,
        }
    }
}

/// Keeps at most one inbound stream and at most one pending retry.
///
/// Must be used inside a tokio runtime. Dropping the manager closes it.
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("policy", &self.shared.policy)
            .field("state", &*self.shared.state.lock())
            .finish()
    }
}

impl ConnectionManager {
    /// Create a closed manager, payloads of opened streams go to `deliveries`
    pub fn new(
        transport: Arc<dyn Transport>,
        policy: ReconnectPolicy,
        deliveries: mpsc::Sender<Delivery>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                policy,
                deliveries,
                state: Mutex::new(ManagerState::default()),
            }),
        }
    }

    /// Open the stream of a session, closing whatever was open before.
    ///
    /// Does not wait for the connection; failures are handled by the retry policy.
    pub fn open(&self, session_id: &str) {
        let mut state = self.shared.state.lock();

        state.teardown();
        state.attempts = 0;

        self.shared.start(&mut state, session_id.to_string());
    }

    /// Close the stream and cancel any pending retry, idempotent
    pub fn close(&self) {
        let mut state = self.shared.state.lock();

        if state.session_id.is_none() && state.status == ConnectionStatus::Idle {
            return;
        }

        state.teardown();
        state.session_id = None;
        state.attempts = 0;
        state.status = ConnectionStatus::Idle;

        log::debug!("Move to idle state");
    }

    /// current status snapshot
    pub fn status(&self) -> Status {
        self.shared.state.lock().snapshot()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use futures_util::stream;

    use super::*;
    use crate::transport::{ConnectError, FrameStream};

    #[derive(Debug, Default)]
    struct PendingTransport {
        connects: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Transport for PendingTransport {
        async fn connect(&self, _session_id: &str) -> Result<FrameStream, ConnectError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(stream::pending().boxed())
        }
    }

    #[derive(Debug, Default)]
    struct RefusingTransport {
        connects: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Transport for RefusingTransport {
        async fn connect(&self, session_id: &str) -> Result<FrameStream, ConnectError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Err(ConnectError::HTTPStatusNotOK {
                url: format!("http://test/events?sessionId={}", session_id),
                status_code: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            })
        }
    }

    fn manager(transport: Arc<dyn Transport>) -> (ConnectionManager, mpsc::Receiver<Delivery>) {
        let (tx, rx) = mpsc::channel(8);
        (
            ConnectionManager::new(transport, ReconnectPolicy::default(), tx),
            rx,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_when_idle_is_noop() {
        let (manager, _rx) = manager(Arc::new(PendingTransport::default()));

        manager.close();
        manager.close();

        assert_eq!(manager.status(), Status::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_reaches_open_state() {
        let transport = Arc::new(PendingTransport::default());
        let (manager, _rx) = manager(transport.clone());

        manager.open("S1");
        assert_eq!(manager.status().status, ConnectionStatus::Connecting);

        tokio::time::sleep(Duration::from_millis(10)).await;

        let status = manager.status();
        assert_eq!(status.status, ConnectionStatus::Open);
        assert_eq!(status.session_id.as_deref(), Some("S1"));
        assert!(status.has_stream);
        assert_eq!(transport.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_give_up_after_max_attempts() {
        let transport = Arc::new(RefusingTransport::default());
        let (manager, _rx) = manager(transport.clone());

        manager.open("S1");

        // 1 + 2 + 4 + 8 + 16 seconds of backoff
        tokio::time::sleep(Duration::from_secs(60)).await;

        let status = manager.status();
        assert_eq!(status.status, ConnectionStatus::GaveUp);
        assert_eq!(status.attempts, 5);
        assert!(!status.has_stream);
        assert!(!status.has_pending_retry);
        assert_eq!(transport.connects.load(Ordering::SeqCst), 6);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(transport.connects.load(Ordering::SeqCst), 6);

        // explicit open starts with a fresh budget
        manager.open("S1");
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(transport.connects.load(Ordering::SeqCst), 7);
        assert_eq!(manager.status().attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_pending_retry() {
        let transport = Arc::new(RefusingTransport::default());
        let (manager, _rx) = manager(transport.clone());

        manager.open("S1");
        tokio::time::sleep(Duration::from_millis(10)).await;

        let status = manager.status();
        assert!(status.has_pending_retry);
        assert_eq!(
            status.status,
            ConnectionStatus::Waiting {
                delay: Duration::from_secs(1)
            }
        );

        manager.close();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(transport.connects.load(Ordering::SeqCst), 1);
        assert_eq!(manager.status(), Status::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_closes() {
        let transport = Arc::new(RefusingTransport::default());
        let (manager, _rx) = manager(transport.clone());

        manager.open("S1");
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(manager);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.connects.load(Ordering::SeqCst), 1);
    }
}

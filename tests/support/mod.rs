#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use futures_util::StreamExt;
use session_liveness::{
    host::{AuthState, AuthStore, Navigator, NoticeKind, Notifier, SharedAuthStore},
    transport::{ConnectError, FrameError, FrameStream, Transport},
};
use tokio::{
    sync::{mpsc, watch},
    time::Instant,
};

pub fn init_log() {
    let _ = pretty_env_logger::try_init();
}

/// Let spawned tasks run without reaching any backoff timer
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[derive(Debug, Clone, Copy)]
pub enum Script {
    Refuse,
    Accept,
}

type FrameSender = mpsc::UnboundedSender<Result<String, FrameError>>;

#[derive(Debug, Default)]
struct Inner {
    script: VecDeque<Script>,
    connects: Vec<(String, Instant)>,
    streams: Vec<Option<FrameSender>>,
}

#[derive(Debug)]
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Transport answering connects from a script, `Accept` once it runs out.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    inner: Mutex<Inner>,
    live: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new<I: IntoIterator<Item = Script>>(script: I) -> Arc<Self> {
        let transport = Self::default();
        transport.inner.lock().unwrap().script = script.into_iter().collect();
        Arc::new(transport)
    }

    pub fn connects(&self) -> usize {
        self.inner.lock().unwrap().connects.len()
    }

    pub fn connected_sessions(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.connects.iter().map(|(id, _)| id.clone()).collect()
    }

    /// Gaps between consecutive connect attempts
    pub fn connect_gaps(&self) -> Vec<Duration> {
        let inner = self.inner.lock().unwrap();
        inner
            .connects
            .windows(2)
            .map(|w| w[1].1.duration_since(w[0].1))
            .collect()
    }

    /// Streams currently held by someone
    pub fn live_streams(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Push a payload on the latest accepted stream
    pub fn push(&self, payload: serde_json::Value) {
        let inner = self.inner.lock().unwrap();
        let sender = inner
            .streams
            .iter()
            .rev()
            .flatten()
            .next()
            .expect("an accepted stream");
        sender.send(Ok(payload.to_string())).expect("stream alive");
    }

    /// Server side ends the latest accepted stream
    pub fn end_stream(&self) {
        let mut inner = self.inner.lock().unwrap();
        let slot = inner
            .streams
            .iter_mut()
            .rev()
            .find(|s| s.is_some())
            .expect("an accepted stream");
        slot.take();
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&self, session_id: &str) -> Result<FrameStream, ConnectError> {
        let mut inner = self.inner.lock().unwrap();
        inner.connects.push((session_id.to_string(), Instant::now()));

        match inner.script.pop_front().unwrap_or(Script::Accept) {
            Script::Refuse => Err(ConnectError::HTTPStatusNotOK {
                url: format!("http://test/events?sessionId={}", session_id),
                status_code: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            }),
            Script::Accept => {
                let (tx, rx) = mpsc::unbounded_channel();
                inner.streams.push(Some(tx));

                self.live.fetch_add(1, Ordering::SeqCst);
                let guard = LiveGuard(self.live.clone());

                Ok(futures_util::stream::unfold((rx, guard), |(mut rx, guard)| async move {
                    rx.recv().await.map(|item| (item, (rx, guard)))
                })
                .boxed())
            }
        }
    }
}

/// Auth store counting logout calls
#[derive(Debug, Default)]
pub struct CountingAuth {
    pub store: SharedAuthStore,
    logouts: AtomicUsize,
}

impl CountingAuth {
    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

impl AuthStore for CountingAuth {
    fn state(&self) -> AuthState {
        self.store.state()
    }

    fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.store.subscribe()
    }

    fn logout(&self) {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        self.store.logout();
    }
}

/// Notifier and navigator writing every call to one ordered log
#[derive(Debug, Default)]
pub struct Recorder {
    calls: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Notifier for Recorder {
    fn notify(&self, kind: NoticeKind, title: &str, description: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("notify {:?} {} | {}", kind, title, description));
    }
}

impl Navigator for Recorder {
    fn redirect_to(&self, path: &str) {
        self.calls.lock().unwrap().push(format!("redirect {}", path));
    }
}

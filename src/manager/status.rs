use std::time::Duration;

/// Where the connection manager is in its lifecycle
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// nothing open, nothing scheduled
    #[default]
    Idle,
    /// stream requested, waiting for the transport to confirm
    Connecting,
    /// stream confirmed and delivering
    Open,
    /// stream broke, a retry is scheduled
    Waiting {
        /// delay the retry was scheduled with
        delay: Duration,
    },
    /// retries exhausted, no more automatic attempts
    GaveUp,
}

/// Snapshot of the connection manager
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Status {
    /// session the manager is bound to
    pub session_id: Option<String>,
    /// lifecycle state
    pub status: ConnectionStatus,
    /// consecutive failures since the last successful open
    pub attempts: u32,
    /// a stream task is alive
    pub has_stream: bool,
    /// a retry timer is pending
    pub has_pending_retry: bool,
}

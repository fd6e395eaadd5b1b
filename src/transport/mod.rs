//! How the event stream of a session is reached.

mod http;
mod sse;

pub use http::HttpTransport;

use futures_util::stream::BoxStream;
use snafu::prelude::*;

/// Raw event payloads of one open stream, in arrival order.
///
/// `None` or an `Err` item means the stream terminated.
pub type FrameStream = BoxStream<'static, Result<String, FrameError>>;

/// Error when open the event stream
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(connect_error), context(suffix(false)))]
pub enum ConnectError {
    /// build stream request failed
    #[snafu(display("build request failed: {source}"))]
    BuildRequestFailed {
        /// source error
        source: reqwest::Error,
    },

    /// send stream request failed
    #[snafu(display("GET url {url} failed: {source}"))]
    RequestFailed {
        /// target url
        url: String,
        /// source http error
        source: reqwest::Error,
    },

    /// http response is not OK(200)
    #[snafu(display("GET url {url} got http status code {status_code}"))]
    HTTPStatusNotOK {
        /// request url
        url: String,
        /// received http status code
        status_code: reqwest::StatusCode,
    },

    /// server answered with something other than an event stream
    #[snafu(display("GET url {url} got content type {content_type:?}, not an event stream"))]
    NotEventStream {
        /// request url
        url: String,
        /// received content type
        content_type: Option<String>,
    },
}

/// Error when read an open event stream
#[derive(Debug, Snafu)]
pub enum FrameError {
    /// underlying http body broken
    #[snafu(context(false), display("read event stream body failed: {source}"))]
    ReadBodyFailed {
        /// source error
        source: reqwest::Error,
    },
    /// server kept sending without finishing an event
    #[snafu(display("event stream sent more than {limit} bytes without an event boundary"))]
    EventTooLarge {
        /// byte limit of one pending event
        limit: usize,
    },
}

/// Opens the single inbound stream of a session.
///
/// Implementations attach whatever credentials the server needs to scope
/// delivery to `session_id`. Returning `Ok` means the server confirmed the
/// stream; the connection manager resets its attempt counter then.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// open the stream addressed by the session identity
    async fn connect(&self, session_id: &str) -> Result<FrameStream, ConnectError>;
}

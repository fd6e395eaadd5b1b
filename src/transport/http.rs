use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    StatusCode,
};
use snafu::prelude::*;

use super::{connect_error, sse, ConnectError, FrameStream, Transport};
use crate::{
    config::{Credentials, EndpointInfo},
    error, Result,
};

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

static EVENT_STREAM_MIME: &str = "text/event-stream";

/// Server-Sent Events transport over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: EndpointInfo,
}

impl HttpTransport {
    /// Create transport for endpoint, every request carries the credentials
    pub fn new(endpoint: EndpointInfo, credentials: &Credentials) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(EVENT_STREAM_MIME));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        if let Some(ref cookie) = credentials.cookie {
            let value = cookie.parse().map_err(|_| {
                error::CredentialsInvalid {
                    header: "cookie",
                }
                .build()
            })?;
            headers.insert(header::COOKIE, value);
        }

        if let Some(ref token) = credentials.bearer {
            let mut value: HeaderValue = format!("Bearer {}", token).parse().map_err(|_| {
                error::CredentialsInvalid {
                    header: "authorization",
                }
                .build()
            })?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .gzip(true)
            .deflate(true)
            .user_agent(APP_USER_AGENT)
            .default_headers(headers)
            .build()
            .context(error::ClientCreateFailed)?;

        Ok(Self { client, endpoint })
    }

    /// event endpoint
    pub fn endpoint(&self) -> &EndpointInfo {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn connect(&self, session_id: &str) -> std::result::Result<FrameStream, ConnectError> {
        let url = self.endpoint.url(session_id);

        log::debug!("Connecting event stream: {}", url);

        let req = self
            .client
            .get(url.clone())
            .build()
            .context(connect_error::BuildRequestFailed)?;

        let resp = self
            .client
            .execute(req)
            .await
            .with_context(|_| connect_error::RequestFailed { url: url.as_str() })?;

        ensure!(
            resp.status() == StatusCode::OK,
            connect_error::HTTPStatusNotOK {
                url: url.as_str(),
                status_code: resp.status()
            }
        );

        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        ensure!(
            matches!(content_type, Some(ref t) if t.starts_with(EVENT_STREAM_MIME)),
            connect_error::NotEventStream {
                url: url.as_str(),
                content_type,
            }
        );

        log::debug!("Event stream response accepted");

        Ok(sse::frames(resp.bytes_stream()))
    }
}

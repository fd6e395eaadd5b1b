//! Client configuration: where the event stream lives and how to reach it.

use std::{fmt::Display, str::FromStr};

use snafu::prelude::*;

use crate::{error, policy::ReconnectPolicy, Result};

/// Default query parameter carrying the session identity
pub const DEFAULT_SESSION_PARAM: &str = "sessionId";
/// Default sign-in entry point for redirects
pub const DEFAULT_SIGN_IN_PATH: &str = "/login";
/// Default capacity of the channel between stream and dispatcher
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

static ENV_ENDPOINT: &str = "LIVENESS_ENDPOINT";
static ENV_COOKIE: &str = "LIVENESS_COOKIE";
static ENV_BEARER: &str = "LIVENESS_BEARER";
static ENV_SIGN_IN_PATH: &str = "LIVENESS_SIGN_IN_PATH";

/// Parse string as event endpoint error
#[derive(Debug, Snafu)]
#[snafu(
    visibility(pub(crate)),
    module(parse_endpoint_error_variant),
    context(suffix(false))
)]
pub enum ParseEndpointError {
    #[snafu(display("{s} is an invalid url: {source}"))]
    /// the str is not a valid url
    InvalidURL {
        /// string be parsed
        s: String,
        /// source error
        source: url::ParseError,
    },

    /// the parsed url schema is not http
    #[snafu(display("the url {s} has invalid schema {schema}, only http or https is ok"))]
    InvalidSchema {
        /// the url
        s: String,
        /// invalid schema
        schema: String,
    },

    /// the parsed url has no host
    #[snafu(display("the endpoint url {s} has no host"))]
    NoHost {
        /// the url
        s: String,
    },
}

/// parsed event stream endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointInfo {
    base: url::Url,
    /// query parameter name for the session identity
    pub session_param: String,
}

impl EndpointInfo {
    /// base url, without session identity
    pub fn base(&self) -> &url::Url {
        &self.base
    }

    /// construct final url for a session
    pub fn url(&self, session_id: &str) -> url::Url {
        let mut u = self.base.clone();
        u.query_pairs_mut()
            .append_pair(&self.session_param, session_id);
        u
    }
}

impl FromStr for EndpointInfo {
    type Err = ParseEndpointError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let base = url::Url::parse(s)
            .with_context(|_| parse_endpoint_error_variant::InvalidURL { s })?;

        ensure!(
            base.scheme() == "https" || base.scheme() == "http",
            parse_endpoint_error_variant::InvalidSchema {
                s,
                schema: base.scheme(),
            }
        );

        ensure!(
            base.host().is_some(),
            parse_endpoint_error_variant::NoHost { s }
        );

        Ok(Self {
            base,
            session_param: DEFAULT_SESSION_PARAM.to_string(),
        })
    }
}

impl Display for EndpointInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.base.fmt(f)
    }
}

/// Credentials attached to the stream request so server can scope delivery
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// raw `Cookie` header value
    pub cookie: Option<String>,
    /// token for `Authorization: Bearer`
    pub bearer: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("cookie", &self.cookie.as_ref().map(|_| "<redacted>"))
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Liveness client config
#[derive(Debug, Clone)]
pub struct Config {
    /// event stream endpoint
    pub endpoint: EndpointInfo,
    /// request credentials
    pub credentials: Credentials,
    /// where to redirect after the session is invalidated
    pub sign_in_path: String,
    /// reconnect backoff
    pub policy: ReconnectPolicy,
    /// buffered payloads between stream and dispatcher
    pub channel_capacity: usize,
}

impl Config {
    /// Create config with defaults for everything but the endpoint
    pub fn new(endpoint: EndpointInfo) -> Self {
        Self {
            endpoint,
            credentials: Credentials::default(),
            sign_in_path: DEFAULT_SIGN_IN_PATH.to_string(),
            policy: ReconnectPolicy::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Create config from `LIVENESS_*` environment variables
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var(ENV_ENDPOINT)
            .ok()
            .context(error::MissingEnvVar { name: ENV_ENDPOINT })?;

        let mut config = Self::new(
            endpoint
                .parse()
                .with_context(|_| error::InvalidEndpoint { url: &endpoint })?,
        );

        config.credentials.cookie = std::env::var(ENV_COOKIE).ok();
        config.credentials.bearer = std::env::var(ENV_BEARER).ok();
        if let Ok(path) = std::env::var(ENV_SIGN_IN_PATH) {
            config.sign_in_path = path;
        }

        log::debug!("Config from env: {:?}", config);

        Ok(config)
    }
}

//! crate error types

use snafu::prelude::*;

use crate::config::ParseEndpointError;

/// crate result type
pub type Result<T> = std::result::Result<T, Error>;

/// crate error type, only returned while building a client
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), context(suffix(false)))]
pub enum Error {
    /// Required environment variable is absent or not unicode
    #[snafu(display("environment variable {name} is not set"))]
    MissingEnvVar {
        /// variable name
        name: String,
    },

    /// Received invalid event endpoint url
    #[snafu(display("invalid event endpoint url {url}: {source}"))]
    InvalidEndpoint {
        /// received url
        url: String,
        /// source error
        source: ParseEndpointError,
    },

    /// credentials contain characters that cant be send in HTTP header
    #[snafu(display("credential for header {header} is invalid"))]
    CredentialsInvalid {
        /// header name
        header: &'static str,
    },

    /// create HTTP client failed
    #[snafu(display("create http client failed: {source}"))]
    ClientCreateFailed {
        /// source error
        source: reqwest::Error,
    },
}

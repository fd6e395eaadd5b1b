//! # Session liveness
//!
//! Client for a server-pushed session liveness channel.
//!
//! While the host is authenticated a single event stream, scoped to the
//! session identity, stays open. Forced logouts and expiry pushed on it log the
//! session out and send the user to sign-in. Broken streams are reopened with a
//! bounded exponential backoff.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use session_liveness::{host::SharedAuthStore, Config, LivenessClient};
//! # #[derive(Debug)]
//! # struct Ui;
//! # impl session_liveness::host::Notifier for Ui {
//! #     fn notify(&self, _: session_liveness::host::NoticeKind, _: &str, _: &str) {}
//! # }
//! # impl session_liveness::host::Navigator for Ui {
//! #     fn redirect_to(&self, _: &str) {}
//! # }
//!
//! # async fn run() -> session_liveness::Result<()> {
//! let config = Config::from_env()?;
//! let auth = Arc::new(SharedAuthStore::default());
//! let ui = Arc::new(Ui);
//!
//! let handle = LivenessClient::new(config, auth.clone(), ui.clone(), ui)?.start();
//! auth.login("session-id-from-login");
//! # drop(handle);
//! # Ok(())
//! # }
//! ```

#![deny(warnings)]
#![deny(clippy::all)]
#![deny(missing_debug_implementations, missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod event;
pub mod host;
pub mod manager;
pub mod policy;
pub mod transport;

mod client;
mod error;

pub use client::{LivenessClient, LivenessHandle, Transition};
pub use config::Config;
pub use error::{Error, Result};

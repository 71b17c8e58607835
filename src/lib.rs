//! Composable HTTP client transports for Zentinel.
//!
//! Every layer implements [`Transport`] and wraps another one:
//! - [`KeyInjectingTransport`] appends an authentication key to the query
//! - [`LoggingTransport`] logs sanitized request/response dumps
//! - [`FlakyTransport`] injects bursts of failures for resilience testing
//!
//! [`HttpTransport`] terminates the chain with real network I/O, and
//! [`build_chain`] assembles the layers from a [`Config`].
//!
//! # Safety Controls
//!
//! - Flaky simulation is off unless explicitly enabled
//! - Binary bodies are never written to the log
//! - Keys, tokens and credential headers are redacted before logging

pub mod body;
pub mod chain;
pub mod client;
pub mod config;
pub mod error;
pub mod flaky;
pub mod key;
pub mod logging;
pub mod message;
pub mod sanitize;
pub mod transport;

pub use body::Body;
pub use chain::{build_chain, build_chain_with_sink};
pub use client::HttpTransport;
pub use config::Config;
pub use error::TransportError;
pub use flaky::FlakyTransport;
pub use key::KeyInjectingTransport;
pub use logging::{LogSink, LoggingTransport, TracingSink};
pub use message::{Request, RequestHead, Response};
pub use sanitize::{Redactor, Sanitizer};
pub use transport::Transport;

//! Assemble the decorator chain from configuration.

use crate::config::Config;
use crate::flaky::FlakyTransport;
use crate::key::KeyInjectingTransport;
use crate::logging::{LogSink, LoggingTransport, TracingSink};
use crate::sanitize::{Redactor, Sanitizer};
use crate::transport::Transport;
use std::sync::Arc;
use tracing::info;

/// Build the sanitizer described by `config`.
///
/// The injected key is registered as a literal secret so it cannot leak
/// through any logged text.
pub fn sanitizer_for(config: &Config) -> Redactor {
    let mut redactor = Redactor::new(
        &config.logging.redact_params,
        &config.logging.redact_headers,
    );
    if let Some(key) = &config.key {
        redactor = redactor.with_secret(key.value.clone());
    }
    redactor
}

/// Wrap `inner` in every enabled layer, logging through `tracing`.
pub fn build_chain(config: &Config, inner: Arc<dyn Transport>) -> Arc<dyn Transport> {
    build_chain_with_sink(config, inner, Arc::new(TracingSink))
}

/// Wrap `inner` as Flaky -> KeyInjecting -> Logging -> `inner`.
///
/// Flaky sits closest to the caller so injected failures skip all real work;
/// Logging sits closest to `inner` so it records what actually goes out.
pub fn build_chain_with_sink(
    config: &Config,
    inner: Arc<dyn Transport>,
    sink: Arc<dyn LogSink>,
) -> Arc<dyn Transport> {
    let sanitizer: Arc<dyn Sanitizer> = Arc::new(sanitizer_for(config));
    let mut chain = inner;
    let mut layers = Vec::new();

    if config.logging.enabled {
        chain = Arc::new(
            LoggingTransport::new(chain)
                .with_sanitizer(sanitizer.clone())
                .with_sink(sink.clone()),
        );
        layers.push("logging");
    }

    if let Some(key) = &config.key {
        chain = Arc::new(
            KeyInjectingTransport::new(chain, key.value.clone()).with_param(key.param.clone()),
        );
        layers.push("key");
    }

    if config.flaky.enabled {
        chain = Arc::new(
            FlakyTransport::new(chain, &config.flaky)
                .with_sanitizer(sanitizer)
                .with_sink(sink),
        );
        layers.push("flaky");
    }

    info!(layers = ?layers, "Transport chain assembled");
    chain
}

//! Bursty failure injection for resilience testing.
//!
//! A [`FlakyTransport`] passes almost every request straight through. Now and
//! then it opens a "flaky window" of random length; until the window closes
//! every request is intercepted and answered with either a synthetic error
//! status or a hard failure, the way a briefly unhealthy backend behaves.

use crate::body::Body;
use crate::config::FlakyConfig;
use crate::error::TransportError;
use crate::logging::{LogSink, TracingSink};
use crate::message::{render_headers, Request, Response};
use crate::sanitize::{Redactor, Sanitizer};
use crate::transport::Transport;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use http::{HeaderMap, StatusCode, Version};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

/// Message of the error returned for dropped requests.
pub const FLAKY_ERROR: &str = "flaky http error";

/// Source of the random draws that drive a [`FlakyTransport`].
pub trait FlakySource: Send {
    /// Uniform fraction in `[0, 1)`.
    fn fraction(&mut self) -> f64;

    /// Uniform integer in `[0, bound)`; `0` when `bound` is zero.
    fn below(&mut self, bound: u64) -> u64;

    /// Fair coin. `true` answers with a synthetic response, `false` fails.
    fn coin(&mut self) -> bool;
}

/// [`FlakySource`] backed by a seeded [`StdRng`].
#[derive(Debug)]
pub struct SeededSource(StdRng);

impl SeededSource {
    pub fn from_seed(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl FlakySource for SeededSource {
    fn fraction(&mut self) -> f64 {
        self.0.gen::<f64>()
    }

    fn below(&mut self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        self.0.gen_range(0..bound)
    }

    fn coin(&mut self) -> bool {
        self.0.gen::<u32>() % 2 == 0
    }
}

/// Wall clock used to open and close flaky windows.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Seed derived from the current wall-clock time.
pub fn wall_clock_seed() -> u64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64
}

/// What to do with one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Pass,
    Respond(StatusCode),
    Fail,
}

struct WindowState {
    source: Box<dyn FlakySource>,
    end_time: DateTime<Utc>,
}

/// Injects bursts of failures in front of another transport.
///
/// The random source and the window end share one lock, held only while a
/// request is being judged and never while the wrapped transport runs. A
/// single instance can therefore be shared between tasks.
pub struct FlakyTransport<T> {
    inner: T,
    probability: f64,
    max_window_ms: u64,
    status_codes: Vec<StatusCode>,
    body: Bytes,
    state: Mutex<WindowState>,
    clock: Arc<dyn Clock>,
    sanitizer: Arc<dyn Sanitizer>,
    sink: Arc<dyn LogSink>,
}

impl<T: Transport> FlakyTransport<T> {
    /// Seed from `config.seed`, or from the wall clock when unset.
    pub fn new(inner: T, config: &FlakyConfig) -> Self {
        let seed = config.seed.unwrap_or_else(wall_clock_seed);
        info!(seed = seed, "Flaky rand seed");
        Self::with_source(inner, config, Box::new(SeededSource::from_seed(seed)))
    }

    /// Drive the transport from an explicit random source.
    pub fn with_source(inner: T, config: &FlakyConfig, source: Box<dyn FlakySource>) -> Self {
        let mut status_codes: Vec<StatusCode> = config
            .status_codes
            .iter()
            .filter_map(|code| StatusCode::from_u16(*code).ok())
            .collect();
        if status_codes.is_empty() {
            warn!("No usable flaky status codes configured, using defaults");
            status_codes = FlakyConfig::default()
                .status_codes
                .iter()
                .filter_map(|code| StatusCode::from_u16(*code).ok())
                .collect();
        }

        Self {
            inner,
            probability: config.probability,
            max_window_ms: config.max_window_ms,
            status_codes,
            body: Bytes::from(config.body.clone()),
            state: Mutex::new(WindowState {
                source,
                // Unix epoch: the first call is already outside any window.
                end_time: DateTime::<Utc>::default(),
            }),
            clock: Arc::new(SystemClock),
            sanitizer: Arc::new(Redactor::default()),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn Sanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// End of the current (or last) flaky window.
    pub fn window_end(&self) -> DateTime<Utc> {
        self.lock_state().end_time
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn judge(&self) -> Verdict {
        let now = self.clock.now();
        let mut state = self.lock_state();

        if now > state.end_time {
            if state.source.fraction() > self.probability {
                return Verdict::Pass;
            }
            let window_ms = state.source.below(self.max_window_ms);
            state.end_time = now + TimeDelta::milliseconds(window_ms as i64);
            self.sink
                .diagnostic(&format!("Flaky http for {}ms", window_ms));
        }

        if state.source.coin() {
            let index = state.source.below(self.status_codes.len() as u64) as usize;
            Verdict::Respond(self.status_codes[index])
        } else {
            Verdict::Fail
        }
    }

    /// Sanitized request line and header lines.
    fn describe(&self, request: &Request) -> String {
        let text = format!(
            "{} {}\r\n{}",
            request.method,
            request.url,
            render_headers(&request.headers)
        );
        self.sanitizer
            .sanitize(&text)
            .trim_end_matches(['\r', '\n'])
            .to_string()
    }
}

#[async_trait]
impl<T: Transport> Transport for FlakyTransport<T> {
    async fn round_trip(&self, request: Request) -> Result<Response, TransportError> {
        match self.judge() {
            Verdict::Pass => self.inner.round_trip(request).await,
            Verdict::Respond(status) => {
                self.sink.diagnostic(&format!(
                    "Dropping http request {} -> {}",
                    self.describe(&request),
                    status.as_u16()
                ));
                Ok(Response {
                    status,
                    status_text: format!("{} Flaky Error", status.as_u16()),
                    version: Version::HTTP_11,
                    headers: HeaderMap::new(),
                    body: Body::Full(self.body.clone()),
                    request: Some(request.head()),
                })
            }
            Verdict::Fail => {
                self.sink.diagnostic(&format!(
                    "Returning error from http request {}",
                    self.describe(&request)
                ));
                Err(TransportError::failed(FLAKY_ERROR))
            }
        }
    }
}

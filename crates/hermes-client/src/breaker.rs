//! Circuit breaker guarding a client connection.
//!
//! # States
//! - Closed: calls pass through
//! - Open: `threshold` consecutive failures, retry period not yet elapsed;
//!   calls fail fast
//! - Half-open: retry period elapsed; exactly one caller probes, the rest
//!   fail fast
//!
//! # State Transitions
//! ```text
//! Closed → Open:      failure_count reaches threshold
//! Open → Half-open:   retry_period elapsed since the last failure
//! Half-open → Closed: probe succeeds (close callback fires)
//! Half-open → Open:   probe fails (last_failed_at refreshed)
//! ```
//!
//! State lives behind a `parking_lot` mutex that is never held across an
//! await. Probe exclusivity uses a separate `tokio` mutex taken with
//! `try_lock`, so inspecting the breaker never waits on an in-flight probe.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use hermes_config::BreakerConfig;
use hermes_telemetry::metrics;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::MutexGuard as ProbeGuard;
use tokio::time::Instant;

use crate::error::CircuitOpenError;

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through.
    Closed,
    /// Calls fail fast.
    Open,
    /// One probe call is allowed.
    HalfOpen,
}

impl CircuitState {
    /// Returns the state name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a guarded call that did not succeed.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The breaker refused the call.
    #[error(transparent)]
    Open(CircuitOpenError),
    /// The wrapped call failed; the error is passed through unchanged.
    #[error(transparent)]
    Inner(E),
}

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failed_at: Option<Instant>,
    last_error: Option<String>,
}

enum Admission<'a> {
    Closed,
    Probe(ProbeGuard<'a, ()>),
    Rejected(CircuitOpenError),
}

/// Stops forwarding calls to a failing dependency.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use hermes_client::CircuitBreaker;
///
/// # tokio_test::block_on(async {
/// let breaker = CircuitBreaker::new(3, Duration::from_secs(30));
/// let out: Result<u32, _> = breaker.call(|| async { Ok::<_, std::io::Error>(7) }).await;
/// assert_eq!(out.unwrap(), 7);
/// # });
/// ```
pub struct CircuitBreaker {
    threshold: u32,
    retry_period: Duration,
    state: Mutex<BreakerState>,
    probe: tokio::sync::Mutex<()>,
    on_open: Option<Callback>,
    on_close: Option<Callback>,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("threshold", &self.threshold)
            .field("retry_period", &self.retry_period)
            .field("state", &self.state())
            .field("failure_count", &self.failure_count())
            .finish_non_exhaustive()
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::from_config(&BreakerConfig::default())
    }
}

impl CircuitBreaker {
    /// Creates a breaker that opens after `threshold` consecutive failures
    /// and probes again `retry_period` after the last one.
    ///
    /// A threshold of zero is treated as one.
    #[must_use]
    pub fn new(threshold: u32, retry_period: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            retry_period,
            state: Mutex::new(BreakerState::default()),
            probe: tokio::sync::Mutex::new(()),
            on_open: None,
            on_close: None,
        }
    }

    /// Creates a breaker from the `[breaker]` configuration section.
    #[must_use]
    pub fn from_config(config: &BreakerConfig) -> Self {
        Self::new(config.threshold, config.retry_period())
    }

    /// Registers a callback fired when the breaker opens.
    #[must_use]
    pub fn on_open(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open = Some(Arc::new(callback));
        self
    }

    /// Registers a callback fired when an open breaker closes again.
    #[must_use]
    pub fn on_close(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_close = Some(Arc::new(callback));
        self
    }

    /// Returns the failure threshold.
    pub const fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Returns the retry period.
    pub const fn retry_period(&self) -> Duration {
        self.retry_period
    }

    /// Returns the consecutive failure count (never above the threshold).
    pub fn failure_count(&self) -> u32 {
        self.state.lock().failure_count
    }

    /// Returns the message of the last recorded failure.
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    /// Returns the current state.
    pub fn state(&self) -> CircuitState {
        let state = self.state.lock();
        self.classify(&state)
    }

    /// Forgets all failures. Does not fire callbacks.
    pub fn reset(&self) {
        *self.state.lock() = BreakerState::default();
        tracing::debug!("circuit breaker reset");
    }

    /// Runs `call` unless the breaker is open.
    ///
    /// An `Err` from `call` counts as a failure and is returned as
    /// [`BreakerError::Inner`]; a refused call returns
    /// [`BreakerError::Open`] without running `call`.
    pub async fn call<F, Fut, T, E>(&self, call: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let _probe = match self.admit() {
            Admission::Closed => None,
            Admission::Probe(guard) => Some(guard),
            Admission::Rejected(error) => {
                metrics::record_breaker_rejection();
                return Err(BreakerError::Open(error));
            }
        };

        match call().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(error) => {
                self.record_failure(error.to_string());
                Err(BreakerError::Inner(error))
            }
        }
    }

    fn classify(&self, state: &BreakerState) -> CircuitState {
        if state.failure_count < self.threshold {
            return CircuitState::Closed;
        }
        match state.last_failed_at {
            Some(at) if at.elapsed() < self.retry_period => CircuitState::Open,
            _ => CircuitState::HalfOpen,
        }
    }

    fn admit(&self) -> Admission<'_> {
        let state = self.state.lock();
        let rejected = |state: &BreakerState| {
            Admission::Rejected(CircuitOpenError {
                failure_count: state.failure_count,
                last_error: state.last_error.clone(),
            })
        };

        match self.classify(&state) {
            CircuitState::Closed => Admission::Closed,
            CircuitState::Open => rejected(&*state),
            CircuitState::HalfOpen => match self.probe.try_lock() {
                Ok(guard) => {
                    tracing::info!(failures = state.failure_count, "circuit half-open, probing");
                    metrics::record_breaker_transition(CircuitState::HalfOpen.as_str());
                    Admission::Probe(guard)
                }
                Err(_) => rejected(&*state),
            },
        }
    }

    fn record_success(&self) {
        let closed = {
            let mut state = self.state.lock();
            let was_open = state.failure_count == self.threshold;
            if state.failure_count > 0 {
                state.failure_count = 0;
            }
            was_open
        };

        if closed {
            tracing::info!("circuit closed");
            metrics::record_breaker_transition(CircuitState::Closed.as_str());
            if let Some(callback) = &self.on_close {
                callback();
            }
        }
    }

    fn record_failure(&self, message: String) {
        let opened = {
            let mut state = self.state.lock();
            let mut newly_open = false;
            if state.failure_count < self.threshold {
                state.failure_count += 1;
                newly_open = state.failure_count == self.threshold;
            }
            state.last_failed_at = Some(Instant::now());
            state.last_error = Some(message);
            newly_open
        };

        if opened {
            tracing::warn!(threshold = self.threshold, "circuit opened");
            metrics::record_breaker_transition(CircuitState::Open.as_str());
            if let Some(callback) = &self.on_open {
                callback();
            }
        }
    }
}

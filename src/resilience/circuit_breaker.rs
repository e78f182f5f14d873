//! Circuit breaker for provider protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: provider assumed down, requests fail fast
//! - Half-Open: testing if provider recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= failure_threshold
//! Open → Half-Open: first call after reset timeout elapses
//! Half-Open → Closed: success_threshold consecutive successes
//! Half-Open → Open: any failure
//! ```
//!
//! # Design Decisions
//! - Per-provider circuit breaker (not global), one instance per name
//! - Fail fast in Open state, rejection carries retry-after seconds
//! - Success in Closed decays failure_count by one instead of resetting it,
//!   so a single stray success does not erase a degradation trend
//! - Transitions are serialized behind a std Mutex that is never held
//!   across an await; cumulative stats are lock-free atomics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

use crate::config::BreakerConfig;
use crate::observability::metrics;

/// Breaker state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    fn as_metric(self) -> u8 {
        match self {
            BreakerState::Closed => 0,
            BreakerState::Open => 1,
            BreakerState::HalfOpen => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        }
    }
}

/// Error returned by [`CircuitBreaker::execute`].
///
/// `E` is the error type of the wrapped operation; the breaker converts
/// timeouts and open-circuit rejections into its own variants so callers can
/// distinguish "provider said no" from "we never asked".
#[derive(Debug, Error)]
pub enum BreakerError<E: std::fmt::Display + std::fmt::Debug> {
    /// The circuit is open; the operation was not invoked.
    #[error("circuit open, retry in {retry_after_secs}s")]
    CircuitOpen { retry_after_secs: u64 },

    /// The operation exceeded the call timeout and was cancelled.
    #[error("operation timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The operation ran and failed.
    #[error("{0}")]
    Inner(E),
}

/// Mutable transition state, guarded by the mutex.
#[derive(Debug)]
struct BreakerCore {
    state: BreakerState,
    failure_count: u32,
    success_count: u32,
    next_attempt_at: Option<Instant>,
    last_failure_at: Option<Instant>,
}

/// Per-provider circuit breaker.
///
/// Exactly one instance exists per provider name for the life of the
/// process; the [`crate::provider::ProviderFactory`] owns that registry.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    success_threshold: u32,
    call_timeout: Duration,
    reset_timeout: Duration,

    core: Mutex<BreakerCore>,

    // Cumulative stats, updated without the transition lock.
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    rejections: AtomicU64,
    in_flight: AtomicUsize,
    total_latency_ms: AtomicU64,
}

/// Read-only snapshot of breaker state and stats.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerStatus {
    pub name: String,
    pub state: BreakerState,
    pub failure_count: u32,
    pub success_count: u32,
    /// Seconds until an open circuit admits a probe call, if open.
    pub retry_after_secs: Option<u64>,
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub rejections: u64,
    pub in_flight: usize,
    pub avg_latency_ms: u64,
    pub uptime_pct: f64,
}

impl CircuitBreaker {
    /// Create a breaker from configuration.
    pub fn new(name: impl Into<String>, config: &BreakerConfig) -> Self {
        Self::with_timeouts(
            name,
            config.failure_threshold,
            config.success_threshold,
            Duration::from_secs(config.call_timeout_secs),
            Duration::from_secs(config.reset_timeout_secs),
        )
    }

    /// Create a breaker with explicit durations.
    pub fn with_timeouts(
        name: impl Into<String>,
        failure_threshold: u32,
        success_threshold: u32,
        call_timeout: Duration,
        reset_timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            failure_threshold,
            success_threshold,
            call_timeout,
            reset_timeout,
            core: Mutex::new(BreakerCore {
                state: BreakerState::Closed,
                failure_count: 0,
                success_count: 0,
                next_attempt_at: None,
                last_failure_at: None,
            }),
            attempts: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            total_latency_ms: AtomicU64::new(0),
        }
    }

    /// Provider name this breaker guards.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `op` through the breaker, racing it against the call timeout.
    ///
    /// A timed-out operation is cancelled (its future is dropped) and
    /// recorded as a failure. An open circuit rejects without invoking `op`.
    pub async fn execute<T, E, F, Fut>(&self, op: F) -> Result<T, BreakerError<E>>
    where
        E: std::fmt::Display + std::fmt::Debug,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        self.attempts.fetch_add(1, Ordering::Relaxed);

        if let Err(retry_after_secs) = self.admit() {
            self.rejections.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                provider = %self.name,
                retry_after_secs,
                "Circuit open, rejecting call"
            );
            return Err(BreakerError::CircuitOpen { retry_after_secs });
        }

        self.in_flight.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        let outcome = tokio::time::timeout(self.call_timeout, op()).await;
        let elapsed = start.elapsed();
        self.in_flight.fetch_sub(1, Ordering::Relaxed);

        match outcome {
            Ok(Ok(value)) => {
                self.successes.fetch_add(1, Ordering::Relaxed);
                self.total_latency_ms
                    .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
                self.on_success();
                metrics::record_provider_call(&self.name, "success", start);
                Ok(value)
            }
            Ok(Err(e)) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                self.total_latency_ms
                    .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
                self.on_failure(elapsed, &e.to_string());
                metrics::record_provider_call(&self.name, "error", start);
                Err(BreakerError::Inner(e))
            }
            Err(_) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                self.on_failure(elapsed, "timeout");
                metrics::record_provider_call(&self.name, "timeout", start);
                Err(BreakerError::Timeout {
                    elapsed_ms: elapsed.as_millis() as u64,
                })
            }
        }
    }

    /// Non-mutating probe: would a call be admitted right now?
    ///
    /// `true` unless the state is Open and the cooldown has not elapsed.
    pub fn allows_requests(&self) -> bool {
        let core = self.core.lock().expect("breaker mutex poisoned");
        match core.state {
            BreakerState::Open => match core.next_attempt_at {
                Some(at) => Instant::now() >= at,
                None => true,
            },
            _ => true,
        }
    }

    /// Force the breaker back to Closed with cleared counters.
    pub fn reset(&self) {
        let mut core = self.core.lock().expect("breaker mutex poisoned");
        core.state = BreakerState::Closed;
        core.failure_count = 0;
        core.success_count = 0;
        core.next_attempt_at = None;
        drop(core);
        metrics::record_breaker_state(&self.name, BreakerState::Closed.as_metric());
        tracing::info!(provider = %self.name, "Circuit breaker reset");
    }

    /// Wait until no call is in flight. Used during pool teardown.
    pub async fn drain(&self) {
        while self.in_flight.load(Ordering::Relaxed) > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Read-only snapshot for dashboards.
    pub fn status(&self) -> BreakerStatus {
        let core = self.core.lock().expect("breaker mutex poisoned");
        let now = Instant::now();
        let retry_after_secs = match (core.state, core.next_attempt_at) {
            (BreakerState::Open, Some(at)) if at > now => {
                Some(ceil_secs(at.duration_since(now)))
            }
            _ => None,
        };

        let successes = self.successes.load(Ordering::Relaxed);
        let failures = self.failures.load(Ordering::Relaxed);
        let completed = successes + failures;
        let uptime_pct = if completed == 0 {
            100.0
        } else {
            successes as f64 / completed as f64 * 100.0
        };
        let avg_latency_ms = if completed == 0 {
            0
        } else {
            self.total_latency_ms.load(Ordering::Relaxed) / completed
        };

        BreakerStatus {
            name: self.name.clone(),
            state: core.state,
            failure_count: core.failure_count,
            success_count: core.success_count,
            retry_after_secs,
            attempts: self.attempts.load(Ordering::Relaxed),
            successes,
            failures,
            rejections: self.rejections.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            avg_latency_ms,
            uptime_pct,
        }
    }

    /// Admission check. Transitions Open → Half-Open when the cooldown has
    /// elapsed; this happens synchronously as part of serving the call, not
    /// via a background timer.
    fn admit(&self) -> Result<(), u64> {
        let mut core = self.core.lock().expect("breaker mutex poisoned");
        if core.state != BreakerState::Open {
            return Ok(());
        }

        let now = Instant::now();
        match core.next_attempt_at {
            Some(at) if now < at => Err(ceil_secs(at.duration_since(now))),
            _ => {
                core.state = BreakerState::HalfOpen;
                core.success_count = 0;
                drop(core);
                metrics::record_breaker_state(&self.name, BreakerState::HalfOpen.as_metric());
                tracing::info!(
                    provider = %self.name,
                    "Cooldown elapsed, circuit half-open"
                );
                Ok(())
            }
        }
    }

    fn on_success(&self) {
        let mut core = self.core.lock().expect("breaker mutex poisoned");
        match core.state {
            BreakerState::Closed => {
                // Decay, not reset: one success erases one failure.
                core.failure_count = core.failure_count.saturating_sub(1);
            }
            BreakerState::HalfOpen => {
                core.success_count += 1;
                if core.success_count >= self.success_threshold {
                    core.state = BreakerState::Closed;
                    core.failure_count = 0;
                    core.success_count = 0;
                    core.next_attempt_at = None;
                    drop(core);
                    metrics::record_breaker_state(&self.name, BreakerState::Closed.as_metric());
                    tracing::info!(provider = %self.name, "Circuit closed after recovery");
                }
            }
            BreakerState::Open => {
                // A call admitted in half-open can settle after another
                // failure re-opened the circuit; its success does not count.
                tracing::debug!(provider = %self.name, "Success while open, ignored");
            }
        }
    }

    fn on_failure(&self, elapsed: Duration, error: &str) {
        tracing::warn!(
            provider = %self.name,
            elapsed_ms = elapsed.as_millis() as u64,
            error = %error,
            "Provider call failed"
        );

        let mut core = self.core.lock().expect("breaker mutex poisoned");
        let now = Instant::now();
        core.last_failure_at = Some(now);
        match core.state {
            BreakerState::Closed => {
                core.failure_count += 1;
                if core.failure_count >= self.failure_threshold {
                    self.trip(&mut core, now);
                }
            }
            BreakerState::HalfOpen => {
                core.success_count = 0;
                self.trip(&mut core, now);
            }
            BreakerState::Open => {}
        }
    }

    /// Transition to Open with a fresh cooldown. Caller holds the lock.
    fn trip(&self, core: &mut BreakerCore, now: Instant) {
        core.state = BreakerState::Open;
        core.next_attempt_at = Some(now + self.reset_timeout);
        metrics::record_breaker_state(&self.name, BreakerState::Open.as_metric());
        tracing::error!(
            provider = %self.name,
            failure_count = core.failure_count,
            cooldown_secs = self.reset_timeout.as_secs(),
            "Circuit opened"
        );
    }
}

fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs.max(1)
    }
}

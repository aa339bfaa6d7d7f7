//! Circuit breaker for calls to Puppet infrastructure services.
//!
//! Prevents a caller from hammering a remote endpoint that is already
//! failing, and automatically probes for recovery once a reset timeout
//! has elapsed.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::errors::{PuppetError, PuppetResult};

/// State of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed, requests flow through to the service.
    Closed,
    /// Circuit is open, requests are rejected without invoking the service.
    Open,
    /// Circuit is half-open, admitting trial requests to detect recovery.
    HalfOpen,
}

/// Configuration for the circuit breaker.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures needed to open the circuit from closed.
    pub failure_threshold: u32,
    /// Time spent open before a trial call is permitted.
    pub reset_timeout: Duration,
    /// Optional bound on a single operation attempt. A lost race against
    /// this timer counts as a breaker failure like any other.
    pub operation_timeout: Option<Duration>,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            operation_timeout: None,
        }
    }
}

impl CircuitBreakerConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the failure threshold.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets the reset timeout.
    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    /// Sets the per-attempt operation timeout.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> PuppetResult<()> {
        if self.failure_threshold == 0 {
            return Err(PuppetError::Configuration {
                message: "failure_threshold must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Hook for circuit breaker lifecycle notifications.
///
/// Methods are notifications only; they cannot affect the outcome of the
/// guarded call. The default bodies do nothing, so implementors override
/// only the events they care about.
pub trait CircuitBreakerHook: Send + Sync {
    /// Called on every state transition.
    fn on_state_change(&self, _old_state: CircuitState, _new_state: CircuitState) {}

    /// Called when the circuit opens, with the failure count that tripped it.
    fn on_open(&self, _failure_count: u32) {}

    /// Called when the circuit closes.
    fn on_close(&self) {}
}

/// Hook that ignores every notification.
struct NoopHook;

impl CircuitBreakerHook for NoopHook {}

/// Read-only snapshot of breaker state and counters.
///
/// Taking a snapshot has no side effects; two snapshots without an
/// intervening call are identical.
#[derive(Debug, Clone)]
pub struct CircuitBreakerStats {
    /// Current state.
    pub state: CircuitState,
    /// Failures recorded since the breaker last entered closed.
    pub failure_count: u32,
    /// Successes recorded since the breaker last entered closed.
    pub success_count: u32,
    /// Instant of the most recent failure.
    pub last_failure_time: Option<Instant>,
    /// Instant of the most recent success.
    pub last_success_time: Option<Instant>,
    /// Instant the breaker last transitioned into open.
    pub opened_at: Option<Instant>,
}

/// Mutable breaker state, guarded by one lock so that every
/// check-then-act runs as a single step.
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_time: Option<Instant>,
    last_success_time: Option<Instant>,
    opened_at: Option<Instant>,
}

/// Circuit breaker wrapping a single fallible asynchronous operation.
///
/// Counts consecutive failures since the breaker last entered closed; a
/// success in the closed state does not reset the counter. Counters clear
/// only when the breaker re-enters closed, via a successful half-open
/// probe or [`CircuitBreaker::force_reset`].
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: RwLock<BreakerState>,
    hook: Arc<dyn CircuitBreakerHook>,
}

impl CircuitBreaker {
    /// Creates a new circuit breaker.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_time: None,
                last_success_time: None,
                opened_at: None,
            }),
            hook: Arc::new(NoopHook),
        }
    }

    /// Sets a lifecycle notification hook.
    pub fn with_hook(mut self, hook: Arc<dyn CircuitBreakerHook>) -> Self {
        self.hook = hook;
        self
    }

    /// Returns the current state without side effects.
    pub fn state(&self) -> CircuitState {
        self.inner.read().state
    }

    /// Returns true if the circuit is open.
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Returns true if the circuit is closed.
    pub fn is_closed(&self) -> bool {
        self.state() == CircuitState::Closed
    }

    /// Returns true if the circuit is half-open.
    pub fn is_half_open(&self) -> bool {
        self.state() == CircuitState::HalfOpen
    }

    /// Returns a snapshot of breaker state and counters.
    pub fn stats(&self) -> CircuitBreakerStats {
        let inner = self.inner.read();
        CircuitBreakerStats {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            last_failure_time: inner.last_failure_time,
            last_success_time: inner.last_success_time,
            opened_at: inner.opened_at,
        }
    }

    /// Returns the remaining time before an open circuit permits a trial
    /// call, or `None` if the circuit is not open or the window has passed.
    pub fn time_until_half_open(&self) -> Option<Duration> {
        let inner = self.inner.read();
        if inner.state != CircuitState::Open {
            return None;
        }
        let elapsed = inner.opened_at.map(|t| t.elapsed())?;
        self.config.reset_timeout.checked_sub(elapsed)
    }

    /// Executes an operation through the circuit breaker.
    ///
    /// While open and inside the reset window, fails fast with
    /// [`PuppetError::CircuitOpen`] carrying the remaining wait; the
    /// operation is never invoked. Once the window has elapsed, this call
    /// becomes the half-open trial.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> PuppetResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PuppetResult<T>>,
    {
        self.before_attempt()?;

        let result = match self.config.operation_timeout {
            Some(limit) => match tokio::time::timeout(limit, operation()).await {
                Ok(result) => result,
                Err(_) => Err(PuppetError::timeout(format!(
                    "operation exceeded {}ms",
                    limit.as_millis()
                ))),
            },
            None => operation().await,
        };

        match result {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(error) => {
                self.record_failure();
                Err(error)
            }
        }
    }

    /// Manually opens the circuit, emitting the same notifications as an
    /// automatic trip.
    pub fn force_open(&self) {
        let mut inner = self.inner.write();
        self.transition(&mut inner, CircuitState::Open);
    }

    /// Manually resets the circuit to closed, clearing all counters.
    pub fn force_reset(&self) {
        let mut inner = self.inner.write();
        if inner.state == CircuitState::Closed {
            inner.failure_count = 0;
            inner.success_count = 0;
            inner.opened_at = None;
        } else {
            self.transition(&mut inner, CircuitState::Closed);
        }
    }

    /// Admission check, run before every attempt. Performs the
    /// open-to-half-open transition when the reset window has elapsed.
    ///
    /// While half-open, every caller is admitted until some result is
    /// recorded; trial calls are not serialized to a single in-flight
    /// probe.
    fn before_attempt(&self) -> PuppetResult<()> {
        let mut inner = self.inner.write();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|t| t.elapsed())
                    .unwrap_or(self.config.reset_timeout);
                match self.config.reset_timeout.checked_sub(elapsed) {
                    Some(remaining) if remaining > Duration::ZERO => {
                        Err(PuppetError::CircuitOpen {
                            retry_after: remaining,
                        })
                    }
                    _ => {
                        self.transition(&mut inner, CircuitState::HalfOpen);
                        Ok(())
                    }
                }
            }
        }
    }

    /// Records a successful operation.
    fn record_success(&self) {
        let mut inner = self.inner.write();
        inner.success_count += 1;
        inner.last_success_time = Some(Instant::now());

        if inner.state == CircuitState::HalfOpen {
            self.transition(&mut inner, CircuitState::Closed);
        }
    }

    /// Records a failed operation. Every failure counts, regardless of
    /// state, before any transition logic runs.
    fn record_failure(&self) {
        let mut inner = self.inner.write();
        inner.failure_count += 1;
        inner.last_failure_time = Some(Instant::now());

        match inner.state {
            CircuitState::Closed => {
                if inner.failure_count >= self.config.failure_threshold {
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                self.transition(&mut inner, CircuitState::Open);
            }
            CircuitState::Open => {}
        }
    }

    /// Transitions to a new state and notifies the hook.
    fn transition(&self, inner: &mut BreakerState, new_state: CircuitState) {
        let old_state = inner.state;
        if old_state == new_state {
            return;
        }

        inner.state = new_state;

        match new_state {
            CircuitState::Open => {
                inner.opened_at = Some(Instant::now());
            }
            CircuitState::HalfOpen => {}
            CircuitState::Closed => {
                inner.failure_count = 0;
                inner.success_count = 0;
                inner.opened_at = None;
            }
        }

        self.hook.on_state_change(old_state, new_state);
        match new_state {
            CircuitState::Open => self.hook.on_open(inner.failure_count),
            CircuitState::Closed => self.hook.on_close(),
            CircuitState::HalfOpen => {}
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

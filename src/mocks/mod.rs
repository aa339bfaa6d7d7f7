//! Test doubles for exercising the resilience layer without a network.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::errors::{PuppetError, PuppetResult};
use crate::resilience::{CircuitBreakerHook, CircuitState, RetryHook};

/// An operation that fails a fixed number of times, then succeeds,
/// tracking how often it was invoked.
pub struct FlakyOperation {
    failures_before_success: u32,
    calls: AtomicU32,
    make_error: Box<dyn Fn() -> PuppetError + Send + Sync>,
}

impl FlakyOperation {
    /// Fails `failures_before_success` times with a network error, then
    /// succeeds on every subsequent call.
    pub fn new(failures_before_success: u32) -> Self {
        Self::with_error(failures_before_success, || PuppetError::Network {
            message: "connection dropped".to_string(),
        })
    }

    /// Like [`FlakyOperation::new`], with a custom error factory.
    pub fn with_error(
        failures_before_success: u32,
        make_error: impl Fn() -> PuppetError + Send + Sync + 'static,
    ) -> Self {
        Self {
            failures_before_success,
            calls: AtomicU32::new(0),
            make_error: Box::new(make_error),
        }
    }

    /// Invokes the operation once.
    pub async fn call(&self) -> PuppetResult<u32> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures_before_success {
            Err((self.make_error)())
        } else {
            Ok(n)
        }
    }

    /// Number of times the operation has been invoked.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Hook that records every notification for later assertions.
#[derive(Default)]
pub struct RecordingHooks {
    transitions: Mutex<Vec<(CircuitState, CircuitState)>>,
    opens: AtomicU32,
    closes: AtomicU32,
    retries: Mutex<Vec<(u32, Duration)>>,
}

impl RecordingHooks {
    /// Creates a shareable recorder.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Recorded (old, new) state transitions, in order.
    pub fn transitions(&self) -> Vec<(CircuitState, CircuitState)> {
        self.transitions.lock().clone()
    }

    /// Number of open notifications seen.
    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of close notifications seen.
    pub fn closes(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }

    /// Recorded (attempt, delay) retry notifications, in order.
    pub fn retries(&self) -> Vec<(u32, Duration)> {
        self.retries.lock().clone()
    }
}

impl CircuitBreakerHook for RecordingHooks {
    fn on_state_change(&self, old_state: CircuitState, new_state: CircuitState) {
        self.transitions.lock().push((old_state, new_state));
    }

    fn on_open(&self, _failure_count: u32) {
        self.opens.fetch_add(1, Ordering::SeqCst);
    }

    fn on_close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl RetryHook for RecordingHooks {
    fn on_retry(&self, attempt: u32, delay: Duration, _error: &PuppetError) {
        self.retries.lock().push((attempt, delay));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_flaky_operation_recovers() {
        let op = FlakyOperation::new(2);

        assert!(op.call().await.is_err());
        assert!(op.call().await.is_err());
        assert!(op.call().await.is_ok());
        assert_eq!(op.calls(), 3);
    }
}

//! Structured logging for breaker transitions and retry notifications.
//!
//! The resilience core never binds to a logging backend; it only emits
//! hook notifications. [`TracingHooks`] is the stock bridge from those
//! hooks to `tracing` events, and [`NoopHooks`] silences them.

use std::time::Duration;

use crate::errors::PuppetError;
use crate::resilience::{CircuitBreakerHook, CircuitState, RetryHook};

/// Hook implementation that emits `tracing` events for every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHooks;

impl CircuitBreakerHook for TracingHooks {
    fn on_state_change(&self, old_state: CircuitState, new_state: CircuitState) {
        tracing::info!(
            old_state = ?old_state,
            new_state = ?new_state,
            "circuit breaker state changed"
        );
    }

    fn on_open(&self, failure_count: u32) {
        tracing::warn!(failure_count, "circuit breaker opened");
    }

    fn on_close(&self) {
        tracing::info!("circuit breaker closed");
    }
}

impl RetryHook for TracingHooks {
    fn on_retry(&self, attempt: u32, delay: Duration, error: &PuppetError) {
        tracing::warn!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "retrying operation after failure"
        );
    }
}

/// Hook implementation that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl CircuitBreakerHook for NoopHooks {}

impl RetryHook for NoopHooks {
    fn on_retry(&self, _attempt: u32, _delay: Duration, _error: &PuppetError) {}
}

//! Resilience patterns for calls to Puppet infrastructure services.
//!
//! A circuit breaker, an exponential-backoff retry executor, and an
//! orchestrator that composes them into a single guarded-call primitive
//! with retry as the outer loop and the breaker checked on every attempt.

mod circuit_breaker;
mod orchestrator;
mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerHook, CircuitBreakerStats, CircuitState,
};
pub use orchestrator::{
    PuppetOrchestrator, PuppetOrchestratorBuilder, ResilienceConfig, ResilienceOrchestrator,
};
pub use retry::{RetryConfig, RetryExecutor, RetryHook, ShouldRetry};

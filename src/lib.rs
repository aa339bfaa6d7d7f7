//! Resilient call core for Puppet infrastructure services.
//!
//! A dashboard backend aggregating data from PuppetDB (facts, reports) and
//! Puppet Server (catalog compilation) talks to remote services that fail,
//! hang, and rate-limit. This crate is the layer every such call passes
//! through:
//!
//! - **Circuit breaker**: three-state machine that fails fast once a
//!   threshold of consecutive failures is crossed, then probes for recovery.
//! - **Retry**: exponential backoff with full-range jitter, driven by a
//!   retryability predicate over the error taxonomy.
//! - **TTL cache**: per-entry expiration with lazy eviction, so recently
//!   fetched data short-circuits the guarded call entirely.
//! - **Orchestrator**: composes the above into one guarded-call primitive,
//!   with retry as the outer loop and the breaker checked on every attempt.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use integrations_puppet::{
//!     PuppetError, PuppetOrchestrator, ResilienceConfig, ResilienceOrchestrator, TtlCache,
//! };
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), PuppetError> {
//!     let orchestrator = PuppetOrchestrator::new(ResilienceConfig::default());
//!     let cache: TtlCache<String, String> = TtlCache::new();
//!
//!     let key = "nodes".to_string();
//!     let nodes = match cache.get(&key) {
//!         Some(cached) => cached,
//!         None => {
//!             let fresh = orchestrator
//!                 .execute(|| async {
//!                     // The actual PuppetDB query goes here.
//!                     Ok::<_, PuppetError>("[]".to_string())
//!                 })
//!                 .await?;
//!             cache.insert(key, fresh.clone(), Duration::from_secs(30));
//!             fresh
//!         }
//!     };
//!
//!     println!("{nodes}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod errors;
pub mod observability;
pub mod resilience;

// Re-exports for convenience
pub use cache::TtlCache;
pub use errors::{PuppetError, PuppetResult};
pub use observability::{NoopHooks, TracingHooks};
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerHook, CircuitBreakerStats, CircuitState,
    PuppetOrchestrator, PuppetOrchestratorBuilder, ResilienceConfig, ResilienceOrchestrator,
    RetryConfig, RetryExecutor, RetryHook, ShouldRetry,
};

/// Mock operations and recording hooks for testing.
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

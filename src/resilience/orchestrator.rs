//! Guarded-call primitive composing retry around the circuit breaker.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerHook, RetryConfig, RetryExecutor,
    RetryHook, ShouldRetry,
};
use crate::errors::PuppetResult;

/// Combined configuration for the guarded-call primitive.
#[derive(Debug, Clone, Default)]
pub struct ResilienceConfig {
    /// Retry configuration.
    pub retry: RetryConfig,
    /// Circuit breaker configuration.
    pub circuit_breaker: CircuitBreakerConfig,
}

impl ResilienceConfig {
    /// A configuration that neither retries nor ever trips the breaker.
    pub fn disabled() -> Self {
        Self {
            retry: RetryConfig::no_retry(),
            circuit_breaker: CircuitBreakerConfig::new()
                .with_failure_threshold(u32::MAX),
        }
    }

    /// A configuration tuned for quick failover on flaky endpoints.
    pub fn aggressive() -> Self {
        Self {
            retry: RetryConfig {
                max_retries: 5,
                ..Default::default()
            },
            circuit_breaker: CircuitBreakerConfig::new()
                .with_failure_threshold(3)
                .with_reset_timeout(std::time::Duration::from_secs(10)),
        }
    }

    /// Validates the combined configuration.
    pub fn validate(&self) -> PuppetResult<()> {
        self.circuit_breaker.validate()
    }
}

/// Trait for guarded-call orchestrators.
#[async_trait]
pub trait ResilienceOrchestrator: Send + Sync {
    /// Executes an operation with retry and circuit breaking applied.
    async fn execute<F, Fut, T>(&self, operation: F) -> PuppetResult<T>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = PuppetResult<T>> + Send,
        T: Send;
}

/// Guarded-call orchestrator for Puppet service operations.
///
/// Nests the circuit breaker inside each retry attempt: retry is the outer
/// loop, and every individual attempt, including every retry, first passes
/// the breaker's fast-fail check. Once the breaker opens mid-loop, the next
/// attempt fails with [`crate::PuppetError::CircuitOpen`], which the default
/// retryability predicate rejects, so the loop terminates early instead of
/// burning its remaining attempts against an open breaker.
///
/// Holds no state of its own beyond its two components.
pub struct PuppetOrchestrator {
    retry: RetryExecutor,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl PuppetOrchestrator {
    /// Creates an orchestrator from a combined configuration.
    pub fn new(config: ResilienceConfig) -> Self {
        Self {
            retry: RetryExecutor::new(config.retry),
            circuit_breaker: Arc::new(CircuitBreaker::new(config.circuit_breaker)),
        }
    }

    /// Creates a builder.
    pub fn builder() -> PuppetOrchestratorBuilder {
        PuppetOrchestratorBuilder::default()
    }

    /// Returns the circuit breaker for introspection and manual control.
    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.circuit_breaker
    }

    /// Resets the breaker to closed, clearing its counters.
    pub fn reset(&self) {
        self.circuit_breaker.force_reset();
    }
}

#[async_trait]
impl ResilienceOrchestrator for PuppetOrchestrator {
    async fn execute<F, Fut, T>(&self, operation: F) -> PuppetResult<T>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = PuppetResult<T>> + Send,
        T: Send,
    {
        let breaker = &self.circuit_breaker;
        let operation = &operation;

        self.retry
            .execute(move || async move { breaker.execute(|| operation()).await })
            .await
    }
}

/// Builder for [`PuppetOrchestrator`].
#[derive(Default)]
pub struct PuppetOrchestratorBuilder {
    retry_config: RetryConfig,
    circuit_breaker_config: CircuitBreakerConfig,
    breaker_hook: Option<Arc<dyn CircuitBreakerHook>>,
    retry_hook: Option<Arc<dyn RetryHook>>,
    should_retry: Option<ShouldRetry>,
}

impl PuppetOrchestratorBuilder {
    /// Sets the retry configuration.
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Sets the circuit breaker configuration.
    pub fn circuit_breaker_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker_config = config;
        self
    }

    /// Sets a breaker lifecycle hook.
    pub fn breaker_hook(mut self, hook: Arc<dyn CircuitBreakerHook>) -> Self {
        self.breaker_hook = Some(hook);
        self
    }

    /// Sets a retry notification hook.
    pub fn retry_hook(mut self, hook: Arc<dyn RetryHook>) -> Self {
        self.retry_hook = Some(hook);
        self
    }

    /// Replaces the retryability predicate.
    ///
    /// Integrations supplying their own predicate must keep the breaker's
    /// control error non-retryable, or an open breaker will be hammered
    /// with fast-failing attempts until the retry budget runs out.
    pub fn should_retry(mut self, should_retry: ShouldRetry) -> Self {
        self.should_retry = Some(should_retry);
        self
    }

    /// Builds the orchestrator.
    pub fn build(self) -> PuppetOrchestrator {
        let mut retry = RetryExecutor::new(self.retry_config);
        if let Some(predicate) = self.should_retry {
            retry = retry.with_should_retry(predicate);
        }
        if let Some(hook) = self.retry_hook {
            retry = retry.with_hook(hook);
        }

        let mut breaker = CircuitBreaker::new(self.circuit_breaker_config);
        if let Some(hook) = self.breaker_hook {
            breaker = breaker.with_hook(hook);
        }

        PuppetOrchestrator {
            retry,
            circuit_breaker: Arc::new(breaker),
        }
    }
}

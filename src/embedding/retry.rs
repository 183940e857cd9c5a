//! Retry-with-backoff wrapper for embedders.

use std::time::Duration;

use async_trait::async_trait;

use super::embedder::{Embedder, Embedding, EmbeddingError, EmbeddingResult};

/// Upper bound for a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Backoff schedule for transient embedding failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry; doubled on every further retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    ///
    /// A server-provided `Retry-After` wins over the computed backoff.
    pub fn delay_for(&self, attempt: u32, error: &EmbeddingError) -> Duration {
        if let EmbeddingError::RateLimited {
            retry_after_secs: Some(secs),
        } = error
        {
            return Duration::from_secs(*secs).min(MAX_BACKOFF);
        }

        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

/// Embedder that retries retryable errors of an inner embedder.
pub struct RetryingEmbedder<E> {
    inner: E,
    policy: RetryPolicy,
}

impl<E: Embedder> RetryingEmbedder<E> {
    pub fn new(inner: E, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Returns the wrapped embedder.
    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: Embedder> Embedder for RetryingEmbedder<E> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed(&self, text: &str) -> EmbeddingResult<Embedding> {
        let mut attempt = 0;

        loop {
            match self.inner.embed(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(e) if e.is_retryable() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    let delay = self.policy.delay_for(attempt, &e);
                    tracing::warn!(
                        embedder = self.inner.name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Embedding failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

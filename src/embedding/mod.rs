//! Vector embeddings.
//!
//! This module turns element and query text into fixed-length vectors.
//!
//! # Architecture
//!
//! - [`Embedder`] - The seam every embedding backend implements
//! - [`OpenAiEmbedder`] - OpenAI-compatible HTTP backend
//! - [`HashEmbedder`] - Deterministic offline backend
//! - [`RetryingEmbedder`] / [`CachedEmbedder`] - Wrappers adding backoff and memoization
//! - [`Embedding`] - A vector representation of text semantics
//!
//! # Example
//!
//! ```no_run
//! use mailvec::embedding::{Embedder, HashEmbedder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let embedder = HashEmbedder::new(1536);
//! let query = embedder.embed("project deadline").await?;
//! assert_eq!(query.dimension(), 1536);
//! # Ok(())
//! # }
//! ```

mod cache;
mod embedder;
mod hash;
mod openai;
mod retry;

use std::sync::Arc;
use std::time::Duration;

pub use cache::CachedEmbedder;
pub use embedder::{Embedder, Embedding, EmbeddingError, EmbeddingResult};
pub use hash::HashEmbedder;
pub use openai::{OpenAiEmbedder, DEFAULT_MODEL};
pub use retry::{RetryPolicy, RetryingEmbedder};

#[cfg(test)]
pub use embedder::MockEmbedder;

use crate::config::{EmbeddingProvider, EmbeddingSettings};

/// Builds the embedder described by `settings`.
///
/// The backend is wrapped in retry-with-backoff, then in an LRU cache.
/// OpenAI credentials come from the environment variable named by
/// `settings.api_key_env`.
pub fn from_settings(settings: &EmbeddingSettings) -> EmbeddingResult<Arc<dyn Embedder>> {
    let policy = RetryPolicy {
        max_retries: settings.max_retries,
        base_delay: Duration::from_millis(settings.retry_backoff_ms),
    };

    let embedder: Arc<dyn Embedder> = match settings.provider {
        EmbeddingProvider::Hash => Arc::new(CachedEmbedder::new(
            HashEmbedder::new(settings.dimensions),
            settings.cache_capacity,
        )),
        EmbeddingProvider::OpenAi => {
            let api_key = std::env::var(&settings.api_key_env).ok();
            let backend = match (&settings.base_url, api_key) {
                (Some(base_url), key) => OpenAiEmbedder::custom(base_url, key, &settings.model),
                (None, Some(key)) => OpenAiEmbedder::openai(key, &settings.model),
                (None, None) => {
                    return Err(EmbeddingError::Authentication(format!(
                        "{} environment variable not set",
                        settings.api_key_env
                    )))
                }
            }
            .with_dimensions(settings.dimensions)
            .with_timeout(Duration::from_secs(settings.timeout_seconds));

            Arc::new(CachedEmbedder::new(
                RetryingEmbedder::new(backend, policy),
                settings.cache_capacity,
            ))
        }
    };

    tracing::info!(
        embedder = embedder.name(),
        dimensions = embedder.dimensions(),
        "Embedder ready"
    );

    Ok(embedder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_provider_uses_configured_dimensions() {
        let settings = EmbeddingSettings {
            provider: EmbeddingProvider::Hash,
            dimensions: 32,
            ..Default::default()
        };

        let embedder = from_settings(&settings).unwrap();
        assert_eq!(embedder.name(), "hash");
        assert_eq!(embedder.dimensions(), 32);
    }

    #[test]
    fn openai_without_key_or_endpoint_fails() {
        let settings = EmbeddingSettings {
            provider: EmbeddingProvider::OpenAi,
            base_url: None,
            api_key_env: "MAILVEC_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };

        let err = from_settings(&settings).err().unwrap();
        assert!(matches!(err, EmbeddingError::Authentication(_)));
    }

    #[test]
    fn openai_custom_endpoint_needs_no_key() {
        let settings = EmbeddingSettings {
            provider: EmbeddingProvider::OpenAi,
            base_url: Some("http://localhost:11434/v1".to_string()),
            model: "nomic-embed-text".to_string(),
            api_key_env: "MAILVEC_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            dimensions: 768,
            ..Default::default()
        };

        let embedder = from_settings(&settings).unwrap();
        assert_eq!(embedder.name(), "openai-compatible");
        assert_eq!(embedder.dimensions(), 768);
    }
}

//! LRU cache in front of an embedder.
//!
//! Query strings are typically embedded more than once (one per query
//! shape), so the search path keeps recent vectors around.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use lru::LruCache;

use super::embedder::{Embedder, Embedding, EmbeddingResult};

/// Embedder that memoizes the vectors of an inner embedder.
pub struct CachedEmbedder<E> {
    inner: E,
    cache: Mutex<LruCache<String, Embedding>>,
}

impl<E: Embedder> CachedEmbedder<E> {
    /// Wraps `inner`, keeping at most `capacity` vectors (minimum 1).
    pub fn new(inner: E, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of cached vectors.
    pub fn len(&self) -> usize {
        self.cache().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Locks the cache, recovering the entries if a holder panicked.
    fn cache(&self) -> MutexGuard<'_, LruCache<String, Embedding>> {
        self.cache.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            tracing::warn!("Embedding cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lookup(&self, text: &str) -> Option<Embedding> {
        self.cache().get(text).cloned()
    }

    fn remember(&self, text: &str, embedding: &Embedding) {
        self.cache().put(text.to_string(), embedding.clone());
    }
}

#[async_trait]
impl<E: Embedder> Embedder for CachedEmbedder<E> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed(&self, text: &str) -> EmbeddingResult<Embedding> {
        if let Some(hit) = self.lookup(text) {
            tracing::debug!(chars = text.len(), "Embedding cache hit");
            return Ok(hit);
        }

        let embedding = self.inner.embed(text).await?;
        self.remember(text, &embedding);
        Ok(embedding)
    }
}

//! Embedder trait and the vector type it produces.

use async_trait::async_trait;
use thiserror::Error;

/// A vector embedding representing text semantics.
///
/// The dimensionality depends on the model used (e.g. 1536 for
/// `text-embedding-ada-002`).
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// The embedding vector.
    pub values: Vec<f32>,
}

impl Embedding {
    /// Creates a new embedding from a vector of values.
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Returns the dimensionality of this embedding.
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Euclidean (L2) distance to another embedding.
    ///
    /// Accumulates in `f64`. Returns `None` when the dimensions differ.
    pub fn l2_distance(&self, other: &Embedding) -> Option<f64> {
        if self.values.len() != other.values.len() {
            return None;
        }

        let sum: f64 = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| {
                let d = *a as f64 - *b as f64;
                d * d
            })
            .sum();

        Some(sum.sqrt())
    }

    /// Encodes the vector as little-endian `f32` bytes for BLOB storage.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Decodes a BLOB written by [`Embedding::to_le_bytes`].
    ///
    /// Returns `None` if the length is not a multiple of four.
    pub fn from_le_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() % 4 != 0 {
            return None;
        }

        let values = bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Some(Self { values })
    }
}

/// Errors that can occur while computing embeddings.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Embedding request timed out")]
    Timeout,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Cannot embed empty text")]
    EmptyInput,
}

impl EmbeddingError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::Timeout | EmbeddingError::RateLimited { .. } => true,
            EmbeddingError::Api { status, .. } => *status >= 500,
            EmbeddingError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

/// Result type for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Turns text into fixed-length vectors.
///
/// Implementations may be remote (HTTP) or local. Every vector an embedder
/// returns has exactly [`Embedder::dimensions`] values.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Short identifier used in logs (e.g. "openai").
    fn name(&self) -> &str;

    /// Length of every vector this embedder returns.
    fn dimensions(&self) -> usize;

    /// Computes the embedding of a single text.
    async fn embed(&self, text: &str) -> EmbeddingResult<Embedding>;
}

/// Rejects vectors whose length differs from `expected`.
pub(crate) fn check_dimension(embedding: Embedding, expected: usize) -> EmbeddingResult<Embedding> {
    if embedding.dimension() != expected {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: embedding.dimension(),
        });
    }
    Ok(embedding)
}

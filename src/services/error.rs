//! Errors surfaced by the pipeline services.

use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::ingest::{IngestError, PartitionError};
use crate::storage::StoreError;

/// Any failure that aborts an ingest run or a query.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source directory missing or unreadable.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// A document could not be partitioned and the run is not skipping.
    #[error(transparent)]
    Partition(#[from] PartitionError),

    /// The embedding service failed after retries.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// The store rejected a read or write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A blocking task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(String),
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

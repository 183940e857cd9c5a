//! Pipeline services layer.
//!
//! Services tie ingestion, embedding and storage together:
//!
//! ```text
//! CLI (main.rs)
//!          |
//!          v
//!    Services Layer  <-- You are here
//!          |
//!          v
//! Ingest, Embedding, Storage
//! ```
//!
//! - [`IngestService`]: directory to committed elements, all-or-nothing per run
//! - [`SearchService`]: query text to nearest or recency-decayed matches

mod error;
mod ingest_service;
mod search_service;

pub use error::{PipelineError, PipelineResult};
pub use ingest_service::{IngestOptions, IngestReport, IngestService, SkippedDocument};
pub use search_service::SearchService;

//! Configuration and settings management.
//!
//! This module provides pipeline settings types and persistence.
//! Settings are stored in the user's config directory as JSON.

mod settings;

pub use settings::{
    ConfigError, DatabaseSettings, EmbeddingProvider, EmbeddingSettings, IngestSettings,
    PartitionErrorPolicy, RetrievalSettings, Settings,
};

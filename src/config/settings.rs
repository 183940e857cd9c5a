//! Pipeline settings and configuration types.
//!
//! Settings are persisted to `~/.config/mailvec/settings.json` (or XDG
//! equivalent) and loaded at startup. Every section tolerates missing keys.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Category;
use crate::embedding::DEFAULT_MODEL;
use crate::retrieval::SortOrder;

/// Errors that can occur while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not determine a configuration directory")]
    NoConfigDir,
}

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where the vector store lives.
    pub database: DatabaseSettings,
    /// Embedding backend configuration.
    pub embedding: EmbeddingSettings,
    /// Document discovery and partitioning.
    pub ingest: IngestSettings,
    /// Query defaults.
    pub retrieval: RetrievalSettings,
}

impl Settings {
    /// Loads settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads settings from a JSON file, falling back to defaults when the
    /// file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Default location of `settings.json` in the user's config directory.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        project_dirs()
            .map(|dirs| dirs.config_dir().join("settings.json"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Resolved store path: the configured one, else `elements.db` in the
    /// user's data directory.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().join("elements.db"))
            .ok_or(ConfigError::NoConfigDir)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "mailvec")
}

/// Store location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path of the SQLite file. Defaults to the user data directory.
    pub path: Option<PathBuf>,
}

/// Embedding backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// OpenAI or any compatible `/embeddings` endpoint.
    #[default]
    OpenAi,
    /// Deterministic offline hashing.
    Hash,
}

/// Embedding backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    /// Custom endpoint (for self-hosted or compatible APIs).
    pub base_url: Option<String>,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Deployment vector size. Every stored embedding has this length.
    pub dimensions: usize,
    pub timeout_seconds: u64,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    /// Base delay of the exponential backoff.
    pub retry_backoff_ms: u64,
    /// Maximum embedding requests in flight.
    pub concurrency: usize,
    /// Entries kept by the query cache.
    pub cache_capacity: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenAi,
            base_url: None,
            model: DEFAULT_MODEL.to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            dimensions: 1536,
            timeout_seconds: 30,
            max_retries: 3,
            retry_backoff_ms: 500,
            concurrency: 1,
            cache_capacity: 256,
        }
    }
}

/// What to do when a document cannot be partitioned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionErrorPolicy {
    /// Abort the run; nothing is written.
    #[default]
    FailRun,
    /// Log the failure, skip the document, keep going.
    Skip,
}

/// Document discovery and partitioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// File extensions to ingest, case-insensitive.
    pub extensions: Vec<String>,
    /// Also descend into subdirectories.
    pub recursive: bool,
    pub on_partition_error: PartitionErrorPolicy,
    /// Skip elements whose content hash is already stored.
    pub dedup: bool,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            extensions: vec!["eml".to_string()],
            recursive: false,
            on_partition_error: PartitionErrorPolicy::FailRun,
            dedup: false,
        }
    }
}

/// Query defaults used by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of matches returned.
    pub limit: usize,
    /// Category filter; `null` searches every category.
    pub category: Option<Category>,
    /// Lambda in `exp(-lambda * age_days)`, per day.
    pub decay_rate: f64,
    pub decay_order: SortOrder,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            limit: 5,
            category: Some(Category::NarrativeText),
            decay_rate: 0.1,
            decay_order: SortOrder::Descending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_settings_are_valid() {
        let settings = Settings::default();
        assert_eq!(settings.embedding.dimensions, 1536);
        assert_eq!(settings.embedding.concurrency, 1);
        assert_eq!(
            settings.ingest.on_partition_error,
            PartitionErrorPolicy::FailRun
        );
        assert_eq!(settings.retrieval.category, Some(Category::NarrativeText));
        assert!(!settings.ingest.dedup);
    }

    #[test]
    fn provider_serialization() {
        let json = serde_json::to_string(&EmbeddingProvider::OpenAi).unwrap();
        assert_eq!(json, "\"openai\"");

        let parsed: EmbeddingProvider = serde_json::from_str("\"hash\"").unwrap();
        assert_eq!(parsed, EmbeddingProvider::Hash);
    }

    #[test]
    fn policy_serialization() {
        let json = serde_json::to_string(&PartitionErrorPolicy::FailRun).unwrap();
        assert_eq!(json, "\"fail_run\"");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let settings: Settings = serde_json::from_str(
            r#"{ "embedding": { "provider": "hash", "dimensions": 64 },
                 "retrieval": { "category": "Title" } }"#,
        )
        .unwrap();

        assert_eq!(settings.embedding.provider, EmbeddingProvider::Hash);
        assert_eq!(settings.embedding.dimensions, 64);
        assert_eq!(settings.embedding.max_retries, 3);
        assert_eq!(settings.retrieval.category, Some(Category::Title));
        assert_eq!(settings.retrieval.limit, 5);
        assert_eq!(settings.ingest, IngestSettings::default());
    }

    #[test]
    fn null_category_searches_everything() {
        let settings: Settings =
            serde_json::from_str(r#"{ "retrieval": { "category": null } }"#).unwrap();
        assert!(settings.retrieval.category.is_none());
    }

    #[test]
    fn settings_roundtrip() {
        let mut settings = Settings::default();
        settings.database.path = Some(PathBuf::from("/tmp/store.db"));
        settings.embedding.provider = EmbeddingProvider::Hash;
        settings.ingest.extensions = vec!["eml".to_string(), "txt".to_string()];
        settings.ingest.on_partition_error = PartitionErrorPolicy::Skip;
        settings.retrieval.decay_order = SortOrder::Ascending;

        let json = serde_json::to_string_pretty(&settings).unwrap();
        let deserialized: Settings = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized, settings);
    }

    #[test]
    fn load_and_load_or_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let missing = Settings::load_or_default(&path).unwrap();
        assert_eq!(missing, Settings::default());
        assert!(matches!(
            Settings::load(&path),
            Err(ConfigError::Io { .. })
        ));

        std::fs::write(&path, r#"{ "ingest": { "recursive": true } }"#).unwrap();
        let loaded = Settings::load_or_default(&path).unwrap();
        assert!(loaded.ingest.recursive);

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn configured_database_path_wins() {
        let mut settings = Settings::default();
        settings.database.path = Some(PathBuf::from("/data/elements.db"));
        assert_eq!(
            settings.database_path().unwrap(),
            PathBuf::from("/data/elements.db")
        );
    }
}

//! Ingestion pipeline: documents to stored, embedded elements.
//!
//! A run discovers documents, partitions them, embeds every element and then
//! writes the whole batch in one transaction. Nothing is written unless every
//! element was embedded.

use std::path::Path;
use std::sync::Arc;

use futures::{stream, StreamExt, TryStreamExt};
use serde::Serialize;
use uuid::Uuid;

use super::error::{PipelineError, PipelineResult};
use crate::config::{PartitionErrorPolicy, Settings};
use crate::domain::{ElementId, NewElement, RawElement};
use crate::embedding::Embedder;
use crate::ingest::{DocumentSource, Partitioner, SourceDocument};
use crate::storage::queries::elements;
use crate::storage::{Database, InsertMode, StoreError};

/// Knobs for a single ingest run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Extensions to pick up, case-insensitive.
    pub extensions: Vec<String>,
    /// Also descend into subdirectories.
    pub recursive: bool,
    pub on_partition_error: PartitionErrorPolicy,
    pub insert_mode: InsertMode,
    /// Embedding requests allowed in flight at once.
    pub concurrency: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["eml".to_string()],
            recursive: false,
            on_partition_error: PartitionErrorPolicy::FailRun,
            insert_mode: InsertMode::Append,
            concurrency: 1,
        }
    }
}

impl IngestOptions {
    /// Derives run options from loaded settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            extensions: settings.ingest.extensions.clone(),
            recursive: settings.ingest.recursive,
            on_partition_error: settings.ingest.on_partition_error,
            insert_mode: if settings.ingest.dedup {
                InsertMode::SkipDuplicates
            } else {
                InsertMode::Append
            },
            concurrency: settings.embedding.concurrency,
        }
    }
}

/// A document left out of a run under [`PartitionErrorPolicy::Skip`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDocument {
    pub filename: String,
    pub reason: String,
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub run_id: Uuid,
    /// Documents discovered.
    pub documents: usize,
    pub skipped: Vec<SkippedDocument>,
    /// Elements produced by partitioning.
    pub elements: usize,
    /// Ids of the rows written, in element order.
    pub inserted: Vec<ElementId>,
    /// Elements dropped as duplicates.
    pub duplicates: usize,
}

/// Runs the write side of the pipeline against one store.
pub struct IngestService {
    db: Database,
    embedder: Arc<dyn Embedder>,
    partitioner: Arc<dyn Partitioner>,
    options: IngestOptions,
}

impl IngestService {
    /// Creates a new ingest service.
    pub fn new(
        db: Database,
        embedder: Arc<dyn Embedder>,
        partitioner: Arc<dyn Partitioner>,
        options: IngestOptions,
    ) -> Self {
        Self {
            db,
            embedder,
            partitioner,
            options,
        }
    }

    /// Returns the options this service runs with.
    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Ingests every matching document under `dir`.
    pub async fn run(&self, dir: impl AsRef<Path>) -> PipelineResult<IngestReport> {
        let run_id = Uuid::new_v4();
        let source = DocumentSource::new(dir.as_ref(), &self.options.extensions)
            .recursive(self.options.recursive);

        tracing::info!(run_id = %run_id, dir = %source.dir().display(), "Ingest run started");

        let documents = tokio::task::spawn_blocking(move || source.load_all())
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))??;

        self.ingest_documents(run_id, documents).await
    }

    /// Ingests documents that are already in memory.
    pub async fn ingest_documents(
        &self,
        run_id: Uuid,
        documents: Vec<SourceDocument>,
    ) -> PipelineResult<IngestReport> {
        if self.embedder.dimensions() != self.db.dimensions() {
            return Err(StoreError::DimensionMismatch {
                expected: self.db.dimensions(),
                actual: self.embedder.dimensions(),
            }
            .into());
        }

        let (raw, skipped) = self.partition_all(&documents)?;
        let element_count = raw.len();

        tracing::info!(
            run_id = %run_id,
            documents = documents.len(),
            skipped = skipped.len(),
            elements = element_count,
            "Documents partitioned"
        );

        let embedded = self.embed_all(raw).await?;
        let written = elements::insert_all(&self.db, embedded, self.options.insert_mode).await?;

        let report = IngestReport {
            run_id,
            documents: documents.len(),
            skipped,
            elements: element_count,
            inserted: written.inserted,
            duplicates: written.skipped,
        };

        tracing::info!(
            run_id = %run_id,
            inserted = report.inserted.len(),
            duplicates = report.duplicates,
            "Ingest run finished"
        );

        Ok(report)
    }

    fn partition_all(
        &self,
        documents: &[SourceDocument],
    ) -> PipelineResult<(Vec<RawElement>, Vec<SkippedDocument>)> {
        let mut raw = Vec::new();
        let mut skipped = Vec::new();

        for doc in documents {
            match self.partitioner.partition(doc) {
                Ok(elements) => {
                    tracing::debug!(
                        filename = %doc.filename,
                        elements = elements.len(),
                        "Partitioned"
                    );
                    raw.extend(elements);
                }
                Err(e) => match self.options.on_partition_error {
                    PartitionErrorPolicy::FailRun => return Err(e.into()),
                    PartitionErrorPolicy::Skip => {
                        tracing::warn!(filename = %doc.filename, error = %e, "Skipping document");
                        skipped.push(SkippedDocument {
                            filename: doc.filename.clone(),
                            reason: e.to_string(),
                        });
                    }
                },
            }
        }

        Ok((raw, skipped))
    }

    /// Embeds elements with bounded concurrency. Output order equals input
    /// order; the first failure aborts.
    async fn embed_all(&self, raw: Vec<RawElement>) -> PipelineResult<Vec<NewElement>> {
        let embedder = &self.embedder;

        let embedded: Vec<NewElement> = stream::iter(raw)
            .map(|element| async move {
                let embedding = embedder.embed(&element.text).await?;
                Ok::<_, PipelineError>(element.with_embedding(embedding))
            })
            .buffered(self.options.concurrency.max(1))
            .try_collect()
            .await?;

        Ok(embedded)
    }
}

//! Integration tests for the ingest and search pipeline.
//!
//! These run the public API end to end against real SQLite stores and the
//! message fixtures in `tests/fixtures/mail`.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;

use mailvec::config::PartitionErrorPolicy;
use mailvec::domain::{Category, ElementMetadata, RawElement};
use mailvec::embedding::{CachedEmbedder, Embedder, Embedding, HashEmbedder};
use mailvec::ingest::AutoPartitioner;
use mailvec::retrieval::{DecayedQuery, NearestQuery, SortOrder};
use mailvec::services::{IngestOptions, IngestService, PipelineError, SearchService};
use mailvec::storage::queries::{elements, similarity};
use mailvec::storage::{Database, InsertMode, StoreError};

const DIMENSIONS: usize = 16;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/mail")
}

fn embedder() -> Arc<dyn Embedder> {
    Arc::new(CachedEmbedder::new(HashEmbedder::new(DIMENSIONS), 64))
}

fn skipping() -> IngestOptions {
    IngestOptions {
        on_partition_error: PartitionErrorPolicy::Skip,
        ..Default::default()
    }
}

async fn ingest_fixtures(db: &Database, options: IngestOptions) -> Result<usize, PipelineError> {
    let service = IngestService::new(
        db.clone(),
        embedder(),
        Arc::new(AutoPartitioner::new()),
        options,
    );
    let report = service.run(fixtures()).await?;
    Ok(report.inserted.len())
}

// ============================================================================
// Retrieval scenario
// ============================================================================

#[tokio::test]
async fn filtered_top_two_scenario() {
    let db = Database::open_in_memory(1).await.unwrap();
    let other = Category::Other("Other".to_string());
    let rows = [
        (Category::NarrativeText, 0.1f32),
        (Category::NarrativeText, 0.5),
        (other.clone(), 0.05),
        (Category::NarrativeText, 0.3),
        (other, 0.2),
    ];

    let new = rows
        .into_iter()
        .enumerate()
        .map(|(i, (category, distance))| {
            RawElement::new(
                format!("element {i}"),
                category,
                ElementMetadata::for_file("scenario.eml"),
            )
            .with_embedding(Embedding::new(vec![distance]))
        })
        .collect();
    elements::insert_all(&db, new, InsertMode::Append)
        .await
        .unwrap();

    let query =
        NearestQuery::new(Embedding::new(vec![0.0]), 2).with_category(Category::NarrativeText);
    let matches = similarity::nearest(&db, &query).await.unwrap();

    let scores: Vec<f64> = matches
        .iter()
        .map(|m| (m.score * 100.0).round() / 100.0)
        .collect();
    assert_eq!(scores, vec![0.1, 0.3]);
    assert!(matches.iter().all(|m| m.category == Category::NarrativeText));
}

#[tokio::test]
async fn decayed_ranking_direction() {
    let db = Database::open_in_memory(1).await.unwrap();
    let now = Utc::now();
    let rows = [("fresh", 0.4f32, 0), ("stale", 0.4, 20), ("far", 0.9, 0)];

    let new = rows
        .into_iter()
        .map(|(text, value, age)| {
            let metadata = ElementMetadata {
                date: Some(now - Duration::days(age)),
                ..ElementMetadata::for_file("decay.eml")
            };
            RawElement::new(text, Category::NarrativeText, metadata)
                .with_embedding(Embedding::new(vec![value]))
        })
        .collect();
    elements::insert_all(&db, new, InsertMode::Append)
        .await
        .unwrap();

    let query = Embedding::new(vec![0.0]);
    let desc = DecayedQuery::new(query.clone(), 3, 0.2, SortOrder::Descending).at(now);
    let asc = DecayedQuery::new(query, 3, 0.2, SortOrder::Ascending).at(now);

    let desc: Vec<String> = similarity::decayed(&db, &desc)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.text)
        .collect();
    let asc: Vec<String> = similarity::decayed(&db, &asc)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.text)
        .collect();

    assert_eq!(desc, vec!["far", "fresh", "stale"]);
    assert_eq!(asc, vec!["stale", "fresh", "far"]);
}

// ============================================================================
// Ingestion
// ============================================================================

#[tokio::test]
async fn ingests_fixture_mailbox() {
    let db = Database::open_in_memory(DIMENSIONS).await.unwrap();
    let service = IngestService::new(
        db.clone(),
        embedder(),
        Arc::new(AutoPartitioner::new()),
        skipping(),
    );

    let report = service.run(fixtures()).await.unwrap();

    // empty.eml, launch.eml, outage.eml; notes.txt is filtered out.
    assert_eq!(report.documents, 3);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].filename, "empty.eml");
    assert_eq!(report.elements, 9);
    assert_eq!(elements::count(&db).await.unwrap(), 9);

    let counts = elements::count_by_category(&db).await.unwrap();
    assert_eq!(counts.get("Title"), Some(&2));
    assert_eq!(counts.get("NarrativeText"), Some(&3));
    assert_eq!(counts.get("ListItem"), Some(&4));

    let first = elements::get_by_id(&db, report.inserted[0])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.text, "Launch Checklist");
    assert_eq!(first.metadata.filename, "launch.eml");
    assert_eq!(first.metadata.subject.as_deref(), Some("Pricing page launch"));
    assert_eq!(first.metadata.sent_from, vec!["alice@example.com"]);
    assert_eq!(
        first.metadata.sent_to,
        vec!["bob@example.com", "carol@example.com"]
    );
    assert_eq!(first.embedding.dimension(), DIMENSIONS);
}

#[tokio::test]
async fn malformed_fixture_fails_whole_run_by_default() {
    let db = Database::open_in_memory(DIMENSIONS).await.unwrap();

    let err = ingest_fixtures(&db, IngestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Partition(_)));
    assert_eq!(elements::count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn reingesting_appends_unless_deduplicating() {
    let db = Database::open_in_memory(DIMENSIONS).await.unwrap();

    assert_eq!(ingest_fixtures(&db, skipping()).await.unwrap(), 9);
    assert_eq!(ingest_fixtures(&db, skipping()).await.unwrap(), 9);
    assert_eq!(elements::count(&db).await.unwrap(), 18);

    let dedup = IngestOptions {
        insert_mode: InsertMode::SkipDuplicates,
        ..skipping()
    };
    assert_eq!(ingest_fixtures(&db, dedup).await.unwrap(), 0);
    assert_eq!(elements::count(&db).await.unwrap(), 18);
}

// ============================================================================
// Search over ingested mail
// ============================================================================

#[tokio::test]
async fn exact_text_query_ranks_its_element_first() {
    let db = Database::open_in_memory(DIMENSIONS).await.unwrap();
    ingest_fixtures(&db, skipping()).await.unwrap();

    let search = SearchService::new(db, embedder());
    let matches = search
        .similar("Incident Summary", Some(Category::Title), 5)
        .await
        .unwrap();

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].text, "Incident Summary");
    assert_eq!(matches[0].score, 0.0);
    assert_eq!(matches[0].filename, "outage.eml");
}

#[tokio::test]
async fn recent_search_only_returns_dated_elements() {
    let db = Database::open_in_memory(DIMENSIONS).await.unwrap();
    ingest_fixtures(&db, skipping()).await.unwrap();

    let search = SearchService::new(db, embedder());
    let matches = search
        .recent("database failover", 0.05, SortOrder::Ascending, None, 20)
        .await
        .unwrap();

    assert_eq!(matches.len(), 9);
    assert!(matches.iter().all(|m| m.date.is_some()));
    assert!(matches.windows(2).all(|w| w[0].score <= w[1].score));
}

// ============================================================================
// Store lifecycle
// ============================================================================

#[tokio::test]
async fn store_persists_and_pins_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("elements.db");

    {
        let db = Database::open(&path, DIMENSIONS).await.unwrap();
        ingest_fixtures(&db, skipping()).await.unwrap();
    }

    let db = Database::open(&path, DIMENSIONS).await.unwrap();
    assert_eq!(elements::count(&db).await.unwrap(), 9);

    let err = Database::open(&path, DIMENSIONS * 2).await.unwrap_err();
    assert!(matches!(err, StoreError::DimensionConflict { .. }));
}

#[tokio::test]
async fn wrong_dimension_embedder_is_rejected() {
    let db = Database::open_in_memory(DIMENSIONS).await.unwrap();
    let service = IngestService::new(
        db.clone(),
        Arc::new(HashEmbedder::new(DIMENSIONS + 1)),
        Arc::new(AutoPartitioner::new()),
        skipping(),
    );

    let err = service.run(fixtures()).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Store(StoreError::DimensionMismatch { .. })
    ));
    assert_eq!(elements::count(&db).await.unwrap(), 0);
}

//! Query side of the pipeline: query text to ranked matches.

use std::sync::Arc;

use super::error::PipelineResult;
use crate::domain::Category;
use crate::embedding::Embedder;
use crate::retrieval::{DecayedQuery, Match, NearestQuery, SortOrder};
use crate::storage::queries::similarity;
use crate::storage::Database;

/// Embeds query strings and runs them against the store.
///
/// Wrap the embedder in a [`CachedEmbedder`](crate::embedding::CachedEmbedder)
/// to embed a repeated query string only once.
#[derive(Clone)]
pub struct SearchService {
    db: Database,
    embedder: Arc<dyn Embedder>,
}

impl SearchService {
    /// Creates a new search service.
    pub fn new(db: Database, embedder: Arc<dyn Embedder>) -> Self {
        Self { db, embedder }
    }

    /// Nearest elements by L2 distance, smallest first.
    pub async fn similar(
        &self,
        query: &str,
        category: Option<Category>,
        limit: usize,
    ) -> PipelineResult<Vec<Match>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query).await?;
        let mut nearest = NearestQuery::new(vector, limit);
        nearest.category = category;

        let matches = similarity::nearest(&self.db, &nearest).await?;
        tracing::debug!(query, results = matches.len(), "Similarity search");
        Ok(matches)
    }

    /// Elements ranked by recency-decayed distance in the given order.
    pub async fn recent(
        &self,
        query: &str,
        decay_rate: f64,
        order: SortOrder,
        category: Option<Category>,
        limit: usize,
    ) -> PipelineResult<Vec<Match>> {
        similarity::check_decay_rate(decay_rate)?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query).await?;
        let mut decayed = DecayedQuery::new(vector, limit, decay_rate, order);
        decayed.category = category;

        let matches = similarity::decayed(&self.db, &decayed).await?;
        tracing::debug!(query, results = matches.len(), "Decayed search");
        Ok(matches)
    }
}

impl std::fmt::Debug for SearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchService")
            .field("db", &self.db)
            .finish_non_exhaustive()
    }
}

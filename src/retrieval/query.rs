//! Query shapes and their results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Category, ElementId};
use crate::embedding::Embedding;

/// Direction of the `ORDER BY` on a score column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Smallest score first.
    Ascending,
    /// Largest score first.
    Descending,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Nearest-neighbour query by L2 distance, smallest first.
#[derive(Debug, Clone)]
pub struct NearestQuery {
    pub vector: Embedding,
    pub limit: usize,
    pub category: Option<Category>,
}

impl NearestQuery {
    pub fn new(vector: Embedding, limit: usize) -> Self {
        Self {
            vector,
            limit,
            category: None,
        }
    }

    /// Only consider elements with this category.
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }
}

/// Query ranked by `exp(-decay_rate * age_days) * distance`.
///
/// The sort direction has no default: descending ranks the largest decayed
/// distance first, ascending ranks the closest recent elements first.
/// Elements without a date are not considered.
#[derive(Debug, Clone)]
pub struct DecayedQuery {
    pub vector: Embedding,
    pub limit: usize,
    pub decay_rate: f64,
    pub order: SortOrder,
    pub category: Option<Category>,
    pub now: DateTime<Utc>,
}

impl DecayedQuery {
    pub fn new(vector: Embedding, limit: usize, decay_rate: f64, order: SortOrder) -> Self {
        Self {
            vector,
            limit,
            decay_rate,
            order,
            category: None,
            now: Utc::now(),
        }
    }

    /// Only consider elements with this category.
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Measures ages relative to `now` instead of the current time.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

/// One query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: ElementId,
    pub text: String,
    pub category: Category,
    pub filename: String,
    pub date: Option<DateTime<Utc>>,
    /// Distance, or decayed distance for [`DecayedQuery`].
    pub score: f64,
}

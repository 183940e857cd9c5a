//! Similarity search over stored elements.
//!
//! Both query shapes compute their score in SQL through the functions
//! registered in [`crate::storage::functions`] and sort on it in `ORDER BY`.
//! Ties are broken by ascending id, which is insertion order.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Row};

use super::elements::{epoch_seconds, parse_date};
use crate::domain::{Category, ElementId};
use crate::embedding::Embedding;
use crate::retrieval::{DecayedQuery, Match, NearestQuery};
use crate::storage::database::{Database, Result, StoreError};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Returns the `limit` elements closest to the query vector, smallest L2
/// distance first, optionally restricted to one category.
pub async fn nearest(db: &Database, query: &NearestQuery) -> Result<Vec<Match>> {
    if query.limit == 0 {
        return Ok(Vec::new());
    }
    db.check_dimension(query.vector.dimension())?;

    let mut params = vec![vector_param(&query.vector)];
    let filter = category_filter(query.category.as_ref(), &mut params, "WHERE");
    params.push(Value::Integer(limit_param(query.limit)));

    let sql = format!(
        r#"
        SELECT id, text, category, filename, date,
               l2_distance(embedding, ?1) AS score
        FROM elements
        {filter}
        ORDER BY score ASC, id ASC
        LIMIT ?{limit_idx}
        "#,
        limit_idx = params.len(),
    );

    tracing::debug!(
        limit = query.limit,
        category = ?query.category,
        "Running nearest-neighbour query"
    );

    run(db, sql, params).await
}

/// Returns the `limit` elements ranked by
/// `exp(-decay_rate * age_days) * l2_distance` in the query's sort order.
///
/// Elements without a date are skipped. Ages are measured against
/// `query.now`; dates after it count as age zero.
pub async fn decayed(db: &Database, query: &DecayedQuery) -> Result<Vec<Match>> {
    check_decay_rate(query.decay_rate)?;
    if query.limit == 0 {
        return Ok(Vec::new());
    }
    db.check_dimension(query.vector.dimension())?;

    let mut params = vec![
        vector_param(&query.vector),
        Value::Real(epoch_seconds(query.now)),
        Value::Real(query.decay_rate),
    ];
    let filter = category_filter(query.category.as_ref(), &mut params, "AND");
    params.push(Value::Integer(limit_param(query.limit)));

    let sql = format!(
        r#"
        SELECT id, text, category, filename, date,
               exp_decay((?2 - date_epoch) / {SECONDS_PER_DAY:.1}, ?3)
                   * l2_distance(embedding, ?1) AS score
        FROM elements
        WHERE date_epoch IS NOT NULL
        {filter}
        ORDER BY score {order}, id ASC
        LIMIT ?{limit_idx}
        "#,
        order = query.order.as_sql(),
        limit_idx = params.len(),
    );

    tracing::debug!(
        limit = query.limit,
        decay_rate = query.decay_rate,
        order = query.order.as_sql(),
        category = ?query.category,
        "Running decayed query"
    );

    run(db, sql, params).await
}

/// Rejects decay rates that are negative, NaN or infinite.
pub fn check_decay_rate(rate: f64) -> Result<()> {
    if rate.is_finite() && rate >= 0.0 {
        Ok(())
    } else {
        Err(StoreError::InvalidQuery(format!(
            "decay rate must be finite and non-negative, got {}",
            rate
        )))
    }
}

async fn run(db: &Database, sql: String, params: Vec<Value>) -> Result<Vec<Match>> {
    db.with_conn(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params), row_to_match)?;
        let matches: std::result::Result<Vec<_>, _> = rows.collect();
        Ok(matches?)
    })
    .await
}

fn vector_param(vector: &Embedding) -> Value {
    Value::Blob(vector.to_le_bytes())
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Appends the category parameter and returns the clause referencing it.
fn category_filter(category: Option<&Category>, params: &mut Vec<Value>, keyword: &str) -> String {
    match category {
        Some(category) => {
            params.push(Value::Text(category.as_str().to_string()));
            format!("{keyword} category = ?{}", params.len())
        }
        None => String::new(),
    }
}

fn row_to_match(row: &Row<'_>) -> rusqlite::Result<Match> {
    Ok(Match {
        id: ElementId(row.get(0)?),
        text: row.get(1)?,
        category: Category::from(row.get::<_, String>(2)?),
        filename: row.get(3)?,
        date: parse_date(4, row.get(4)?)?,
        score: row.get(5)?,
    })
}

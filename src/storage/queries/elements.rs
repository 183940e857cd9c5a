//! Element persistence.
//!
//! Elements are written once, in bulk, and never updated.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

use crate::domain::{Category, Element, ElementId, ElementMetadata, NewElement};
use crate::embedding::Embedding;
use crate::storage::database::{Database, Result, StoreError};

/// How [`insert_all`] treats elements that were stored before.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InsertMode {
    /// Insert every element, duplicates included.
    #[default]
    Append,
    /// Skip elements whose content hash is already present.
    SkipDuplicates,
}

/// Outcome of a bulk insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertReport {
    /// Ids of the inserted rows, in input order.
    pub inserted: Vec<ElementId>,
    /// Elements skipped as duplicates.
    pub skipped: usize,
}

/// Columns read back by [`row_to_element`], in order.
const SELECT_COLUMNS: &str = "id, text, category, filename, subject, date, sent_from, sent_to, \
                              embedding, content_hash";

/// Persists all elements in one transaction.
///
/// Either every element is written or none is. Elements are validated before
/// the transaction starts: a wrong-dimension embedding fails with
/// [`StoreError::DimensionMismatch`] and empty text with
/// [`StoreError::InvalidElement`].
pub async fn insert_all(
    db: &Database,
    elements: Vec<NewElement>,
    mode: InsertMode,
) -> Result<InsertReport> {
    for element in &elements {
        db.check_dimension(element.embedding.dimension())?;
        if element.text.trim().is_empty() {
            return Err(StoreError::InvalidElement(format!(
                "empty text in {}",
                element.metadata.filename
            )));
        }
    }

    if elements.is_empty() {
        return Ok(InsertReport::default());
    }

    let total = elements.len();
    let report = db
        .transaction(move |tx| {
            let now = Utc::now().to_rfc3339();
            let mut report = InsertReport::default();

            let mut insert = tx.prepare(
                r#"
                INSERT INTO elements (
                    text, category, filename, subject, date, date_epoch,
                    sent_from, sent_to, embedding, content_hash, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )?;
            let mut exists =
                tx.prepare("SELECT 1 FROM elements WHERE content_hash = ?1 LIMIT 1")?;

            for element in elements {
                let hash = element.content_hash();

                if mode == InsertMode::SkipDuplicates && exists.exists([&hash])? {
                    report.skipped += 1;
                    continue;
                }

                let metadata = &element.metadata;
                insert.execute(params![
                    element.text,
                    element.category.as_str(),
                    metadata.filename,
                    metadata.subject,
                    metadata.date.map(|d| d.to_rfc3339()),
                    metadata.date.map(epoch_seconds),
                    serde_json::to_string(&metadata.sent_from)?,
                    serde_json::to_string(&metadata.sent_to)?,
                    element.embedding.to_le_bytes(),
                    hash,
                    now,
                ])?;

                report.inserted.push(ElementId(tx.last_insert_rowid()));
            }

            Ok(report)
        })
        .await?;

    tracing::info!(
        total,
        inserted = report.inserted.len(),
        skipped = report.skipped,
        "Elements committed"
    );

    Ok(report)
}

/// Retrieves an element by its id.
pub async fn get_by_id(db: &Database, id: ElementId) -> Result<Option<Element>> {
    db.with_conn(move |conn| {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM elements WHERE id = ?1");
        let element = conn.query_row(&sql, [id.0], row_to_element).optional()?;
        Ok(element)
    })
    .await
}

/// Counts all stored elements.
pub async fn count(db: &Database) -> Result<u64> {
    db.with_conn(|conn| {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM elements", [], |row| row.get(0))?;
        Ok(count as u64)
    })
    .await
}

/// Counts stored elements per category.
pub async fn count_by_category(db: &Database) -> Result<BTreeMap<String, u64>> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT category, COUNT(*) FROM elements GROUP BY category")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?;
        let counts: std::result::Result<BTreeMap<_, _>, _> = rows.collect();
        Ok(counts?)
    })
    .await
}

pub(crate) fn epoch_seconds(date: DateTime<Utc>) -> f64 {
    date.timestamp_millis() as f64 / 1000.0
}

pub(crate) fn parse_date(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
        })
        .transpose()
}

fn parse_addresses(idx: usize, json: &str) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_element(row: &Row<'_>) -> rusqlite::Result<Element> {
    let sent_from: String = row.get(6)?;
    let sent_to: String = row.get(7)?;
    let blob: Vec<u8> = row.get(8)?;

    let embedding = Embedding::from_le_bytes(&blob).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            8,
            Type::Blob,
            format!("embedding BLOB of {} bytes", blob.len()).into(),
        )
    })?;

    Ok(Element {
        id: ElementId(row.get(0)?),
        text: row.get(1)?,
        category: Category::from(row.get::<_, String>(2)?),
        metadata: ElementMetadata {
            filename: row.get(3)?,
            subject: row.get(4)?,
            date: parse_date(5, row.get(5)?)?,
            sent_from: parse_addresses(6, &sent_from)?,
            sent_to: parse_addresses(7, &sent_to)?,
        },
        embedding,
        content_hash: row.get(9)?,
    })
}

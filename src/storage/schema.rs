//! SQL schema definitions.
//!
//! The `elements` table is generated per deployment because its `CHECK`
//! constraint pins the embedding BLOB to `4 * dimensions` bytes.

/// SQL to create the store metadata table.
pub const CREATE_STORE_META: &str = r#"
CREATE TABLE IF NOT EXISTS store_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
"#;

/// SQL to create element indexes.
pub const CREATE_ELEMENT_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_elements_category ON elements(category);
CREATE INDEX IF NOT EXISTS idx_elements_date ON elements(date_epoch);
CREATE INDEX IF NOT EXISTS idx_elements_hash ON elements(content_hash)
"#;

/// Key under which the deployment dimensionality is recorded.
pub const DIMENSIONS_KEY: &str = "dimensions";

/// SQL to create the elements table for vectors of `dimensions` values.
pub fn create_elements(dimensions: usize) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS elements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL CHECK (length(text) > 0),
    category TEXT NOT NULL,
    filename TEXT NOT NULL,
    subject TEXT,
    date TEXT,
    date_epoch REAL,
    sent_from TEXT NOT NULL,
    sent_to TEXT NOT NULL,
    embedding BLOB NOT NULL CHECK (length(embedding) = {bytes}),
    content_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
)
"#,
        bytes = dimensions * std::mem::size_of::<f32>()
    )
}

/// Returns all schema creation statements in order.
pub fn all_migrations(dimensions: usize) -> Vec<String> {
    vec![
        CREATE_STORE_META.to_string(),
        create_elements(dimensions),
        CREATE_ELEMENT_INDEXES.to_string(),
    ]
}

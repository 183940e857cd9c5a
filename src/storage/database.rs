//! Database handle and initialization.
//!
//! Provides a thread-safe wrapper around rusqlite for async operations.

use std::path::Path;
use std::sync::Arc;

use rusqlite::{Connection, OptionalExtension};
use thiserror::Error;
use tokio::sync::Mutex;

use super::{functions, schema};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Embedding has {actual} dimensions, store expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Store was created for {stored}-dimensional vectors, not {configured}")]
    DimensionConflict { stored: usize, configured: usize },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid element: {0}")]
    InvalidElement(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Thread-safe database connection wrapper.
///
/// Uses a Mutex to ensure only one operation accesses the connection at a time.
/// All operations are run via `spawn_blocking` to avoid blocking the async runtime.
/// Every connection has the vector functions from [`functions`] registered.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    dimensions: usize,
}

impl Database {
    /// Opens a store at the given path, creating it if necessary.
    ///
    /// `dimensions` is the deployment's embedding size. Opening an existing
    /// store created with a different size fails with
    /// [`StoreError::DimensionConflict`].
    pub async fn open(path: impl AsRef<Path>, dimensions: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            let conn = Connection::open(&path)?;
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            functions::register(&conn)?;
            Ok(conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))??;

        Self::init(conn, dimensions).await
    }

    /// Opens an in-memory store for testing.
    pub async fn open_in_memory(dimensions: usize) -> Result<Self> {
        let conn = tokio::task::spawn_blocking(|| -> Result<Connection> {
            let conn = Connection::open_in_memory()?;
            functions::register(&conn)?;
            Ok(conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))??;

        Self::init(conn, dimensions).await
    }

    async fn init(conn: Connection, dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(StoreError::InvalidConfig(
                "embedding dimensions must be positive".to_string(),
            ));
        }

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            dimensions,
        };

        db.create_schema().await?;

        tracing::debug!(dimensions, "Store opened");
        Ok(db)
    }

    /// Embedding size every stored vector must have.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Creates tables and indexes if they do not exist and records the
    /// deployment dimensionality. Safe to call repeatedly.
    pub async fn create_schema(&self) -> Result<()> {
        let dimensions = self.dimensions;

        self.with_conn(move |conn| {
            for migration in schema::all_migrations(dimensions) {
                conn.execute_batch(&migration)?;
            }

            conn.execute(
                "INSERT OR IGNORE INTO store_meta (key, value) VALUES (?1, ?2)",
                [schema::DIMENSIONS_KEY, &dimensions.to_string()],
            )?;

            let stored: Option<String> = conn
                .query_row(
                    "SELECT value FROM store_meta WHERE key = ?1",
                    [schema::DIMENSIONS_KEY],
                    |row| row.get(0),
                )
                .optional()?;

            let stored = stored
                .as_deref()
                .and_then(|v| v.parse::<usize>().ok())
                .ok_or_else(|| {
                    StoreError::InvalidConfig("store_meta has no valid dimensions".to_string())
                })?;

            if stored != dimensions {
                return Err(StoreError::DimensionConflict {
                    stored,
                    configured: dimensions,
                });
            }

            Ok(())
        })
        .await
    }

    /// Fails with [`StoreError::DimensionMismatch`] unless `actual` matches
    /// the store's dimensionality.
    pub fn check_dimension(&self, actual: usize) -> Result<()> {
        if actual != self.dimensions {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimensions,
                actual,
            });
        }
        Ok(())
    }

    /// Executes a function with access to the database connection.
    ///
    /// The function runs in a blocking task to avoid blocking the async runtime.
    pub async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Executes a transaction with the given function.
    ///
    /// The transaction is automatically committed on success or rolled back on error.
    pub async fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            let tx = conn.transaction()?;
            let result = f(&tx)?;
            tx.commit()?;
            Ok(result)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_in_memory_creates_schema() {
        let db = Database::open_in_memory(4).await.unwrap();

        let tables: Vec<String> = db
            .with_conn(|conn| {
                let mut stmt = conn
                    .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
            })
            .await
            .unwrap();

        assert!(tables.contains(&"elements".to_string()));
        assert!(tables.contains(&"store_meta".to_string()));
    }

    #[tokio::test]
    async fn vector_functions_are_registered() {
        let db = Database::open_in_memory(2).await.unwrap();

        let factor: f64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT exp_decay(0, 1)", [], |row| row.get(0))?))
            .await
            .unwrap();

        assert_eq!(factor, 1.0);
    }

    #[tokio::test]
    async fn create_schema_is_idempotent() {
        let db = Database::open_in_memory(3).await.unwrap();
        db.create_schema().await.unwrap();
        db.create_schema().await.unwrap();
        assert_eq!(db.dimensions(), 3);
    }

    #[tokio::test]
    async fn zero_dimensions_is_rejected() {
        let err = Database::open_in_memory(0).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn reopening_with_other_dimensions_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");

        {
            let db = Database::open(&path, 8).await.unwrap();
            assert_eq!(db.dimensions(), 8);
        }

        let err = Database::open(&path, 16).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::DimensionConflict {
                stored: 8,
                configured: 16
            }
        ));

        assert!(Database::open(&path, 8).await.is_ok());
    }

    #[tokio::test]
    async fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.db");

        Database::open(&path, 2).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn transaction_rolls_back_on_error() {
        let db = Database::open_in_memory(2).await.unwrap();

        let result: Result<()> = db
            .transaction(|tx| {
                tx.execute(
                    "INSERT INTO store_meta (key, value) VALUES (?1, ?2)",
                    ["rollback_key", "rollback_value"],
                )?;
                Err(StoreError::InvalidQuery("intentional error".to_string()))
            })
            .await;

        assert!(result.is_err());

        let count: i64 = db
            .with_conn(|conn| {
                let count = conn.query_row(
                    "SELECT COUNT(*) FROM store_meta WHERE key = ?1",
                    ["rollback_key"],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await
            .unwrap();

        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn database_is_clone() {
        let db1 = Database::open_in_memory(2).await.unwrap();
        let db2 = db1.clone();

        db1.transaction(|tx| {
            tx.execute(
                "INSERT INTO store_meta (key, value) VALUES (?1, ?2)",
                ["clone_key", "clone_value"],
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let value: String = db2
            .with_conn(|conn| {
                let value = conn.query_row(
                    "SELECT value FROM store_meta WHERE key = ?1",
                    ["clone_key"],
                    |row| row.get(0),
                )?;
                Ok(value)
            })
            .await
            .unwrap();

        assert_eq!(value, "clone_value");
    }
}

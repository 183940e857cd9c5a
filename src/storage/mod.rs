//! Vector store.
//!
//! This module provides the storage layer for mailvec, including:
//!
//! - SQLite database holding elements and their embeddings
//! - `l2_distance` and `exp_decay` SQL functions for similarity queries
//! - Async-safe database operations via tokio::task::spawn_blocking

mod database;
pub mod functions;
pub mod queries;
mod schema;

pub use database::{Database, Result, StoreError};
pub use queries::elements::{InsertMode, InsertReport};

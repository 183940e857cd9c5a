//! mailvec - Email embeddings in SQLite with similarity search
//!
//! This crate loads documents (RFC 5322 messages and plain text) into a
//! SQLite store as embedded elements and answers nearest-neighbour and
//! recency-decayed queries over them.

pub mod config;
pub mod domain;
pub mod embedding;
pub mod ingest;
pub mod retrieval;
pub mod services;
pub mod storage;

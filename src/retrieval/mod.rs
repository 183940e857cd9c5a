//! Retrieval query types.
//!
//! The queries here are plain data; [`crate::storage::queries::similarity`]
//! turns them into SQL.

pub mod decay;
mod query;

pub use query::{DecayedQuery, Match, NearestQuery, SortOrder};

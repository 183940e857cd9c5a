//! Database query modules.
//!
//! Each module provides async functions that operate on the database.

pub mod elements;
pub mod similarity;

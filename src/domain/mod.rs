//! Domain layer types.
//!
//! This module contains the element types that flow through the pipeline,
//! from partitioner output to persisted rows.

mod element;
mod types;

pub use element::{Element, ElementMetadata, NewElement, RawElement};
pub use types::{Category, ElementId};

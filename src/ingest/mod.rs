//! Document ingestion.
//!
//! Reads source documents from a directory and partitions each one into
//! classified [`RawElement`](crate::domain::RawElement)s.
//!
//! - [`DocumentSource`] - Directory scan with an extension filter
//! - [`Partitioner`] - Document to elements; [`EmailPartitioner`] and
//!   [`TextPartitioner`] are the built-in implementations, [`AutoPartitioner`]
//!   picks one by extension

mod email;
mod partition;
mod source;
mod text;

pub use email::EmailPartitioner;
pub use partition::{
    classify, elements_from_body, split_blocks, AutoPartitioner, PartitionError, Partitioner,
};
pub use source::{DocumentSource, IngestError, SourceDocument};
pub use text::TextPartitioner;

#[cfg(test)]
pub use partition::MockPartitioner;

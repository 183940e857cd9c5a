//! Plain-text partitioner.

use super::partition::{elements_from_body, PartitionError, Partitioner};
use super::source::SourceDocument;
use crate::domain::{ElementMetadata, RawElement};

/// Partitions UTF-8 text files. Only the filename is recorded as metadata.
#[derive(Debug, Default, Clone)]
pub struct TextPartitioner;

impl TextPartitioner {
    pub fn new() -> Self {
        Self
    }
}

impl Partitioner for TextPartitioner {
    fn partition(&self, doc: &SourceDocument) -> Result<Vec<RawElement>, PartitionError> {
        let body = std::str::from_utf8(&doc.bytes)
            .map_err(|e| PartitionError::malformed(doc, format!("invalid UTF-8: {}", e)))?;

        Ok(elements_from_body(
            body,
            &ElementMetadata::for_file(doc.filename.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Category;

    #[test]
    fn partitions_paragraphs() {
        let doc = SourceDocument::from_bytes(
            "notes.txt",
            "Meeting Notes\n\nThe budget was approved for next year.\n",
        );
        let elements = TextPartitioner::new().partition(&doc).unwrap();

        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].category, Category::Title);
        assert_eq!(elements[1].category, Category::NarrativeText);
        assert_eq!(elements[1].metadata.filename, "notes.txt");
        assert!(elements[1].metadata.date.is_none());
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let doc = SourceDocument::from_bytes("bad.txt", vec![0xff, 0xfe, 0xfd]);
        let err = TextPartitioner::new().partition(&doc).unwrap_err();
        assert!(matches!(err, PartitionError::Malformed { .. }));
    }

    #[test]
    fn empty_file_has_no_elements() {
        let doc = SourceDocument::from_bytes("empty.txt", "");
        assert!(TextPartitioner::new().partition(&doc).unwrap().is_empty());
    }
}

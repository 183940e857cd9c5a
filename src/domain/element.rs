//! Element domain types.
//!
//! An element is one text span cut out of a source document. It moves through
//! three shapes: [`RawElement`] straight out of a partitioner, [`NewElement`]
//! once its embedding is attached, and [`Element`] after the store assigned
//! an id.

use chrono::{DateTime, Utc};
use ring::digest;
use serde::{Deserialize, Serialize};

use super::{Category, ElementId};
use crate::embedding::Embedding;

/// Provenance of an element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementMetadata {
    /// Name of the source file (without directory).
    pub filename: String,
    /// Subject line of the source message, if any.
    pub subject: Option<String>,
    /// When the source message was sent.
    pub date: Option<DateTime<Utc>>,
    /// Sender addresses, in header order.
    pub sent_from: Vec<String>,
    /// Recipient addresses, in header order.
    pub sent_to: Vec<String>,
}

impl ElementMetadata {
    /// Creates metadata carrying only a filename.
    pub fn for_file(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }
}

/// Partitioner output: text plus metadata, not yet embedded.
#[derive(Debug, Clone, PartialEq)]
pub struct RawElement {
    pub text: String,
    pub category: Category,
    pub metadata: ElementMetadata,
}

impl RawElement {
    pub fn new(text: impl Into<String>, category: Category, metadata: ElementMetadata) -> Self {
        Self {
            text: text.into(),
            category,
            metadata,
        }
    }

    /// Attaches an embedding, producing an element ready for persistence.
    pub fn with_embedding(self, embedding: Embedding) -> NewElement {
        NewElement {
            text: self.text,
            category: self.category,
            metadata: self.metadata,
            embedding,
        }
    }
}

/// An embedded element that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewElement {
    pub text: String,
    pub category: Category,
    pub metadata: ElementMetadata,
    pub embedding: Embedding,
}

impl NewElement {
    /// SHA-256 over filename, category and text, hex encoded.
    ///
    /// Used as the deduplication key when re-ingesting the same documents.
    pub fn content_hash(&self) -> String {
        content_hash(&self.metadata.filename, &self.category, &self.text)
    }
}

/// A persisted element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Identifier assigned by the store.
    pub id: ElementId,
    /// Textual content, never empty.
    pub text: String,
    /// Partitioner label.
    pub category: Category,
    /// Provenance metadata.
    pub metadata: ElementMetadata,
    /// Vector computed at ingestion.
    pub embedding: Embedding,
    /// Deduplication key, see [`NewElement::content_hash`].
    pub content_hash: String,
}

fn content_hash(filename: &str, category: &Category, text: &str) -> String {
    let mut ctx = digest::Context::new(&digest::SHA256);
    // NUL separators keep ("ab", "c") and ("a", "bc") apart.
    ctx.update(filename.as_bytes());
    ctx.update(&[0]);
    ctx.update(category.as_str().as_bytes());
    ctx.update(&[0]);
    ctx.update(text.as_bytes());

    ctx.finish()
        .as_ref()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_element(filename: &str, text: &str) -> NewElement {
        RawElement::new(
            text,
            Category::NarrativeText,
            ElementMetadata::for_file(filename),
        )
        .with_embedding(Embedding::new(vec![0.0, 1.0]))
    }

    #[test]
    fn with_embedding_keeps_fields() {
        let raw = RawElement::new(
            "Quarterly numbers are in.",
            Category::NarrativeText,
            ElementMetadata {
                filename: "q3.eml".to_string(),
                subject: Some("Q3".to_string()),
                date: None,
                sent_from: vec!["cfo@example.com".to_string()],
                sent_to: vec!["board@example.com".to_string()],
            },
        );

        let element = raw.clone().with_embedding(Embedding::new(vec![1.0]));
        assert_eq!(element.text, raw.text);
        assert_eq!(element.metadata, raw.metadata);
        assert_eq!(element.embedding.dimension(), 1);
    }

    #[test]
    fn content_hash_is_stable_hex() {
        let hash = make_element("a.eml", "Hello there.").content_hash();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, make_element("a.eml", "Hello there.").content_hash());
    }

    #[test]
    fn content_hash_ignores_embedding() {
        let mut a = make_element("a.eml", "Same text.");
        let b = make_element("a.eml", "Same text.");
        a.embedding = Embedding::new(vec![9.0, 9.0]);
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn content_hash_separates_fields() {
        let a = make_element("ab", "c");
        let b = make_element("a", "bc");
        assert_ne!(a.content_hash(), b.content_hash());
    }
}

//! Partitioning of documents into classified elements.

use thiserror::Error;

use super::source::SourceDocument;
use crate::domain::{Category, ElementMetadata, RawElement};

/// Errors produced while partitioning a single document.
#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("Malformed document {filename}: {reason}")]
    Malformed { filename: String, reason: String },

    #[error("No partitioner for {filename}")]
    Unsupported { filename: String },
}

impl PartitionError {
    pub(crate) fn malformed(doc: &SourceDocument, reason: impl Into<String>) -> Self {
        PartitionError::Malformed {
            filename: doc.filename.clone(),
            reason: reason.into(),
        }
    }
}

/// Splits a document into zero or more elements.
#[cfg_attr(test, mockall::automock)]
pub trait Partitioner: Send + Sync {
    fn partition(&self, doc: &SourceDocument) -> Result<Vec<RawElement>, PartitionError>;
}

/// Words at or under which a line without sentence punctuation reads as a title.
const TITLE_MAX_WORDS: usize = 12;

/// Words needed before punctuated text counts as narrative.
const NARRATIVE_MIN_WORDS: usize = 5;

fn is_list_line(line: &str) -> bool {
    let line = line.trim_start();
    if ["- ", "* ", "• ", "+ "].iter().any(|m| line.starts_with(m)) {
        return true;
    }

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0
        && line[digits..]
            .chars()
            .next()
            .is_some_and(|c| c == '.' || c == ')')
        && line[digits + 1..].starts_with(' ')
}

fn ends_with_punctuation(text: &str) -> bool {
    text.trim_end()
        .chars()
        .last()
        .is_some_and(|c| matches!(c, '.' | '!' | '?' | ':' | ';' | ','))
}

/// Assigns a category to a single block of text.
pub fn classify(block: &str) -> Category {
    let block = block.trim();
    if is_list_line(block) {
        return Category::ListItem;
    }

    let words = block.split_whitespace().count();
    let has_sentence_mark = block.contains(['.', '!', '?']);

    if words >= NARRATIVE_MIN_WORDS && has_sentence_mark {
        return Category::NarrativeText;
    }

    let capitalised = block.chars().next().is_some_and(|c| c.is_uppercase());
    if words <= TITLE_MAX_WORDS && capitalised && !ends_with_punctuation(block) {
        return Category::Title;
    }

    Category::UncategorizedText
}

/// Splits a body into text blocks.
///
/// Blocks are separated by blank lines. Wrapped lines inside a block are
/// joined with a space, list lines become blocks of their own, and quoted
/// reply lines (`>`) are dropped. A quoted line also ends the block before it.
pub fn split_blocks(body: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    let flush = |current: &mut Vec<&str>, blocks: &mut Vec<String>| {
        if !current.is_empty() {
            blocks.push(current.join(" "));
            current.clear();
        }
    };

    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('>') || trimmed.is_empty() {
            flush(&mut current, &mut blocks);
        } else if is_list_line(trimmed) {
            flush(&mut current, &mut blocks);
            blocks.push(trimmed.to_string());
        } else {
            current.push(trimmed);
        }
    }
    flush(&mut current, &mut blocks);

    blocks
}

/// Splits `body` into classified elements sharing `metadata`.
pub fn elements_from_body(body: &str, metadata: &ElementMetadata) -> Vec<RawElement> {
    split_blocks(body)
        .into_iter()
        .map(|block| {
            let category = classify(&block);
            RawElement::new(block, category, metadata.clone())
        })
        .collect()
}

/// Dispatches on file extension: `eml` goes to the email partitioner,
/// `txt`, `text` and `md` to the plain-text partitioner. Other extensions
/// are [`PartitionError::Unsupported`].
#[derive(Debug, Default, Clone)]
pub struct AutoPartitioner {
    email: super::EmailPartitioner,
    text: super::TextPartitioner,
}

impl AutoPartitioner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Partitioner for AutoPartitioner {
    fn partition(&self, doc: &SourceDocument) -> Result<Vec<RawElement>, PartitionError> {
        match doc.extension().as_deref() {
            Some("eml") => self.email.partition(doc),
            Some("txt") | Some("text") | Some("md") => self.text.partition(doc),
            _ => Err(PartitionError::Unsupported {
                filename: doc.filename.clone(),
            }),
        }
    }
}

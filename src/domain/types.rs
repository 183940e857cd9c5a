//! Core identifier and label types for stored elements.
//!
//! These newtype wrappers keep store-assigned identifiers and partitioner
//! labels from being mixed up with plain integers and strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned identifier of a persisted element.
///
/// Identifiers increase with insertion order and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub i64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ElementId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Classification label assigned to an element by a partitioner.
///
/// The well-known labels get their own variants; anything else a partitioner
/// produces is kept verbatim in [`Category::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    /// Running prose made of full sentences.
    NarrativeText,
    /// Short heading-like line.
    Title,
    /// Bulleted or enumerated line.
    ListItem,
    /// Text that matched no other rule.
    UncategorizedText,
    /// Any other partitioner label.
    Other(String),
}

impl Category {
    /// Returns the label as stored in the database.
    pub fn as_str(&self) -> &str {
        match self {
            Category::NarrativeText => "NarrativeText",
            Category::Title => "Title",
            Category::ListItem => "ListItem",
            Category::UncategorizedText => "UncategorizedText",
            Category::Other(label) => label,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        match s {
            "NarrativeText" => Category::NarrativeText,
            "Title" => Category::Title,
            "ListItem" => Category::ListItem,
            "UncategorizedText" => Category::UncategorizedText,
            other => Category::Other(other.to_owned()),
        }
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Category::from(s.as_str())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_owned()
    }
}

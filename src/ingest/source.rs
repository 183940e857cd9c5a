//! Source document discovery.
//!
//! Lists files in a directory that match an extension filter and loads them
//! into memory for partitioning.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while locating or reading source documents.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Source directory not found: {0}")]
    MissingDirectory(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A document loaded from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Full path the document was read from.
    pub path: PathBuf,
    /// File name without directory, used as element provenance.
    pub filename: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    /// Creates an in-memory document, mostly useful for tests.
    pub fn from_bytes(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let filename = filename.into();
        Self {
            path: PathBuf::from(&filename),
            filename,
            bytes: bytes.into(),
        }
    }

    /// Reads a document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref().to_path_buf();
        let bytes = std::fs::read(&path).map_err(|source| IngestError::Io {
            path: path.clone(),
            source,
        })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            path,
            filename,
            bytes,
        })
    }

    /// Lower-cased extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }
}

/// A directory of source documents with an extension filter.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    dir: PathBuf,
    extensions: Vec<String>,
    recursive: bool,
}

impl DocumentSource {
    /// Creates a source over `dir` accepting the given extensions.
    ///
    /// Extensions match case-insensitively, with or without a leading dot.
    /// An empty list accepts every file.
    pub fn new<I, S>(dir: impl Into<PathBuf>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            dir: dir.into(),
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
            recursive: false,
        }
    }

    /// Also descend into subdirectories.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Returns the directory being scanned.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn accepts(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|e| self.extensions.iter().any(|x| *x == e))
    }

    /// Lists matching files, sorted by path.
    pub fn discover(&self) -> Result<Vec<PathBuf>, IngestError> {
        if !self.dir.is_dir() {
            return Err(IngestError::MissingDirectory(self.dir.clone()));
        }

        let mut found = Vec::new();
        self.walk(&self.dir, &mut found)?;
        found.sort();
        Ok(found)
    }

    fn walk(&self, dir: &Path, found: &mut Vec<PathBuf>) -> Result<(), IngestError> {
        let io_err = |source| IngestError::Io {
            path: dir.to_path_buf(),
            source,
        };

        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_dir() {
                if self.recursive {
                    self.walk(&path, found)?;
                }
            } else if self.accepts(&path) {
                found.push(path);
            }
        }

        Ok(())
    }

    /// Discovers and loads every matching document, in path order.
    pub fn load_all(&self) -> Result<Vec<SourceDocument>, IngestError> {
        self.discover()?
            .into_iter()
            .map(SourceDocument::load)
            .collect()
    }
}

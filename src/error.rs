//! Error types for the batch command line.
//!
//! Only [`Error::Configuration`] and the single-item faults surfaced by
//! [`crate::BatchDriver::run`] are fatal. Every other variant is caught at the
//! boundary of the item that raised it and turned into a
//! [`crate::Diagnostic`].

use std::path::PathBuf;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or contradictory configuration, detected before the batch starts.
    #[error("{0}")]
    Configuration(String),

    /// A document could not be fetched, read or decoded.
    #[error(transparent)]
    Materialization(#[from] MaterializationError),

    /// A document failed the size gate.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The extraction engine failed on a document.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// A result could not be persisted.
    #[error(transparent)]
    Output(#[from] OutputError),
}

impl Error {
    /// Short machine-readable label used in diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Materialization(e) => e.kind(),
            Self::Validation(e) => e.kind(),
            Self::Extraction(_) => "extraction",
            Self::Output(e) => e.kind(),
        }
    }
}

/// Failure to turn a batch item into raw content.
#[derive(Debug, thiserror::Error)]
pub enum MaterializationError {
    /// The fetcher returned nothing for this URL.
    #[error("no valid result for url: {0}")]
    Fetch(String),

    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The content is not valid UTF-8.
    #[error("system, file type or buffer encoding: {0}")]
    Decode(String),
}

impl MaterializationError {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Read { .. } => "read",
            Self::Decode(_) => "decode",
        }
    }
}

/// Size gate violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("empty document")]
    Empty,
    #[error("file too large")]
    TooLarge,
    #[error("file too small")]
    TooSmall,
}

impl ValidationError {
    #[must_use]
    pub fn kind(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::TooLarge => "too_large",
            Self::TooSmall => "too_small",
        }
    }
}

/// Category of an extraction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionErrorKind {
    /// The document holds no extractable text.
    NoContent,
    /// The document could not be parsed.
    Parse,
    /// Serialization of the extracted tree failed.
    Serialize,
    /// The extractor panicked.
    Panic,
    /// Anything else reported by a custom extractor.
    Other,
}

impl std::fmt::Display for ExtractionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::NoContent => "NoContent",
            Self::Parse => "Parse",
            Self::Serialize => "Serialize",
            Self::Panic => "Panic",
            Self::Other => "Other",
        };
        f.write_str(label)
    }
}

/// Failure reported by (or caught around) the extraction engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (details: {kind})")]
pub struct ExtractionError {
    pub kind: ExtractionErrorKind,
    pub message: String,
}

impl ExtractionError {
    pub fn new(kind: ExtractionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn no_content() -> Self {
        Self::new(ExtractionErrorKind::NoContent, "no extractable content found")
    }
}

/// Failure to persist a result.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// The output directory does not exist and cannot be created.
    #[error("destination directory cannot be created: {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No free file name was found within the attempt budget.
    #[error("no free file name in {dir} after {attempts} attempts")]
    NamesExhausted { dir: PathBuf, attempts: usize },

    /// The chosen file appeared between naming and creation.
    #[error("refusing to overwrite existing file: {0}")]
    Collision(PathBuf),

    /// Writing to the destination failed.
    #[error("cannot write {target}: {source}")]
    Write {
        target: String,
        #[source]
        source: std::io::Error,
    },
}

impl OutputError {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateDir { .. } => "create_dir",
            Self::NamesExhausted { .. } => "names_exhausted",
            Self::Collision(_) => "collision",
            Self::Write { .. } => "write",
        }
    }
}

/// Result type alias for batch operations.
pub type Result<T> = std::result::Result<T, Error>;

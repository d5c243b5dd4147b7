//! Configuration options for content extraction.
//!
//! `ExtractionOptions` is derived once from the command line and shared,
//! read-only, by every item of a batch.

use std::fmt;

/// Serialization produced by the extractor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text.
    #[default]
    Txt,
    /// Tab-separated values, one line per document.
    Csv,
    /// Generic XML (`<doc>` root).
    Xml,
    /// XML following the Text Encoding Initiative guidelines.
    Xmltei,
}

impl OutputFormat {
    /// File extension (with leading dot) for files written in this format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Xml | Self::Xmltei => ".xml",
            Self::Csv => ".csv",
            Self::Txt => ".txt",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Txt => "txt",
            Self::Csv => "csv",
            Self::Xml => "xml",
            Self::Xmltei => "xmltei",
        };
        f.write_str(name)
    }
}

/// Configuration options for content extraction.
///
/// All fields are public for easy configuration. Use `Default::default()`
/// for standard settings.
///
/// # Example
///
/// ```rust
/// use rs_trafilatura_cli::{ExtractionOptions, OutputFormat};
///
/// let options = ExtractionOptions {
///     output_format: OutputFormat::Xml,
///     include_comments: false,
///     ..ExtractionOptions::default()
/// };
/// assert!(options.fallback);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ExtractionOptions {
    /// Run the fallback extractors when the main pass finds little text.
    ///
    /// Default: `true` (`--fast` turns it off)
    pub fallback: bool,

    /// Include the comments section in the output.
    ///
    /// Default: `true`
    pub include_comments: bool,

    /// Include table content in the output.
    ///
    /// Default: `true`
    pub include_tables: bool,

    /// Keep bold/italic markup in the output.
    ///
    /// Default: `false`
    pub include_formatting: bool,

    /// Output serialization.
    ///
    /// Default: `OutputFormat::Txt`
    pub output_format: OutputFormat,

    /// Check TEI output against the permitted element set.
    ///
    /// Only meaningful with `OutputFormat::Xmltei`.
    ///
    /// Default: `false`
    pub tei_validation: bool,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            fallback: true,
            include_comments: true,
            include_tables: true,
            include_formatting: false,
            output_format: OutputFormat::Txt,
            tei_validation: false,
        }
    }
}

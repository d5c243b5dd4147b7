//! # rs-trafilatura-cli
//!
//! Batch front end for trafilatura-style content extraction.
//!
//! A run takes exactly one input (a URL list, a feed, a directory, a single
//! URL or the standard input), pushes every item through a size gate and an
//! extraction engine, and writes each result either to standard output or to
//! a new file in an output directory.
//!
//! ## Quick Start
//!
//! ```rust
//! use rs_trafilatura_cli::{BatchConfig, BatchDriver, InputSource, SingleInput};
//!
//! let config = BatchConfig::new(InputSource::Single(SingleInput::Stdin));
//! let driver = BatchDriver::new(config)?;
//! let html = "<html><head><title>My Article</title></head><body></body></html>";
//! let report = driver.run_with_stdin(html.as_bytes())?;
//! assert_eq!(report.written, 1);
//! # Ok::<(), rs_trafilatura_cli::Error>(())
//! ```
//!
//! ## Failure model
//!
//! Per-item failures (download, decoding, size gate, extraction, output) are
//! reported to a [`DiagnosticSink`] and never stop the batch. Only
//! configuration errors and faults on a designated single input are returned
//! from [`BatchDriver::run`].

mod error;
mod options;

/// Fixed limits and defaults.
pub mod settings;

/// Size gate applied before extraction.
pub mod validate;

/// Per-item diagnostics and their sinks.
pub mod diagnostics;

/// Random, collision-free output file names.
pub mod naming;

/// Result persistence (stdout or directory).
pub mod writer;

/// Character encoding detection and transcoding.
pub mod encoding;

/// Downloading remote documents.
pub mod fetch;

/// Extraction engine boundary and the built-in extractor.
pub mod extractor;

/// Feed discovery (RSS, Atom, JSON Feed).
pub mod feeds;

/// Input resolvers.
pub mod resolve;

/// Batch configuration.
pub mod config;

/// Command-line arguments.
pub mod cli;

/// Batch driver.
pub mod driver;

// Public API - re-exports
pub use cli::Args;
pub use config::{BatchConfig, InputSource, SingleInput};
pub use diagnostics::{Diagnostic, DiagnosticSink, MemorySink, Severity, TracingSink};
pub use driver::{BatchDriver, BatchReport, StopHandle};
pub use error::{
    Error, ExtractionError, ExtractionErrorKind, MaterializationError, OutputError, Result, ValidationError,
};
pub use extractor::{install_panic_hook, try_extract, Extractor, HtmlExtractor};
pub use feeds::{FeedDiscovery, FeedFinder};
pub use fetch::{Fetcher, HttpFetcher};
pub use naming::OutputNamer;
pub use options::{ExtractionOptions, OutputFormat};
pub use resolve::BatchItem;
pub use validate::{validate, SizeBounds, Validation};
pub use writer::{OutputTarget, ResultWriter};

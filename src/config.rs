//! Batch configuration, resolved once before the run starts.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crate::options::ExtractionOptions;
use crate::settings::{DEFAULT_FETCH_TIMEOUT, DEFAULT_SLEEP};
use crate::validate::SizeBounds;
use crate::writer::OutputTarget;

/// A single document: an explicit URL or the input stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SingleInput {
    Url(String),
    Stdin,
}

/// The one input mode of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// File with one URL per line.
    UrlList(PathBuf),
    /// Feed (or page advertising a feed) to expand into URLs.
    Feed(String),
    /// Directory walked recursively. `source_url` is attached to every file.
    Directory {
        root: PathBuf,
        source_url: Option<String>,
    },
    Single(SingleInput),
}

impl InputSource {
    /// Whether items are fetched over the network one after another.
    #[must_use]
    pub fn is_url_based(&self) -> bool {
        matches!(self, Self::UrlList(_) | Self::Feed(_) | Self::Single(SingleInput::Url(_)))
    }
}

/// Everything the batch driver needs to know.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    pub input: InputSource,
    pub output: OutputTarget,
    pub options: ExtractionOptions,
    /// Pause between consecutive URLs.
    pub delay: Duration,
    /// Seed of the output namer.
    pub seed: u64,
    /// Worker threads for directory batches.
    pub workers: usize,
    /// Print the resolved URLs instead of processing them.
    pub list_only: bool,
    pub fetch_timeout: Duration,
    pub size_bounds: SizeBounds,
}

impl BatchConfig {
    /// Defaults for everything but the input.
    #[must_use]
    pub fn new(input: InputSource) -> Self {
        Self {
            input,
            output: OutputTarget::Stdout,
            options: ExtractionOptions::default(),
            delay: DEFAULT_SLEEP,
            seed: 0,
            workers: default_workers(),
            list_only: false,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            size_bounds: SizeBounds::default(),
        }
    }
}

/// One worker per available processing unit.
#[must_use]
pub fn default_workers() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

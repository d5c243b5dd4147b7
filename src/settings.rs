//! Fixed limits and defaults shared by the batch components.

use std::time::Duration;

/// Smallest document (in characters) handed to the extractor.
pub const MIN_FILE_SIZE: usize = 10;

/// Largest document (in characters) handed to the extractor.
pub const MAX_FILE_SIZE: usize = 20_000_000;

/// Pause between two consecutive URL fetches.
pub const DEFAULT_SLEEP: Duration = Duration::from_secs(2);

/// Fetch timeout applied by the default HTTP client.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Length of the random slug used for output file names.
pub const SLUG_LENGTH: usize = 6;

/// Name generation attempts before a directory is considered full.
pub const MAX_NAME_ATTEMPTS: usize = 10_000;

/// Main text shorter than this triggers the fallback extractors.
pub const MIN_EXTRACTED_SIZE: usize = 200;

/// User agent sent by the default fetcher.
pub const USER_AGENT: &str = concat!("rs-trafilatura-cli/", env!("CARGO_PKG_VERSION"));

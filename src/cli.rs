//! Command-line arguments and their mapping onto [`BatchConfig`].

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{default_workers, BatchConfig, InputSource, SingleInput};
use crate::error::{Error, Result};
use crate::options::{ExtractionOptions, OutputFormat};
use crate::settings::{DEFAULT_FETCH_TIMEOUT, DEFAULT_SLEEP};
use crate::writer::OutputTarget;

#[derive(Debug, Parser)]
#[command(name = "trafilatura")]
#[command(about = "Extract main text and metadata from web pages, in batches")]
#[command(version)]
pub struct Args {
    /// Fast (without fallback detection)
    #[arg(short, long)]
    pub fast: bool,

    /// Include text formatting (bold, italic, etc.)
    #[arg(long)]
    pub formatting: bool,

    /// Don't output any comments
    #[arg(long)]
    pub nocomments: bool,

    /// Don't output any table elements
    #[arg(long)]
    pub notables: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Txt)]
    pub output_format: OutputFormat,

    /// CSV output
    #[arg(long)]
    pub csv: bool,

    /// XML output
    #[arg(long)]
    pub xml: bool,

    /// XML TEI output
    #[arg(long)]
    pub xmltei: bool,

    /// Validate TEI output
    #[arg(long)]
    pub validate: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Name of input file with one URL per line
    #[arg(short, long, value_name = "FILE")]
    pub inputfile: Option<PathBuf>,

    /// URL of a feed (or of a page advertising one)
    #[arg(long, value_name = "URL")]
    pub feed: Option<String>,

    /// Read files from a directory
    #[arg(long, value_name = "DIR")]
    pub inputdir: Option<PathBuf>,

    /// Custom URL download, or source URL of the files in --inputdir
    #[arg(short = 'u', long = "URL", value_name = "URL")]
    pub url: Option<String>,

    /// Write results in a specified directory
    #[arg(short, long, value_name = "DIR")]
    pub outputdir: Option<PathBuf>,

    /// Print the URLs of a URL list or feed instead of downloading them
    #[arg(long)]
    pub list: bool,

    /// Seconds to wait between two URL downloads
    #[arg(long, env = "TRAFILATURA_SLEEP", default_value_t = DEFAULT_SLEEP.as_secs_f64())]
    pub sleep: f64,

    /// Seed for output file names
    #[arg(long, env = "TRAFILATURA_SEED", default_value_t = 0)]
    pub seed: u64,

    /// Worker threads for --inputdir (default: available parallelism)
    #[arg(long, value_name = "N")]
    pub parallel: Option<usize>,

    /// Download timeout in seconds
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT.as_secs())]
    pub timeout: u64,
}

impl Args {
    /// Effective output format. Precedence: xmltei > xml > csv > --output-format.
    #[must_use]
    pub fn format(&self) -> OutputFormat {
        if self.xmltei {
            OutputFormat::Xmltei
        } else if self.xml {
            OutputFormat::Xml
        } else if self.csv {
            OutputFormat::Csv
        } else {
            self.output_format
        }
    }

    /// Pick the input mode. Precedence: URL list > feed > directory > URL > stdin.
    #[must_use]
    pub fn input(&self) -> InputSource {
        if let Some(path) = &self.inputfile {
            InputSource::UrlList(path.clone())
        } else if let Some(feed) = &self.feed {
            InputSource::Feed(feed.clone())
        } else if let Some(root) = &self.inputdir {
            InputSource::Directory {
                root: root.clone(),
                source_url: self.url.clone(),
            }
        } else if let Some(url) = &self.url {
            InputSource::Single(SingleInput::Url(url.clone()))
        } else {
            InputSource::Single(SingleInput::Stdin)
        }
    }

    #[must_use]
    pub fn extraction_options(&self) -> ExtractionOptions {
        ExtractionOptions {
            fallback: !self.fast,
            include_comments: !self.nocomments,
            include_tables: !self.notables,
            include_formatting: self.formatting,
            output_format: self.format(),
            tei_validation: self.validate,
        }
    }

    /// Validate the arguments and build the run configuration.
    pub fn to_config(&self) -> Result<BatchConfig> {
        if !self.sleep.is_finite() || self.sleep < 0.0 {
            return Err(Error::Configuration(format!(
                "--sleep must be a non-negative number of seconds, got {}",
                self.sleep
            )));
        }
        if self.parallel == Some(0) {
            return Err(Error::Configuration("--parallel must be at least 1".to_string()));
        }
        if self.timeout == 0 {
            return Err(Error::Configuration("--timeout must be at least 1 second".to_string()));
        }

        let input = self.input();
        if self.list && !matches!(input, InputSource::UrlList(_) | InputSource::Feed(_)) {
            tracing::warn!("--list only applies to --inputfile and --feed, ignoring it");
        }
        if self.validate && self.format() != OutputFormat::Xmltei {
            tracing::warn!("--validate only applies to TEI output");
        }

        let mut config = BatchConfig::new(input);
        config.list_only = self.list && matches!(config.input, InputSource::UrlList(_) | InputSource::Feed(_));
        config.output = self
            .outputdir
            .clone()
            .map_or(OutputTarget::Stdout, OutputTarget::Directory);
        config.options = self.extraction_options();
        config.delay = Duration::from_secs_f64(self.sleep);
        config.seed = self.seed;
        config.workers = self.parallel.unwrap_or_else(default_workers);
        config.fetch_timeout = Duration::from_secs(self.timeout);
        Ok(config)
    }
}

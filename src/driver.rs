//! The batch driver: one resolver, one execution strategy, per-item isolation.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use rayon::iter::{ParallelBridge, ParallelIterator};

use crate::config::{BatchConfig, InputSource, SingleInput};
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::{Error, MaterializationError, Result};
use crate::extractor::{try_extract, Extractor, HtmlExtractor};
use crate::feeds::{FeedDiscovery, FeedFinder};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::resolve::{self, BatchItem, UrlList};
use crate::validate::validate_with;
use crate::writer::{OutputTarget, ResultWriter};

/// Requests a running batch to halt before its next item.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Item counts of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Items that entered the pipeline.
    pub attempted: usize,
    /// Results written.
    pub written: usize,
    /// Items dropped by a per-item failure.
    pub skipped: usize,
}

#[derive(Default)]
struct Tally {
    attempted: AtomicUsize,
    written: AtomicUsize,
    skipped: AtomicUsize,
}

impl Tally {
    fn report(&self) -> BatchReport {
        BatchReport {
            attempted: self.attempted.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

/// Runs a batch described by a [`BatchConfig`].
///
/// ```no_run
/// use rs_trafilatura_cli::{BatchConfig, BatchDriver, InputSource};
///
/// let config = BatchConfig::new(InputSource::Feed("https://example.org/feed".into()));
/// let report = BatchDriver::new(config)?.run()?;
/// println!("{} written", report.written);
/// # Ok::<(), rs_trafilatura_cli::Error>(())
/// ```
pub struct BatchDriver {
    config: BatchConfig,
    extractor: Arc<dyn Extractor>,
    fetcher: Arc<dyn Fetcher>,
    feed_finder: Option<Arc<dyn FeedFinder>>,
    writer: ResultWriter,
    sink: Arc<dyn DiagnosticSink>,
    stop: StopHandle,
}

impl BatchDriver {
    /// Driver with the built-in extractor, HTTP fetcher and feed discovery.
    pub fn new(config: BatchConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.fetch_timeout)?;
        let writer = ResultWriter::new(&config.output, config.options.output_format, config.seed);
        Ok(Self {
            config,
            extractor: Arc::new(HtmlExtractor),
            fetcher: Arc::new(fetcher),
            feed_finder: None,
            writer,
            sink: Arc::new(TracingSink),
            stop: StopHandle::default(),
        })
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Replace the fetcher. Feed discovery uses it too unless a finder is set.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    #[must_use]
    pub fn with_feed_finder(mut self, finder: Arc<dyn FeedFinder>) -> Self {
        self.feed_finder = Some(finder);
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Send stream output somewhere other than the process stdout.
    ///
    /// No effect when results go to a directory.
    #[must_use]
    pub fn with_stdout(mut self, stream: Box<dyn Write + Send>) -> Self {
        if self.config.output == OutputTarget::Stdout {
            self.writer = ResultWriter::to_stream(stream, self.config.options.output_format);
        }
        self
    }

    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    #[must_use]
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Run the batch, reading the process stdin when no other input is set.
    pub fn run(&self) -> Result<BatchReport> {
        self.run_with_stdin(io::stdin().lock())
    }

    /// Run the batch with an explicit input stream.
    ///
    /// Returns `Err` only for fatal faults: an unopenable or undecodable URL
    /// list, an unreachable explicit URL, undecodable stdin, or a worker pool
    /// that cannot be built. Everything else is reported to the sink.
    pub fn run_with_stdin(&self, stdin: impl Read) -> Result<BatchReport> {
        let tally = Tally::default();

        match &self.config.input {
            InputSource::UrlList(path) => {
                tracing::info!(path = %path.display(), "processing URL list");
                let urls = UrlList::open(path, Arc::clone(&self.sink))?;
                self.run_urls(urls, &tally)?;
            }
            InputSource::Feed(url) => {
                let finder = self.feed_finder();
                let urls = resolve::feed_urls(finder.as_ref(), url, self.sink.as_ref());
                self.run_urls(urls.into_iter().map(Ok), &tally)?;
            }
            InputSource::Directory { root, source_url } => {
                self.run_directory(root, source_url.as_deref(), &tally)?;
            }
            InputSource::Single(SingleInput::Url(url)) => {
                let html = self
                    .fetcher
                    .fetch_url(url)
                    .ok_or_else(|| MaterializationError::Fetch(url.clone()))?;
                tally.attempted.fetch_add(1, Ordering::Relaxed);
                self.finish_item(&BatchItem::Url(url.clone()), &html, Some(url), &tally);
            }
            InputSource::Single(SingleInput::Stdin) => {
                let html = resolve::read_document(stdin)?;
                tally.attempted.fetch_add(1, Ordering::Relaxed);
                self.finish_item(&BatchItem::Document(String::new()), &html, None, &tally);
            }
        }

        let report = tally.report();
        tracing::info!(
            attempted = report.attempted,
            written = report.written,
            skipped = report.skipped,
            "batch finished"
        );
        Ok(report)
    }

    fn feed_finder(&self) -> Arc<dyn FeedFinder> {
        self.feed_finder
            .clone()
            .unwrap_or_else(|| Arc::new(FeedDiscovery::new(Arc::clone(&self.fetcher))))
    }

    /// Sequential URL loop with a pause between consecutive URLs.
    fn run_urls(&self, urls: impl Iterator<Item = Result<String>>, tally: &Tally) -> Result<()> {
        let mut first = true;
        for url in urls {
            let url = url?;

            if self.config.list_only {
                if let Err(e) = self.writer.write_line(&url) {
                    self.sink.report(Diagnostic::from_error(&url, &e.into()));
                }
                continue;
            }

            if !first {
                thread::sleep(self.config.delay);
            }
            first = false;
            if self.stop.is_stopped() {
                tracing::warn!("stop requested, remaining URLs skipped");
                break;
            }

            self.process(BatchItem::Url(url), None, tally);
        }
        Ok(())
    }

    /// Directory batch on a bounded worker pool.
    fn run_directory(&self, root: &Path, source_url: Option<&str>, tally: &Tally) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|e| Error::Configuration(format!("cannot start worker pool: {e}")))?;
        tracing::info!(root = %root.display(), workers = self.config.workers, "processing directory");

        let files = resolve::walk_directory(root, Arc::clone(&self.sink));
        pool.install(|| {
            files.par_bridge().for_each(|path: PathBuf| {
                if self.stop.is_stopped() {
                    return;
                }
                self.process(BatchItem::Path(path), source_url, tally);
            });
        });
        Ok(())
    }

    /// Materialize one item, then validate, extract and write it.
    fn process(&self, item: BatchItem, source_url: Option<&str>, tally: &Tally) {
        tally.attempted.fetch_add(1, Ordering::Relaxed);

        let materialized = match &item {
            BatchItem::Url(url) => self
                .fetcher
                .fetch_url(url)
                .ok_or_else(|| MaterializationError::Fetch(url.clone())),
            BatchItem::Path(path) => resolve::read_file(path),
            BatchItem::Document(content) => Ok(content.clone()),
        };

        match materialized {
            Ok(html) => {
                let url = match &item {
                    BatchItem::Url(url) => Some(url.as_str()),
                    _ => source_url,
                };
                self.finish_item(&item, &html, url, tally);
            }
            Err(e) => {
                tally.skipped.fetch_add(1, Ordering::Relaxed);
                self.sink.report(Diagnostic::from_error(item.label(), &e.into()));
            }
        }
    }

    fn finish_item(&self, item: &BatchItem, html: &str, url: Option<&str>, tally: &Tally) {
        match self.pipeline(html, url) {
            Ok(path) => {
                tally.written.fetch_add(1, Ordering::Relaxed);
                if let Some(path) = path {
                    tracing::debug!(item = %item.label(), path = %path.display(), "item done");
                }
            }
            Err(e) => {
                tally.skipped.fetch_add(1, Ordering::Relaxed);
                self.sink.report(Diagnostic::from_error(item.label(), &e));
            }
        }
    }

    fn pipeline(&self, html: &str, url: Option<&str>) -> Result<Option<PathBuf>> {
        validate_with(Some(html), self.config.size_bounds).check()?;
        let text = try_extract(self.extractor.as_ref(), html, url, &self.config.options)?;
        Ok(self.writer.write(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{MemorySink, Severity};
    use crate::error::ExtractionError;
    use crate::options::ExtractionOptions;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Echo;

    impl Extractor for Echo {
        fn extract(&self, html: &str, _: Option<&str>, _: &ExtractionOptions) -> std::result::Result<String, ExtractionError> {
            Ok(html.to_string())
        }
    }

    struct Pages;

    impl Fetcher for Pages {
        fn fetch_url(&self, url: &str) -> Option<String> {
            (!url.contains("missing")).then(|| format!("<html><body>{url}</body></html>"))
        }
    }

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner).extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().expect("lock").clone()).expect("utf-8")
        }
    }

    fn driver(input: InputSource, out: &Buffer, sink: &Arc<MemorySink>) -> BatchDriver {
        let mut config = BatchConfig::new(input);
        config.delay = Duration::ZERO;
        BatchDriver::new(config)
            .expect("driver")
            .with_extractor(Arc::new(Echo))
            .with_fetcher(Arc::new(Pages))
            .with_sink(sink.clone())
            .with_stdout(Box::new(out.clone()))
    }

    #[test]
    fn test_stdin_document() {
        let out = Buffer::default();
        let sink = Arc::new(MemorySink::new());
        let report = driver(InputSource::Single(SingleInput::Stdin), &out, &sink)
            .run_with_stdin("<html>hello</html>".as_bytes())
            .expect("run");

        assert_eq!(report, BatchReport { attempted: 1, written: 1, skipped: 0 });
        assert_eq!(out.text(), "<html>hello</html>\n");
    }

    #[test]
    fn test_too_small_stdin_is_reported_not_fatal() {
        let out = Buffer::default();
        let sink = Arc::new(MemorySink::new());
        let report = driver(InputSource::Single(SingleInput::Stdin), &out, &sink)
            .run_with_stdin("<p>".as_bytes())
            .expect("run");

        assert_eq!(report.skipped, 1);
        assert!(out.text().is_empty());
        assert_eq!(sink.diagnostics()[0].kind, "too_small");
        assert_eq!(sink.count(Severity::Error), 1);
    }

    #[test]
    fn test_unreachable_url_is_fatal() {
        let out = Buffer::default();
        let sink = Arc::new(MemorySink::new());
        let err = driver(
            InputSource::Single(SingleInput::Url("https://missing.example/".into())),
            &out,
            &sink,
        )
        .run_with_stdin(io::empty())
        .expect_err("fatal");
        assert_eq!(err.to_string(), "no valid result for url: https://missing.example/");
    }

    #[test]
    fn test_feed_failures_do_not_stop_batch() {
        struct Listed;

        impl FeedFinder for Listed {
            fn find_feed_urls(&self, _: &str) -> Vec<String> {
                vec![
                    "https://a.example/1".into(),
                    "https://missing.example/2".into(),
                    "https://a.example/3".into(),
                ]
            }
        }

        let out = Buffer::default();
        let sink = Arc::new(MemorySink::new());
        let report = driver(InputSource::Feed("https://a.example/feed".into()), &out, &sink)
            .with_feed_finder(Arc::new(Listed))
            .run_with_stdin(io::empty())
            .expect("run");

        assert_eq!(report, BatchReport { attempted: 3, written: 2, skipped: 1 });
        assert_eq!(sink.count(Severity::Warning), 1);
        assert_eq!(sink.diagnostics()[0].kind, "fetch");
    }

    #[test]
    fn test_stop_before_next_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let list = dir.path().join("urls.txt");
        std::fs::write(&list, "https://a.example/1\nhttps://a.example/2\n").expect("write");

        let out = Buffer::default();
        let sink = Arc::new(MemorySink::new());
        let driver = driver(InputSource::UrlList(list), &out, &sink);
        driver.stop_handle().stop();
        let report = driver.run_with_stdin(io::empty()).expect("run");

        assert_eq!(report.attempted, 0);
        assert!(out.text().is_empty());
    }
}

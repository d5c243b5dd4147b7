use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rs_trafilatura_cli::{BatchConfig, BatchDriver, Fetcher, InputSource, MemorySink, Severity};

const FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0">
  <channel>
    <title>Example blog</title>
    <link>https://blog.example.org/</link>
    <description>Posts</description>
    <item><title>First</title><link>https://blog.example.org/first</link></item>
    <item><title>Elsewhere</title><link>https://other.example.com/post</link></item>
    <item><title>Second</title><link>/second</link></item>
  </channel>
</rss>"#;

const PAGE: &str = r#"<html><head><link rel="alternate" type="application/rss+xml" href="/feed.xml"></head>
<body><p>Blog home</p></body></html>"#;

struct Site(HashMap<&'static str, String>);

impl Site {
    fn new() -> Self {
        let article = |title: &str| {
            format!(
                "<html><head><title>{title}</title></head><body><article><p>{title} is a short post about feeds.</p></article></body></html>"
            )
        };
        Self(HashMap::from([
            ("https://blog.example.org/", PAGE.to_string()),
            ("https://blog.example.org/feed.xml", FEED.to_string()),
            ("https://blog.example.org/first", article("First")),
            ("https://blog.example.org/second", article("Second")),
        ]))
    }
}

impl Fetcher for Site {
    fn fetch_url(&self, url: &str) -> Option<String> {
        self.0.get(url).cloned()
    }
}

#[derive(Clone, Default)]
struct Buffer(Arc<Mutex<Vec<u8>>>);

impl Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Buffer {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()).expect("utf-8")
    }
}

fn feed_config(url: &str, list_only: bool) -> BatchConfig {
    let mut config = BatchConfig::new(InputSource::Feed(url.to_string()));
    config.delay = Duration::ZERO;
    config.list_only = list_only;
    config
}

#[test]
fn feed_list_mode_prints_same_domain_links() {
    let out = Buffer::default();
    BatchDriver::new(feed_config("https://blog.example.org/feed.xml", true))
        .expect("driver")
        .with_fetcher(Arc::new(Site::new()))
        .with_stdout(Box::new(out.clone()))
        .run_with_stdin(io::empty())
        .expect("run");

    assert_eq!(
        out.text(),
        "https://blog.example.org/first\nhttps://blog.example.org/second\n"
    );
}

#[test]
fn homepage_feed_is_discovered_and_processed() {
    let out = Buffer::default();
    let sink = Arc::new(MemorySink::new());
    let report = BatchDriver::new(feed_config("https://blog.example.org/", false))
        .expect("driver")
        .with_fetcher(Arc::new(Site::new()))
        .with_sink(sink.clone())
        .with_stdout(Box::new(out.clone()))
        .run_with_stdin(io::empty())
        .expect("run");

    assert_eq!(report.written, 2);
    let text = out.text();
    assert!(text.contains("First is a short post about feeds."));
    assert!(text.contains("Second is a short post about feeds."));
    assert!(text.find("First is").unwrap_or(usize::MAX) < text.find("Second is").unwrap_or(0));
    assert!(sink.diagnostics().is_empty());
}

#[test]
fn unusable_feed_is_a_warning() {
    let sink = Arc::new(MemorySink::new());
    let report = BatchDriver::new(feed_config("https://blog.example.org/missing", false))
        .expect("driver")
        .with_fetcher(Arc::new(Site::new()))
        .with_sink(sink.clone())
        .run_with_stdin(io::empty())
        .expect("run");

    assert_eq!(report.attempted, 0);
    assert_eq!(sink.count(Severity::Warning), 1);
    assert_eq!(sink.diagnostics()[0].kind, "feed");
}

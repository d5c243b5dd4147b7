//! Input resolvers: turn the configured input into a lazy stream of items.

use std::fs::File;
use std::io::{self, BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::encoding::decode_utf8;
use crate::error::{MaterializationError, Result};
use crate::feeds::FeedFinder;

/// Label used for the input stream in diagnostics.
pub const STDIN_LABEL: &str = "<stdin>";

/// One unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchItem {
    Url(String),
    Path(PathBuf),
    /// Content already in memory (the input stream).
    Document(String),
}

impl BatchItem {
    /// How the item is named in diagnostics.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Path(path) => path.display().to_string(),
            Self::Document(_) => STDIN_LABEL.to_string(),
        }
    }
}

/// URLs read line by line from a list.
///
/// Lines that do not start with `http` are reported and skipped. A line that
/// cannot be decoded ends the iteration with an error.
pub struct UrlList<R> {
    lines: io::Lines<R>,
    origin: String,
    sink: Arc<dyn DiagnosticSink>,
    failed: bool,
}

impl<R: BufRead> UrlList<R> {
    pub fn new(reader: R, origin: impl Into<String>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            lines: reader.lines(),
            origin: origin.into(),
            sink,
            failed: false,
        }
    }
}

impl UrlList<BufReader<File>> {
    /// Open a URL list file. Failing to open it is fatal.
    pub fn open(path: &Path, sink: Arc<dyn DiagnosticSink>) -> Result<Self> {
        let file = File::open(path).map_err(|source| MaterializationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file), path.display().to_string(), sink))
    }
}

impl<R: BufRead> Iterator for UrlList<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    self.failed = true;
                    let err = if e.kind() == ErrorKind::InvalidData {
                        MaterializationError::Decode(self.origin.clone())
                    } else {
                        MaterializationError::Read {
                            path: PathBuf::from(&self.origin),
                            source: e,
                        }
                    };
                    return Some(Err(err.into()));
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with("http") {
                return Some(Ok(line.to_string()));
            }
            self.sink
                .report(Diagnostic::warning("url_list", line, "not an URL, discarding line"));
        }
    }
}

/// URLs listed by a feed. An empty feed is reported as a warning.
pub fn feed_urls(finder: &dyn FeedFinder, url: &str, sink: &dyn DiagnosticSink) -> Vec<String> {
    let urls = finder.find_feed_urls(url);
    if urls.is_empty() {
        sink.report(Diagnostic::warning("feed", url, "no links found"));
    } else {
        tracing::info!(feed = %url, count = urls.len(), "feed resolved");
    }
    urls
}

/// Every regular file below `root`, lazily and in no particular order.
///
/// Symbolic links are followed. Unreadable entries and link loops are
/// reported and skipped.
pub fn walk_directory(root: &Path, sink: Arc<dyn DiagnosticSink>) -> impl Iterator<Item = PathBuf> + Send {
    WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(move |entry| match entry {
            Ok(entry) if entry.file_type().is_file() => Some(entry.into_path()),
            Ok(_) => None,
            Err(e) => {
                let item = e.path().map_or_else(String::new, |p| p.display().to_string());
                sink.report(Diagnostic::warning("walk", item, e.to_string()));
                None
            }
        })
}

/// Read one document from a stream. Undecodable input is fatal.
pub fn read_document(mut reader: impl Read) -> Result<String> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|source| MaterializationError::Read {
            path: PathBuf::from(STDIN_LABEL),
            source,
        })?;
    Ok(decode_utf8(bytes, STDIN_LABEL)?)
}

/// Read and decode one file.
pub fn read_file(path: &Path) -> std::result::Result<String, MaterializationError> {
    let bytes = std::fs::read(path).map_err(|source| MaterializationError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    decode_utf8(bytes, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{MemorySink, Severity};
    use crate::error::Error;
    use std::collections::HashSet;
    use std::io::Cursor;

    fn sink() -> Arc<MemorySink> {
        Arc::new(MemorySink::new())
    }

    #[test]
    fn test_url_list_keeps_http_lines_in_order() {
        let memory = sink();
        let input = "http://a.example/1\nskip-me\nhttp://a.example/2\n";
        let urls: Vec<String> = UrlList::new(Cursor::new(input), "urls.txt", memory.clone())
            .collect::<Result<_>>()
            .expect("decodable");

        assert_eq!(urls, vec!["http://a.example/1", "http://a.example/2"]);
        let diags = memory.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].item, "skip-me");
        assert_eq!(diags[0].severity, Severity::Warning);
    }

    #[test]
    fn test_url_list_trims_lines() {
        let urls: Vec<String> = UrlList::new(Cursor::new("  https://a.example/x \r\n\n"), "urls.txt", sink())
            .collect::<Result<_>>()
            .expect("decodable");
        assert_eq!(urls, vec!["https://a.example/x"]);
    }

    #[test]
    fn test_url_list_undecodable_is_fatal() {
        let bytes = b"http://a.example/1\n\xff\xfe\nhttp://a.example/2\n".to_vec();
        let mut list = UrlList::new(Cursor::new(bytes), "urls.txt", sink());

        assert_eq!(list.next().map(|r| r.ok()), Some(Some("http://a.example/1".to_string())));
        assert!(matches!(
            list.next(),
            Some(Err(Error::Materialization(MaterializationError::Decode(_))))
        ));
        assert!(list.next().is_none());
    }

    #[test]
    fn test_missing_url_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = UrlList::open(&dir.path().join("absent.txt"), sink());
        assert!(matches!(
            result,
            Err(Error::Materialization(MaterializationError::Read { .. }))
        ));
    }

    #[test]
    fn test_walk_directory_finds_nested_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("a/b")).expect("mkdir");
        std::fs::write(dir.path().join("top.html"), "x").expect("write");
        std::fs::write(dir.path().join("a/b/deep.html"), "y").expect("write");

        let found: HashSet<PathBuf> = walk_directory(dir.path(), sink()).collect();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&dir.path().join("a/b/deep.html")));
    }

    #[test]
    fn test_walk_missing_directory_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let memory = sink();
        let found: Vec<PathBuf> = walk_directory(&dir.path().join("absent"), memory.clone()).collect();
        assert!(found.is_empty());
        assert_eq!(memory.count(Severity::Warning), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_follows_symlinks_and_reports_loops() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().expect("tempdir");
        let outside = tempfile::tempdir().expect("tempdir");
        std::fs::write(outside.path().join("linked.html"), "x").expect("write");
        std::fs::create_dir(dir.path().join("sub")).expect("mkdir");
        symlink(outside.path().join("linked.html"), dir.path().join("link.html")).expect("file link");
        symlink(dir.path(), dir.path().join("sub/back")).expect("loop link");

        let memory = sink();
        let found: Vec<PathBuf> = walk_directory(dir.path(), memory.clone()).collect();

        assert_eq!(found, vec![dir.path().join("link.html")]);
        assert_eq!(memory.count(Severity::Warning), 1);
        assert_eq!(memory.diagnostics()[0].kind, "walk");
    }

    #[test]
    fn test_read_document() {
        assert_eq!(read_document(Cursor::new("<html></html>")).expect("utf-8"), "<html></html>");
        assert!(matches!(
            read_document(Cursor::new(vec![0xff, 0xfe, 0x00])),
            Err(Error::Materialization(MaterializationError::Decode(_)))
        ));
    }

    struct FixedFinder(Vec<String>);

    impl FeedFinder for FixedFinder {
        fn find_feed_urls(&self, _url: &str) -> Vec<String> {
            self.0.clone()
        }
    }

    #[test]
    fn test_feed_urls() {
        let memory = MemorySink::new();
        let finder = FixedFinder(vec!["https://example.org/a".into()]);
        assert_eq!(feed_urls(&finder, "https://example.org/feed", &memory).len(), 1);
        assert!(memory.diagnostics().is_empty());

        let empty = FixedFinder(Vec::new());
        assert!(feed_urls(&empty, "https://example.org/feed", &memory).is_empty());
        assert_eq!(memory.diagnostics()[0].kind, "feed");
    }

    #[test]
    fn test_item_labels() {
        assert_eq!(BatchItem::Url("https://x.example".into()).label(), "https://x.example");
        assert_eq!(BatchItem::Document(String::new()).label(), STDIN_LABEL);
    }
}

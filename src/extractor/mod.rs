//! Extraction engine boundary.
//!
//! The batch driver only ever talks to [`try_extract`], which turns every
//! failure of an [`Extractor`] (returned error or panic) into an
//! [`ExtractionError`].

pub mod content;
pub mod metadata;
pub mod output;

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};

use dom_query::Document;

use crate::error::{ExtractionError, ExtractionErrorKind};
use crate::options::ExtractionOptions;

pub use content::Block;
pub use metadata::Metadata;
pub use output::Extracted;

/// An extraction engine: raw HTML in, serialized text out.
pub trait Extractor: Send + Sync {
    fn extract(
        &self,
        html: &str,
        url: Option<&str>,
        options: &ExtractionOptions,
    ) -> Result<String, ExtractionError>;
}

thread_local! {
    static IN_EXTRACTOR: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as running an extractor until dropped.
struct ExtractorScope;

impl ExtractorScope {
    fn enter() -> Self {
        IN_EXTRACTOR.with(|flag| flag.set(true));
        Self
    }
}

impl Drop for ExtractorScope {
    fn drop(&mut self) {
        IN_EXTRACTOR.with(|flag| flag.set(false));
    }
}

fn inside_extractor() -> bool {
    IN_EXTRACTOR.with(Cell::get)
}

/// Install a panic hook that keeps extractor panics off stderr.
///
/// Panics raised inside [`try_extract`] are logged as one debug event, the
/// item diagnostic reports them. Any other panic goes to the previous hook.
pub fn install_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if inside_extractor() {
            let message = info.to_string().split_whitespace().collect::<Vec<_>>().join(" ");
            tracing::debug!(%message, "extractor panicked");
        } else {
            previous(info);
        }
    }));
}

/// Run one extraction, converting panics into errors. No retries.
pub fn try_extract(
    extractor: &dyn Extractor,
    html: &str,
    url: Option<&str>,
    options: &ExtractionOptions,
) -> Result<String, ExtractionError> {
    let _scope = ExtractorScope::enter();
    panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(html, url, options))).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "extractor panicked".to_string());
        Err(ExtractionError::new(ExtractionErrorKind::Panic, message))
    })
}

/// Built-in extractor based on `dom_query`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlExtractor;

impl Extractor for HtmlExtractor {
    fn extract(
        &self,
        html: &str,
        url: Option<&str>,
        options: &ExtractionOptions,
    ) -> Result<String, ExtractionError> {
        let doc = Document::from(html);
        let metadata = metadata::extract_metadata(&doc, url);
        let content::Content { mut body, comments } = content::extract_content(&doc, options);

        if body.is_empty() && comments.is_empty() {
            // Title-only pages still yield their title.
            let title = metadata.title.clone().ok_or_else(ExtractionError::no_content)?;
            body.push(Block::Paragraph(title));
        }

        output::serialize(
            &Extracted {
                metadata,
                body,
                comments,
            },
            options,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OutputFormat;

    struct Panicking;

    impl Extractor for Panicking {
        fn extract(&self, _: &str, _: Option<&str>, _: &ExtractionOptions) -> Result<String, ExtractionError> {
            panic!("engine exploded");
        }
    }

    struct Failing;

    impl Extractor for Failing {
        fn extract(&self, _: &str, _: Option<&str>, _: &ExtractionOptions) -> Result<String, ExtractionError> {
            Err(ExtractionError::new(ExtractionErrorKind::Parse, "broken markup"))
        }
    }

    #[test]
    fn test_panic_becomes_error() {
        let err = try_extract(&Panicking, "<html></html>", None, &ExtractionOptions::default())
            .expect_err("panic converted");
        assert_eq!(err.kind, ExtractionErrorKind::Panic);
        assert_eq!(err.message, "engine exploded");
    }

    #[test]
    fn test_extractor_scope_is_tracked_through_panics() {
        struct Observing(std::sync::atomic::AtomicBool);

        impl Extractor for Observing {
            fn extract(&self, _: &str, _: Option<&str>, _: &ExtractionOptions) -> Result<String, ExtractionError> {
                self.0.store(inside_extractor(), std::sync::atomic::Ordering::SeqCst);
                Ok(String::new())
            }
        }

        install_panic_hook();
        assert!(!inside_extractor());

        let observing = Observing(std::sync::atomic::AtomicBool::new(false));
        try_extract(&observing, "<html></html>", None, &ExtractionOptions::default()).expect("ok");
        assert!(observing.0.load(std::sync::atomic::Ordering::SeqCst));
        assert!(!inside_extractor());

        let err = try_extract(&Panicking, "<html></html>", None, &ExtractionOptions::default())
            .expect_err("panic converted");
        assert_eq!(err.kind, ExtractionErrorKind::Panic);
        assert!(!inside_extractor());
    }

    #[test]
    fn test_error_passes_through() {
        let err = try_extract(&Failing, "<html></html>", None, &ExtractionOptions::default())
            .expect_err("error kept");
        assert_eq!(err.kind, ExtractionErrorKind::Parse);
    }

    #[test]
    fn test_title_only_page() {
        let html = "<html><head><title>Test Title</title></head><body></body></html>";
        let text = try_extract(&HtmlExtractor, html, None, &ExtractionOptions::default()).expect("title");
        assert_eq!(text, "Test Title");
    }

    #[test]
    fn test_empty_page_has_no_content() {
        let html = "<html><head></head><body><script>x()</script></body></html>";
        let err = try_extract(&HtmlExtractor, html, None, &ExtractionOptions::default()).expect_err("nothing");
        assert_eq!(err.kind, ExtractionErrorKind::NoContent);
    }

    #[test]
    fn test_xml_carries_source_url() {
        let html = "<html><head><title>T</title></head><body><article><p>Body text here.</p></article></body></html>";
        let options = ExtractionOptions {
            output_format: OutputFormat::Xml,
            ..ExtractionOptions::default()
        };
        let xml = try_extract(&HtmlExtractor, html, Some("https://example.org/x"), &options).expect("xml");
        assert!(xml.contains(r#"source="https://example.org/x""#));
        assert!(xml.contains("<p>Body text here.</p>"));
    }

    #[test]
    fn test_notables_holds_with_fallback() {
        let rows: String = (0..40)
            .map(|i| format!("<tr><td>HIDDENCELL{i}</td><td>a cell long enough to outweigh the intro</td></tr>"))
            .collect();
        let html = format!(
            "<html><body><div id=\"content\"><p>Short intro paragraph.</p><table>{rows}</table></div></body></html>"
        );
        let options = ExtractionOptions {
            include_tables: false,
            include_comments: false,
            ..ExtractionOptions::default()
        };
        let text = try_extract(&HtmlExtractor, &html, None, &options).expect("text");
        assert!(text.contains("Short intro paragraph."));
        assert!(!text.contains("HIDDENCELL"));
    }

    #[test]
    fn test_formatting_keeps_literal_asterisks() {
        let html = "<html><body><article><p>Compute 5 * 3 and then 2 * 4 please, <b>thanks</b>.</p></article></body></html>";
        let options = ExtractionOptions {
            output_format: OutputFormat::Xml,
            include_formatting: true,
            fallback: false,
            ..ExtractionOptions::default()
        };
        let xml = try_extract(&HtmlExtractor, html, None, &options).expect("xml");
        assert!(xml.contains(r##"<p>Compute 5 * 3 and then 2 * 4 please, <hi rend="#b">thanks</hi>.</p>"##));

        let txt = try_extract(
            &HtmlExtractor,
            html,
            None,
            &ExtractionOptions {
                output_format: OutputFormat::Txt,
                ..options
            },
        )
        .expect("txt");
        assert_eq!(txt, "Compute 5 * 3 and then 2 * 4 please, **thanks**.");
    }
}

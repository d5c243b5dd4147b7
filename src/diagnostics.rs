//! Per-item diagnostics.
//!
//! Item failures never travel up the driver's control flow. They are turned
//! into a [`Diagnostic`] at the item boundary and handed to a
//! [`DiagnosticSink`].

use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::error::Error;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Input that was discarded or could not be materialized.
    Warning,
    /// A document that reached the pipeline but produced no result.
    Error,
}

/// One item-level problem, formatted on a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Machine-readable label, e.g. `too_small` or `decode`.
    pub kind: String,
    /// The URL, path or `<stdin>` the problem belongs to.
    pub item: String,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(kind: impl Into<String>, item: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind: kind.into(),
            item: item.into(),
            message: message.into(),
        }
    }

    /// Build a diagnostic from an item error.
    ///
    /// Materialization problems are warnings, the rest are errors.
    pub fn from_error(item: impl Into<String>, error: &Error) -> Self {
        let severity = match error {
            Error::Materialization(_) => Severity::Warning,
            _ => Severity::Error,
        };
        Self {
            severity,
            kind: error.kind().to_string(),
            item: item.into(),
            message: single_line(&error.to_string()),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        write!(
            f,
            "# {level}: kind={} item={:?} message={:?}",
            self.kind, self.item, self.message
        )
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Receiver of item diagnostics. Shared by all workers.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Emits diagnostics as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => tracing::warn!(
                kind = %diagnostic.kind,
                item = %diagnostic.item,
                "{}",
                diagnostic.message
            ),
            Severity::Error => tracing::error!(
                kind = %diagnostic.kind,
                item = %diagnostic.item,
                "{}",
                diagnostic.message
            ),
        }
    }
}

/// Keeps diagnostics in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of diagnostics with the given severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, diagnostic: Diagnostic) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MaterializationError, ValidationError};

    #[test]
    fn test_display_is_single_line() {
        let diag = Diagnostic::warning("url_list", "skip-me\nnext", "not an URL,\n discarding line");
        let line = diag.to_string();
        assert!(!line.contains('\n'));
        assert!(line.starts_with("# WARNING: kind=url_list"));
    }

    #[test]
    fn test_from_error_severity() {
        let err = Error::from(MaterializationError::Decode("a.html".into()));
        let diag = Diagnostic::from_error("a.html", &err);
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(diag.kind, "decode");

        let err = Error::from(ValidationError::TooSmall);
        let diag = Diagnostic::from_error("b.html", &err);
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.kind, "too_small");
        assert_eq!(diag.message, "file too small");
    }

    #[test]
    fn test_memory_sink_counts() {
        let sink = MemorySink::new();
        sink.report(Diagnostic::warning("a", "x", "m"));
        sink.report(Diagnostic::from_error("y", &Error::from(ValidationError::Empty)));

        assert_eq!(sink.diagnostics().len(), 2);
        assert_eq!(sink.count(Severity::Warning), 1);
        assert_eq!(sink.count(Severity::Error), 1);
    }
}

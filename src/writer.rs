//! Result persistence: standard output or one new file per result.

use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::OutputError;
use crate::naming::OutputNamer;
use crate::options::OutputFormat;

/// Where results go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// The shared standard output stream.
    Stdout,
    /// A directory receiving one uniquely named file per result.
    Directory(PathBuf),
}

/// Writes completed results. Safe to share between workers.
pub struct ResultWriter {
    sink: Sink,
    format: OutputFormat,
}

enum Sink {
    Stream(Mutex<Box<dyn Write + Send>>),
    Directory { dir: PathBuf, namer: OutputNamer },
}

impl ResultWriter {
    /// Build a writer for `target`, using the process stdout for streams.
    #[must_use]
    pub fn new(target: &OutputTarget, format: OutputFormat, seed: u64) -> Self {
        match target {
            OutputTarget::Stdout => Self::to_stream(Box::new(io::stdout()), format),
            OutputTarget::Directory(dir) => Self::to_directory(dir.clone(), OutputNamer::new(seed), format),
        }
    }

    /// Stream results into any writer (stdout in production, a buffer in tests).
    #[must_use]
    pub fn to_stream(stream: Box<dyn Write + Send>, format: OutputFormat) -> Self {
        Self {
            sink: Sink::Stream(Mutex::new(stream)),
            format,
        }
    }

    #[must_use]
    pub fn to_directory(dir: PathBuf, namer: OutputNamer, format: OutputFormat) -> Self {
        Self {
            sink: Sink::Directory { dir, namer },
            format,
        }
    }

    /// Persist one result.
    ///
    /// Returns the created file when writing into a directory.
    pub fn write(&self, result: &str) -> Result<Option<PathBuf>, OutputError> {
        match &self.sink {
            Sink::Stream(stream) => {
                let mut stream = stream.lock().unwrap_or_else(PoisonError::into_inner);
                writeln!(stream, "{result}")
                    .and_then(|()| stream.flush())
                    .map_err(|source| OutputError::Write {
                        target: "<stdout>".to_string(),
                        source,
                    })?;
                Ok(None)
            }
            Sink::Directory { dir, namer } => {
                ensure_dir(dir)?;
                let path = namer.next_name(dir, self.format)?;
                write_new_file(&path, result)?;
                tracing::debug!(path = %path.display(), "result written");
                Ok(Some(path))
            }
        }
    }

    /// Write a bare line to the stream, or to stdout for directory targets (list mode).
    pub fn write_line(&self, line: &str) -> Result<(), OutputError> {
        match &self.sink {
            Sink::Stream(_) => self.write(line).map(|_| ()),
            Sink::Directory { .. } => writeln!(io::stdout().lock(), "{line}").map_err(|source| {
                OutputError::Write {
                    target: "<stdout>".to_string(),
                    source,
                }
            }),
        }
    }
}

fn ensure_dir(dir: &Path) -> Result<(), OutputError> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|source| OutputError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

fn write_new_file(path: &Path, content: &str) -> Result<(), OutputError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|source| {
            if source.kind() == ErrorKind::AlreadyExists {
                OutputError::Collision(path.to_path_buf())
            } else {
                OutputError::Write {
                    target: path.display().to_string(),
                    source,
                }
            }
        })?;
    file.write_all(content.as_bytes())
        .map_err(|source| OutputError::Write {
            target: path.display().to_string(),
            source,
        })
}

//! Collision-free output file names.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::OutputError;
use crate::options::OutputFormat;
use crate::settings::{MAX_NAME_ATTEMPTS, SLUG_LENGTH};

/// Generates random `<slug><ext>` names inside an output directory.
///
/// The random source is seeded explicitly: the same seed and the same
/// sequence of requests yield the same names.
#[derive(Debug)]
pub struct OutputNamer {
    rng: Mutex<StdRng>,
    max_attempts: usize,
}

impl OutputNamer {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            max_attempts: MAX_NAME_ATTEMPTS,
        }
    }

    /// Override the number of names tried before giving up.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Pick a path in `dir` that does not exist yet.
    pub fn next_name(&self, dir: &Path, format: OutputFormat) -> Result<PathBuf, OutputError> {
        self.next_name_with(dir, format, Path::exists)
    }

    fn next_name_with(
        &self,
        dir: &Path,
        format: OutputFormat,
        exists: impl Fn(&Path) -> bool,
    ) -> Result<PathBuf, OutputError> {
        for _ in 0..self.max_attempts {
            let candidate = dir.join(format!("{}{}", self.slug(), format.extension()));
            if !exists(&candidate) {
                return Ok(candidate);
            }
            tracing::debug!(path = %candidate.display(), "output name taken, drawing again");
        }
        Err(OutputError::NamesExhausted {
            dir: dir.to_path_buf(),
            attempts: self.max_attempts,
        })
    }

    fn slug(&self) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        (0..SLUG_LENGTH)
            .map(|_| char::from(rng.sample(Alphanumeric)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs;

    fn names(seed: u64, formats: &[OutputFormat]) -> Vec<PathBuf> {
        let namer = OutputNamer::new(seed);
        formats
            .iter()
            .map(|f| namer.next_name_with(Path::new("out"), *f, |_| false))
            .collect::<Result<_, _>>()
            .unwrap_or_default()
    }

    #[test]
    fn test_name_shape() {
        let namer = OutputNamer::new(7);
        let path = namer
            .next_name_with(Path::new("out"), OutputFormat::Csv, |_| false)
            .expect("name");

        assert_eq!(path.parent(), Some(Path::new("out")));
        let file = path.file_name().and_then(|f| f.to_str()).expect("utf-8 name");
        let (slug, ext) = file.split_at(SLUG_LENGTH);
        assert_eq!(ext, ".csv");
        assert!(slug.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_extension_follows_format() {
        let got = names(1, &[OutputFormat::Txt, OutputFormat::Xml, OutputFormat::Xmltei, OutputFormat::Csv]);
        let exts: Vec<_> = got
            .iter()
            .map(|p| p.extension().and_then(|e| e.to_str()).unwrap_or_default().to_string())
            .collect();
        assert_eq!(exts, ["txt", "xml", "xml", "csv"]);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let formats = [OutputFormat::Txt, OutputFormat::Xml, OutputFormat::Txt, OutputFormat::Csv];
        assert_eq!(names(42, &formats), names(42, &formats));
        assert_ne!(names(42, &formats), names(43, &formats));
    }

    #[test]
    fn test_regenerates_on_simulated_collisions() {
        let namer = OutputNamer::new(3);
        let calls = Cell::new(0);
        let path = namer
            .next_name_with(Path::new("out"), OutputFormat::Txt, |_| {
                calls.set(calls.get() + 1);
                calls.get() <= 5
            })
            .expect("name after collisions");

        assert_eq!(calls.get(), 6);
        // The sixth draw of the same seed.
        let reference = OutputNamer::new(3);
        let mut expected = PathBuf::new();
        for _ in 0..6 {
            expected = reference
                .next_name_with(Path::new("out"), OutputFormat::Txt, |_| false)
                .expect("name");
        }
        assert_eq!(path, expected);
    }

    #[test]
    fn test_never_returns_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let shadow = OutputNamer::new(11);
        for _ in 0..20 {
            let taken = shadow.next_name(dir.path(), OutputFormat::Txt).expect("name");
            fs::write(&taken, "occupied").expect("write");
        }

        let namer = OutputNamer::new(11);
        let path = namer.next_name(dir.path(), OutputFormat::Txt).expect("free name");
        assert!(!path.exists());
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let namer = OutputNamer::new(0).with_max_attempts(4);
        let err = namer
            .next_name_with(Path::new("out"), OutputFormat::Txt, |_| true)
            .expect_err("every name taken");
        assert!(matches!(err, OutputError::NamesExhausted { attempts: 4, .. }));
    }
}

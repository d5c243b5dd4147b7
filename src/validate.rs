//! Size gate applied to every raw document before extraction.

use crate::error::ValidationError;
use crate::settings::{MAX_FILE_SIZE, MIN_FILE_SIZE};

/// Outcome of the size gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    /// No content at all.
    Empty,
    /// Longer than the upper bound.
    TooLarge,
    /// Shorter than the lower bound.
    TooSmall,
    /// Within bounds.
    Ok,
}

impl Validation {
    /// Convert to a `Result`, mapping every rejection to its error.
    pub fn check(self) -> Result<(), ValidationError> {
        match self {
            Self::Ok => Ok(()),
            Self::Empty => Err(ValidationError::Empty),
            Self::TooLarge => Err(ValidationError::TooLarge),
            Self::TooSmall => Err(ValidationError::TooSmall),
        }
    }
}

/// Inclusive length bounds, counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeBounds {
    pub min: usize,
    pub max: usize,
}

impl Default for SizeBounds {
    fn default() -> Self {
        Self {
            min: MIN_FILE_SIZE,
            max: MAX_FILE_SIZE,
        }
    }
}

/// Apply the default bounds.
#[must_use]
pub fn validate(content: Option<&str>) -> Validation {
    validate_with(content, SizeBounds::default())
}

/// Apply explicit bounds.
#[must_use]
pub fn validate_with(content: Option<&str>, bounds: SizeBounds) -> Validation {
    let Some(content) = content else {
        return Validation::Empty;
    };

    // Byte length bounds the char count from above, skip counting when possible.
    if content.len() < bounds.min {
        return Validation::TooSmall;
    }

    let length = content.chars().count();
    if length > bounds.max {
        Validation::TooLarge
    } else if length < bounds.min {
        Validation::TooSmall
    } else {
        Validation::Ok
    }
}

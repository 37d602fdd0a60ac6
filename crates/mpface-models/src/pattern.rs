//! Per-frame output filename patterns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Placeholders that are replaced by the frame index.
///
/// `{0}` is the positional form (`frame-{0}.json`); `{frame}` is the named form.
pub const FRAME_PLACEHOLDERS: [&str; 2] = ["{0}", "{frame}"];

/// Pattern parsing error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatternError {
    #[error("filename pattern is empty")]
    Empty,

    #[error("filename pattern '{0}' has no frame index placeholder ({{0}} or {{frame}})")]
    MissingPlaceholder(String),
}

/// A filename pattern containing a frame index placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilenamePattern(String);

impl FilenamePattern {
    /// Parse and validate a pattern.
    pub fn parse(pattern: impl Into<String>) -> Result<Self, PatternError> {
        let pattern = pattern.into();
        if pattern.trim().is_empty() {
            return Err(PatternError::Empty);
        }
        if !FRAME_PLACEHOLDERS.iter().any(|p| pattern.contains(p)) {
            return Err(PatternError::MissingPlaceholder(pattern));
        }
        Ok(Self(pattern))
    }

    /// Path for a frame index.
    pub fn render(&self, frame: u64) -> PathBuf {
        let index = frame.to_string();
        let mut path = self.0.clone();
        for placeholder in FRAME_PLACEHOLDERS {
            path = path.replace(placeholder, &index);
        }
        PathBuf::from(path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FilenamePattern {
    type Error = PatternError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<FilenamePattern> for String {
    fn from(p: FilenamePattern) -> Self {
        p.0
    }
}

impl fmt::Display for FilenamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

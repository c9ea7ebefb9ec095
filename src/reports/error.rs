//! Per-format generation errors

use serde::Serialize;
use std::fmt;
use std::io;
use std::path::Path;
use std::time::Duration;

/// What went wrong while producing an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationErrorKind {
    /// Filesystem failure while writing the artifact
    Io,
    /// The generator did not finish before the deadline
    Timeout,
    /// The output path cannot hold a file
    InvalidPath,
    UnsupportedFormat,
    /// Rendering the model failed
    Render,
    /// The generation request itself was invalid
    Validation,
}

impl fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationErrorKind::Io => "io",
            GenerationErrorKind::Timeout => "timeout",
            GenerationErrorKind::InvalidPath => "invalid-path",
            GenerationErrorKind::UnsupportedFormat => "unsupported-format",
            GenerationErrorKind::Render => "render",
            GenerationErrorKind::Validation => "validation",
        };
        f.write_str(name)
    }
}

/// A format-tagged generation failure
///
/// `transient` is decided once when the error is built; the retry loop only
/// reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("[{format}] {kind}: {message}")]
pub struct GenerationError {
    pub format: String,
    pub kind: GenerationErrorKind,
    pub message: String,
    pub transient: bool,
}

impl GenerationError {
    fn new(format: &str, kind: GenerationErrorKind, message: String, transient: bool) -> Self {
        Self {
            format: format.to_string(),
            kind,
            message,
            transient,
        }
    }

    /// Classify a filesystem error hit while writing `path`
    pub fn io(format: &str, path: &Path, err: &io::Error) -> Self {
        use io::ErrorKind as K;

        let transient = matches!(
            err.kind(),
            K::Interrupted | K::WouldBlock | K::TimedOut | K::ResourceBusy
        );
        let kind = match err.kind() {
            K::NotFound
            | K::AlreadyExists
            | K::NotADirectory
            | K::IsADirectory
            | K::InvalidFilename
            | K::InvalidInput => GenerationErrorKind::InvalidPath,
            _ => GenerationErrorKind::Io,
        };

        Self::new(
            format,
            kind,
            format!("failed to write {}: {err}", path.display()),
            transient,
        )
    }

    pub fn timeout(format: &str, after: Duration) -> Self {
        Self::new(
            format,
            GenerationErrorKind::Timeout,
            format!("generation did not finish within {}ms", after.as_millis()),
            true,
        )
    }

    pub fn unsupported(format: &str) -> Self {
        Self::new(
            format,
            GenerationErrorKind::UnsupportedFormat,
            format!("unsupported report format `{format}` (expected json, markdown or html)"),
            false,
        )
    }

    pub fn render(format: &str, message: impl Into<String>) -> Self {
        Self::new(format, GenerationErrorKind::Render, message.into(), false)
    }

    /// The request was rejected before any generator ran
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::new(field, GenerationErrorKind::Validation, message.into(), false)
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_classification() {
        let path = Path::new("out/report.json");

        let busy = GenerationError::io("json", path, &io::Error::from(io::ErrorKind::Interrupted));
        assert!(busy.is_transient());
        assert_eq!(busy.kind, GenerationErrorKind::Io);

        let denied = GenerationError::io("json", path, &io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(!denied.is_transient());

        let dir = GenerationError::io("html", path, &io::Error::from(io::ErrorKind::IsADirectory));
        assert_eq!(dir.kind, GenerationErrorKind::InvalidPath);
        assert!(!dir.is_transient());
    }

    #[test]
    fn test_display_names_format() {
        let err = GenerationError::unsupported("pdf");
        assert_eq!(err.format, "pdf");
        assert!(err.to_string().starts_with("[pdf] unsupported-format:"));
        assert!(!err.is_transient());
        assert!(GenerationError::timeout("json", Duration::from_millis(5)).is_transient());
    }
}

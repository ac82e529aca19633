//! The main Error type for trialscout

use crate::{ErrorKind, ErrorStatus};
use std::fmt;

/// The unified error type for all trialscout operations.
///
/// This error type provides:
/// - `kind`: What type of error occurred
/// - `message`: Human-readable description
/// - `status`: Whether the error is retryable
/// - `operation`: What operation caused the error
/// - `context`: Key-value pairs for debugging
/// - `source`: The underlying error (if any)
///
/// # Example
///
/// ```rust
/// use trialscout_error::{Error, ErrorKind, ErrorStatus};
///
/// let err = Error::new(ErrorKind::RateLimited, "provider returned 429")
///     .with_operation("agent::research")
///     .with_context("model", "openai/gpt-4o-mini")
///     .with_context("batch", "Close, PipeDrive");
///
/// assert_eq!(err.kind(), ErrorKind::RateLimited);
/// assert!(err.status().is_retryable());
/// ```
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: ErrorStatus,
    operation: &'static str,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let status = if kind.is_retryable() {
            ErrorStatus::Temporary
        } else {
            ErrorStatus::Permanent
        };

        Self {
            kind,
            message: message.into(),
            status,
            operation: "",
            context: Vec::new(),
            source: None,
        }
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the error status
    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    /// Get the operation that caused this error
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Get the context key-value pairs
    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    /// Look up the first context value recorded under `key`
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Get the source error (if any)
    pub fn source_ref(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }

    // =========================================================================
    // Builders (chainable)
    // =========================================================================

    /// Mark as permanent (not retryable)
    pub fn permanent(mut self) -> Self {
        self.status = ErrorStatus::Permanent;
        self
    }

    /// Set the operation that caused this error.
    ///
    /// If an operation was already set, the previous one is moved to context
    /// as "called" to preserve the call chain.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if !self.operation.is_empty() {
            self.context.push(("called", self.operation.to_string()));
        }
        self.operation = operation;
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Set the source error.
    ///
    /// # Panics (debug only)
    /// Panics in debug mode if source was already set.
    pub fn set_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "source error already set");
        self.source = Some(source.into());
        self
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        self.status.is_retryable()
    }
}

// =============================================================================
// Display - compact, single-line format for logs
// =============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) at {}", self.kind, self.status, self.operation)?;

        // raw replies can be long, keep them out of the one-line form
        let shown: Vec<_> = self.context.iter().filter(|(k, _)| *k != "raw").collect();
        if !shown.is_empty() {
            write!(f, ", context {{ ")?;
            for (i, (key, value)) in shown.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", key, value)?;
            }
            write!(f, " }}")?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        Ok(())
    }
}

// =============================================================================
// Debug - verbose, multi-line format for debugging
// =============================================================================

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({}) at {}", self.kind, self.status, self.operation)?;

        if !self.message.is_empty() {
            writeln!(f)?;
            writeln!(f, "    Message: {}", self.message)?;
        }

        if !self.context.is_empty() {
            writeln!(f)?;
            writeln!(f, "    Context:")?;
            for (key, value) in &self.context {
                writeln!(f, "        {}: {}", key, value)?;
            }
        }

        if let Some(source) = &self.source {
            writeln!(f)?;
            writeln!(f, "    Source: {:?}", source)?;
        }

        Ok(())
    }
}

// =============================================================================
// std::error::Error implementation
// =============================================================================

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// =============================================================================
// Convenient From implementations (be careful not to leak raw errors!)
// =============================================================================

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::IoFailed,
        };
        Error::new(kind, err.to_string())
            .with_operation("io")
            .set_source(err)
    }
}

// =============================================================================
// Convenience constructors
// =============================================================================

impl Error {
    /// Create an Unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }

    /// Create an InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Create a ConfigInvalid error naming the offending setting
    pub fn config_invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(
            ErrorKind::ConfigInvalid,
            format!("invalid value for {}: {}", key, reason.into()),
        )
        .with_context("key", key)
    }

    /// Create an InferenceFailed error
    pub fn inference_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InferenceFailed, message)
    }

    /// Create a SearchFailed error
    pub fn search_failed(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::SearchFailed, reason).with_context("query", query)
    }

    /// Create a ParseFailed error, keeping the unparsable text for diagnostics
    pub fn parse_failed(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseFailed, message).with_context("raw", raw)
    }

    /// Create a ShapeMismatch error
    pub fn shape_mismatch(expected: &str, found: &str, raw: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::ShapeMismatch,
            format!("expected {}, found {}", expected, found),
        )
        .with_context("raw", raw)
    }

    /// Create an ExportFailed error
    pub fn export_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExportFailed, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::new(ErrorKind::ExportFailed, "no records to export");
        assert_eq!(err.kind(), ErrorKind::ExportFailed);
        assert_eq!(err.message(), "no records to export");
        assert_eq!(err.status(), ErrorStatus::Permanent);
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::new(ErrorKind::InferenceFailed, "timeout")
            .with_operation("agent::research")
            .with_context("model", "openai/gpt-4o-mini")
            .with_context("step", "3");

        assert_eq!(err.operation(), "agent::research");
        assert_eq!(err.context().len(), 2);
        assert_eq!(err.context()[0], ("model", "openai/gpt-4o-mini".to_string()));
        assert_eq!(err.context_value("step"), Some("3"));
        assert_eq!(err.context_value("missing"), None);
    }

    #[test]
    fn test_operation_chaining() {
        let err = Error::new(ErrorKind::IoFailed, "write failed")
            .with_operation("export::write_csv")
            .with_operation("cli::scan");

        assert_eq!(err.operation(), "cli::scan");
        assert_eq!(err.context().len(), 1);
        assert_eq!(err.context()[0], ("called", "export::write_csv".to_string()));
    }

    #[test]
    fn test_temporary_status() {
        let err = Error::new(ErrorKind::RateLimited, "slow down");
        assert!(err.is_retryable());

        let err = Error::new(ErrorKind::ShapeMismatch, "object");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_permanent_overrides_kind() {
        let err = Error::new(ErrorKind::InferenceFailed, "400 bad request");
        assert!(err.is_retryable());

        let err = err.permanent();
        assert!(!err.is_retryable());
        assert_eq!(err.status(), ErrorStatus::Permanent);
    }

    #[test]
    fn test_display_hides_raw_reply() {
        let err = Error::parse_failed("expected value at line 1", "Sorry, I can't help")
            .with_operation("normalize::parse_records")
            .with_context("batch", "Close");

        let display = format!("{}", err);
        assert!(display.contains("ParseFailed"));
        assert!(display.contains("normalize::parse_records"));
        assert!(display.contains("batch: Close"));
        assert!(!display.contains("Sorry"));
        assert_eq!(err.context_value("raw"), Some("Sorry, I can't help"));
    }

    #[test]
    fn test_convenience_constructors() {
        let err = Error::config_invalid("TRIALSCOUT_BATCH_SIZE", "not a number");
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert!(err.message().contains("TRIALSCOUT_BATCH_SIZE"));

        let err = Error::shape_mismatch("array", "object", "{}");
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
        assert_eq!(err.message(), "expected array, found object");

        let err = Error::search_failed("avalara api", "401");
        assert_eq!(err.context_value("query"), Some("avalara api"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "names.txt");
        let err: Error = io_err.into();

        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert!(err.source_ref().is_some());
    }
}

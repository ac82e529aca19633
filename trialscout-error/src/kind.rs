//! Error kinds for trialscout operations

use std::fmt;

/// The kind of error that occurred.
///
/// The scanner decides what to do with a failed batch by looking at where the
/// error came from, but callers can match on the kind for finer reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// Invalid configuration value
    ConfigInvalid,

    /// Invalid argument passed to function
    InvalidArgument,

    // =========================================================================
    // Inference/LLM errors
    // =========================================================================
    /// LLM inference failed (provider error, empty reply)
    InferenceFailed,

    /// Provider not available
    ProviderUnavailable,

    /// Rate limit exceeded
    RateLimited,

    /// Provider rejected the credentials
    AuthenticationFailed,

    /// The agent kept requesting tools past its step cap
    ToolLoopExceeded,

    // =========================================================================
    // Search tool errors
    // =========================================================================
    /// Web search request failed
    SearchFailed,

    // =========================================================================
    // Reply shape errors
    // =========================================================================
    /// Reply was not valid JSON after fence-stripping
    ParseFailed,

    /// Reply was valid JSON but not the expected shape
    ShapeMismatch,

    /// Reply parsed, but did not cover every requested system
    Shortfall,

    // =========================================================================
    // IO / export errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    /// Network error
    NetworkFailed,

    /// Serialization/deserialization failed
    SerializationFailed,

    /// Spreadsheet export could not be produced
    ExportFailed,

    /// Operator prompt could not be read
    PromptFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::InvalidArgument => "InvalidArgument",

            // Inference
            ErrorKind::InferenceFailed => "InferenceFailed",
            ErrorKind::ProviderUnavailable => "ProviderUnavailable",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",
            ErrorKind::ToolLoopExceeded => "ToolLoopExceeded",

            // Search
            ErrorKind::SearchFailed => "SearchFailed",

            // Reply shape
            ErrorKind::ParseFailed => "ParseFailed",
            ErrorKind::ShapeMismatch => "ShapeMismatch",
            ErrorKind::Shortfall => "Shortfall",

            // IO / export
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",
            ErrorKind::NetworkFailed => "NetworkFailed",
            ErrorKind::SerializationFailed => "SerializationFailed",
            ErrorKind::ExportFailed => "ExportFailed",
            ErrorKind::PromptFailed => "PromptFailed",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::InferenceFailed
                | ErrorKind::NetworkFailed
                | ErrorKind::RateLimited
                | ErrorKind::ProviderUnavailable
                | ErrorKind::SearchFailed
        )
    }

    /// Errors raised by the agent call itself rather than by its reply.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ErrorKind::InferenceFailed
                | ErrorKind::ProviderUnavailable
                | ErrorKind::RateLimited
                | ErrorKind::AuthenticationFailed
                | ErrorKind::ToolLoopExceeded
                | ErrorKind::NetworkFailed
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/*!
 * Error types for the docshield application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions. Infrastructure code
 * (database, files, configuration) stays on `anyhow`; the types here are the ones
 * callers are expected to match on.
 */

use thiserror::Error;

/// Errors that can occur when talking to a translation service
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not complete in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The account has no translation quota left
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),
}

impl ProviderError {
    /// Whether another attempt may succeed without operator action
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::Timeout(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code == 429 || *status_code >= 500,
            Self::RequestFailed(_)
            | Self::ParseError(_)
            | Self::AuthenticationError(_)
            | Self::QuotaExceeded(_) => false,
        }
    }

    /// Whether the whole run must stop (bad credentials, exhausted quota)
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthenticationError(_) | Self::QuotaExceeded(_))
    }
}

/// Errors that can occur while reading or writing a PO catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Malformed catalog content
    #[error("Parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number in the catalog file
        line: usize,
        /// What went wrong
        message: String,
    },

    /// Underlying file error
    #[error("Catalog I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-segment outcomes that are reported instead of aborting a document.
///
/// Only `FatalServiceFailure` and `Interrupted` stop a run; everything else is
/// collected into the run summary.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    /// Unterminated or ambiguous construct in the source text
    #[error("Malformed markup in {segment}: {detail}")]
    MalformedMarkup {
        /// Segment identity (`file:line#ordinal`)
        segment: String,
        /// Offending construct
        detail: String,
    },

    /// A placeholder was missing from the translated text and had to be re-inserted
    #[error("Restoration failure in {segment}: {detail}")]
    RestorationFailure {
        /// Segment identity
        segment: String,
        /// Which placeholders were re-inserted and where
        detail: String,
    },

    /// Transient failures exhausted the retry budget
    #[error("Translation service unavailable after {attempts} attempt(s): {source}")]
    TransientServiceFailure {
        /// Number of attempts made
        attempts: u32,
        /// Last error returned by the service
        source: ProviderError,
    },

    /// The service rejected a single segment (not retryable, not fatal)
    #[error("Translation service rejected the segment: {0}")]
    ServiceRejected(ProviderError),

    /// Credentials or quota problem: the run cannot continue
    #[error("Fatal translation service failure: {0}")]
    FatalServiceFailure(ProviderError),

    /// The translation memory could not be read or written
    #[error("Translation cache I/O failure: {0}")]
    CacheIOFailure(String),

    /// A catalog could not be read or written; the document is skipped
    #[error("Catalog failure: {0}")]
    CatalogFailure(String),

    /// The run was interrupted between segments
    #[error("Run interrupted")]
    Interrupted,
}

impl PipelineError {
    /// Whether this error aborts the run rather than a single segment
    pub fn aborts_run(&self) -> bool {
        matches!(self, Self::FatalServiceFailure(_) | Self::Interrupted)
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from catalog handling
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Error from the translation pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

/*!
 * Error types for the papertrans application.
 *
 * This module contains custom error types for the different stages of a run,
 * using the thiserror crate for ergonomic error definitions:
 * - `ProviderError`: failures talking to a text-transformation service
 * - `TranslationError`: per-chunk translation failures (retried, then degraded)
 * - `FetchError`: setup failures while retrieving a paper (fatal for the run)
 * - `CompileError`: failures of the compilation stage (fatal for the artifact)
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
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

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Classify a non-success HTTP status returned by a provider
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors that can occur while translating a single chunk
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The response was not the expected structured object
    #[error("Malformed translation response: {0}")]
    MalformedResponse(String),

    /// The response had a different number of lines than the chunk
    #[error("Line count mismatch: expected {expected} lines, got {actual}")]
    LineCountMismatch {
        /// Lines in the source chunk
        expected: usize,
        /// Lines returned by the service
        actual: usize,
    },

    /// A returned line contains a line break the source line did not have
    #[error("Line break inserted into line {line}")]
    LineBreakInserted {
        /// Zero-based line position within the chunk
        line: usize,
    },

    /// A returned line changes the brace balance of its source line
    #[error("Brace balance changed on line {line}: expected {expected}, got {actual}")]
    BraceImbalance {
        /// Zero-based line position within the chunk
        line: usize,
        /// Net brace depth of the source line
        expected: i64,
        /// Net brace depth of the returned line
        actual: i64,
    },

    /// All attempts for a chunk failed
    #[error("Translation failed after {attempts} attempt(s): {last_error}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// The error of the final attempt
        last_error: Box<TranslationError>,
    },
}

impl TranslationError {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(ProviderError::AuthenticationError(_)) => false,
            Self::RetriesExhausted { .. } => false,
            _ => true,
        }
    }
}

/// Errors raised when chunks cannot be put back together into a document
#[derive(Error, Debug, PartialEq)]
pub enum ReassemblyError {
    /// A chunk index in the sequence has no chunk
    #[error("Chunk {index} is missing")]
    MissingChunk {
        /// Expected chunk index
        index: usize,
    },

    /// Two chunks claim the same index
    #[error("Chunk {index} appears more than once")]
    DuplicateChunk {
        /// Repeated chunk index
        index: usize,
    },

    /// A chunk belongs to another document
    #[error("Chunk {index} belongs to {found}, not {expected}")]
    ForeignChunk {
        /// Chunk index
        index: usize,
        /// Document being reassembled
        expected: String,
        /// Document the chunk came from
        found: String,
    },

    /// Replacement lines do not match the chunk's line count
    #[error("Chunk {index} must keep {expected} lines, got {actual}")]
    LineCountChanged {
        /// Chunk index
        index: usize,
        /// Lines in the chunk
        expected: usize,
        /// Lines offered as replacement
        actual: usize,
    },
}

/// Errors that can occur while retrieving a paper (setup stage)
#[derive(Error, Debug)]
pub enum FetchError {
    /// The server answered with a non-success status
    #[error("HTTP {status} while fetching {url}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// The request could not be completed
    #[error("Request failed: {0}")]
    Request(String),

    /// The metadata feed had no entry for the identifier
    #[error("arXiv entry not found for {0}")]
    EntryNotFound(String),

    /// The metadata feed lacks a required field
    #[error("Metadata feed is missing {0}")]
    MissingField(String),

    /// The input could not be interpreted as a paper identifier
    #[error("Invalid arXiv identifier: {0}")]
    InvalidIdentifier(String),

    /// Local file system failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The downloaded archive could not be unpacked
    #[error("Archive extraction failed: {0}")]
    Extraction(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error.to_string())
    }
}

/// Errors that can occur while compiling the translated paper
#[derive(Error, Debug)]
pub enum CompileError {
    /// No `.tex` file exists in the extracted tree
    #[error("Main .tex file not found in {0}")]
    MainFileNotFound(PathBuf),

    /// The compiler binary could not be started
    #[error("Failed to launch {compiler}: {message}")]
    Launch {
        /// Compiler binary
        compiler: String,
        /// Underlying failure
        message: String,
    },

    /// A compiler pass exceeded the configured timeout
    #[error("Compiler pass timed out after {0} seconds")]
    Timeout(u64),

    /// The final pass exited unsuccessfully
    #[error("Compiler exited with status {code:?}")]
    ExitStatus {
        /// Exit code if the process was not killed by a signal
        code: Option<i32>,
    },

    /// The expected output document was not produced
    #[error("Expected output not found: {0}")]
    OutputMissing(PathBuf),

    /// Local file system failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
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

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error while retrieving the paper
    #[error("Setup error: {0}")]
    Fetch(#[from] FetchError),

    /// Error while compiling the paper
    #[error("Compilation error: {0}")]
    Compile(#[from] CompileError),

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

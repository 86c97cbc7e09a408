/*!
 * Error types for the docbabel library.
 *
 * Document-level failures are `PipelineError` values and abort the run for
 * that document. Element-level translation failures never surface here: they
 * are recorded as `Degradation` entries in a stage report instead.
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

/// Errors returned by a `Translator`
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The collaborator answered with nothing usable
    #[error("Empty translation returned for {0} characters of input")]
    EmptyResponse(usize),

    /// Simulated or injected failure
    #[error("Translation rejected: {0}")]
    Rejected(String),
}

/// Document-level pipeline failures
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The source file extension is not one the extractor understands
    #[error("Unsupported document format: {0:?}")]
    UnsupportedFormat(PathBuf),

    /// Missing, unreadable or corrupt source document
    #[error("Failed to read source document {path:?}: {reason}")]
    SourceReadError {
        /// Source path
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// A stage was asked to run on an artifact absent from the store
    #[error("Input artifact '{stage}' missing for session {session}")]
    StageInputMissing {
        /// Session identifier
        session: String,
        /// Stage whose output was expected
        stage: String,
    },

    /// A block without a position, or two blocks sharing one
    #[error("Position invariant violated: {0}")]
    MissingPositionInvariant(String),

    /// A persisted or handed-over model failed validation
    #[error("Invalid document artifact: {0}")]
    InvalidArtifact(String),

    /// Artifact store failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Failure writing the output document
    #[error("Failed to write output document {path:?}: {reason}")]
    WriteError {
        /// Output path
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// The run was cancelled before completion
    #[error("Pipeline run cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Build a `SourceReadError` from anything displayable
    pub fn source_read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SourceReadError {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a `WriteError` from anything displayable
    pub fn write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::WriteError {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the failure stems from a violated model contract rather than I/O
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::MissingPositionInvariant(_) | Self::InvalidArtifact(_) | Self::StageInputMissing { .. }
        )
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidArtifact(error.to_string())
    }
}

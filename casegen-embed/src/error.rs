//! Error types for the embedding system

/// Result type for embedding operations.
///
/// Convenience alias using [`EmbedError`] as the error type.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type for all embedding operations.
///
/// Covers configuration problems, transport failures when talking to a remote
/// provider, and malformed provider responses. Provider failures are never
/// retried here; they propagate to the caller, which decides whether to retry.
///
/// # Error Categories
///
/// - **Configuration Errors**: invalid settings or a missing API key
/// - **Provider Errors**: the remote service answered with a failure status
/// - **Transport Errors**: the HTTP request itself failed
/// - **Response Errors**: the provider answered with an unusable payload
/// - **External Errors**: failures from local model runtimes
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// Error when provider configuration is invalid
    #[error("Invalid embedding configuration: {message}")]
    InvalidConfig { message: String },

    /// The environment variable holding the provider API key is unset or empty
    #[error("Embedding API key not found in environment variable {var}")]
    MissingApiKey { var: String },

    /// The provider answered with a non-success status
    #[error("Embedding provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    /// HTTP transport failure
    #[error("HTTP error: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    /// The provider response could not be mapped onto the request
    #[error("Unexpected provider response: expected {expected} embeddings, got {found}")]
    UnexpectedResponse { expected: usize, found: usize },

    /// Async task join errors
    #[error("Async task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },

    /// Generic errors from other libraries
    #[error("External error: {source}")]
    External {
        #[from]
        source: anyhow::Error,
    },
}

impl EmbedError {
    /// Create an invalid configuration error with a custom message.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    ///
    /// The core never retries on its own; callers that wrap ingestion or
    /// retrieval in a retry loop can use this to decide.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Provider { status, .. } => *status == 429 || *status >= 500,
            Self::Http { source } => source.is_timeout() || source.is_connect(),
            _ => false,
        }
    }
}

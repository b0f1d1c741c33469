use std::error::Error as StdError;

/// Crate-wide result type for chat platform operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed platform errors shared by every `ChatPlatform` implementation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The platform answered but rejected the call.
    #[error("{operation} rejected by platform: {code}")]
    Api { operation: String, code: String },

    /// The platform asked us to slow down.
    #[error("{operation} rate limited (retry after {retry_after_secs}s)")]
    RateLimited {
        operation: String,
        retry_after_secs: u64,
    },

    /// Operation is currently unavailable (not configured/ready).
    #[error("channel operation unavailable: {message}")]
    Unavailable { message: String },

    /// Wrapped source error from an external dependency.
    #[error("channel operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// JSON (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn api(operation: impl Into<String>, code: impl Into<String>) -> Self {
        Self::Api {
            operation: operation.into(),
            code: code.into(),
        }
    }

    #[must_use]
    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

//! Error types for environment operations.
//!
//! Two layers are distinguished:
//!
//! - [`ServiceError`] is what a [`Backend`](crate::backend::Backend) returns
//!   when a remote call fails.
//! - [`Error`] is what the lifecycle operations (`load`, `update`, `wait`)
//!   return; it wraps the service error with the operation that produced it.
//!
//! Both are categorized so callers can decide on retries. Nothing in this
//! crate retries on its own.

use std::fmt;

/// Result type alias for environment operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for backend calls.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Categories of errors for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transport failure, server error or throttling (transient, retryable).
    Network,
    /// The service rejected the request.
    Service,
    /// The service answered with something we could not understand.
    Format,
    /// Detected locally, no remote call involved.
    Local,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::Service => "Request rejected by the deployment service",
            Self::Format => "Unexpected response from the deployment service",
            Self::Local => "Invalid operation",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check the gateway endpoint and try again",
            Self::Service => "Verify the application and environment names and the requested values",
            Self::Format => "Check that the endpoint speaks the expected API",
            Self::Local => "Check the command arguments",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors returned by a backend call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// The service returned an error response.
    #[error("{code}: {message}")]
    Api {
        /// Service error code (e.g. `InvalidParameterValue`).
        code: String,
        /// Error message.
        message: String,
    },

    /// Response could not be decoded.
    #[error("invalid service response: {0}")]
    InvalidResponse(String),
}

impl ServiceError {
    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Create a service error response.
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Get the error category for retry logic.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Http { status, .. } => match status {
                Some(code) if *code == 429 || *code >= 500 => ErrorCategory::Network,
                Some(_) => ErrorCategory::Service,
                None => ErrorCategory::Network,
            },
            Self::Api { code, .. } => {
                if code.starts_with("Throttl") {
                    ErrorCategory::Network
                } else {
                    ErrorCategory::Service
                }
            }
            Self::InvalidResponse(_) => ErrorCategory::Format,
        }
    }
}

impl From<ureq::Error> for ServiceError {
    fn from(err: ureq::Error) -> Self {
        // Statuses never arrive here: the gateway agent reads error bodies itself.
        Self::Http {
            message: err.to_string(),
            status: None,
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

/// Which of the two reads of a load failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTarget {
    /// The configuration settings read.
    Configuration,
    /// The environment descriptor read.
    Environment,
}

impl fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration settings"),
            Self::Environment => write!(f, "environment"),
        }
    }
}

/// Errors returned by the environment lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// One of the read operations failed.
    #[error("failed to describe {target}: {source}")]
    Fetch {
        /// The read that failed.
        target: FetchTarget,
        /// Underlying service error.
        #[source]
        source: ServiceError,
    },

    /// Update requested with no field changes and no variable overlay.
    #[error("nothing to update for environment {environment}")]
    NothingToUpdate {
        /// Environment name.
        environment: String,
    },

    /// The update call was rejected or failed.
    #[error("failed to update environment {environment}: {source}")]
    Mutate {
        /// Environment name.
        environment: String,
        /// Underlying service error.
        #[source]
        source: ServiceError,
    },

    /// Wait requested without a prior successful update.
    #[error("no update performed on environment {environment}")]
    NoPendingUpdate {
        /// Environment name.
        environment: String,
    },

    /// The event feed returned an error while watching an update.
    #[error("failed to poll events for request {request_id}: {source}")]
    Poll {
        /// Request being watched.
        request_id: String,
        /// Underlying service error.
        #[source]
        source: ServiceError,
    },
}

impl Error {
    /// Get the error category for retry logic.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Fetch { source, .. }
            | Error::Mutate { source, .. }
            | Error::Poll { source, .. } => source.category(),
            Error::NothingToUpdate { .. } | Error::NoPendingUpdate { .. } => ErrorCategory::Local,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// The service error behind this error, if a remote call was involved.
    #[must_use]
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            Error::Fetch { source, .. }
            | Error::Mutate { source, .. }
            | Error::Poll { source, .. } => Some(source),
            Error::NothingToUpdate { .. } | Error::NoPendingUpdate { .. } => None,
        }
    }
}

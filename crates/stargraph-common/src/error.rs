//! Error types and utilities for stargraph

use thiserror::Error;

/// Result type alias for stargraph operations
pub type Result<T> = std::result::Result<T, StarGraphError>;

/// Main error type for stargraph operations
#[derive(Error, Debug)]
pub enum StarGraphError {
    /// Any failure talking to the remote data source (network, auth, rate limit)
    #[error("Remote fetch error: {message}")]
    RemoteFetch {
        message: String,
        status_code: Option<u16>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Chart rendering failures
    #[error("Render error: {message}")]
    Render {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Work aborted by fail-fast cancellation or by the caller
    #[error("Cancelled: {message}")]
    Cancelled { message: String },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation errors for user input or data
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Generic error with custom message
    #[error("{message}")]
    Generic {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StarGraphError {
    /// Create a new generic error with a custom message
    pub fn new(msg: impl Into<String>) -> Self {
        Self::Generic {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new generic error with a custom message and source
    pub fn with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Generic {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new remote fetch error
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::RemoteFetch {
            message: msg.into(),
            status_code: None,
            source: None,
        }
    }

    /// Create a new remote fetch error carrying the upstream HTTP status
    pub fn remote_with_status(msg: impl Into<String>, status: u16) -> Self {
        Self::RemoteFetch {
            message: msg.into(),
            status_code: Some(status),
            source: None,
        }
    }

    /// Create a new remote fetch error with source
    pub fn remote_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::RemoteFetch {
            message: msg.into(),
            status_code: None,
            source: Some(Box::new(source)),
        }
    }

    /// Create a new render error
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new render error with source
    pub fn render_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Render {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled {
            message: msg.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new configuration error with source
    pub fn config_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: None,
        }
    }

    /// Create a new validation error with field name
    pub fn validation_field(msg: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Whether this error is a cancellation rather than a real failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Upstream HTTP status, when the remote source reported one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::RemoteFetch { status_code, .. } => *status_code,
            _ => None,
        }
    }

    /// Transient upstream failures (5xx, timeouts, connection errors).
    /// 4xx responses, rate limiting included, are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RemoteFetch { status_code: Some(status), .. } => *status >= 500,
            Self::RemoteFetch { status_code: None, source, .. } => source.is_some(),
            _ => false,
        }
    }
}

// Error conversion implementations for external types

/// Convert from reqwest::Error to StarGraphError
impl From<reqwest::Error> for StarGraphError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::remote_with_source("Request timeout", err)
        } else if err.is_connect() {
            Self::remote_with_source("Connection failed", err)
        } else if err.is_status() {
            let status_code = err.status().map(|s| s.as_u16()).unwrap_or(0);
            Self::RemoteFetch {
                message: format!("HTTP error: {}", status_code),
                status_code: Some(status_code),
                source: Some(Box::new(err)),
            }
        } else {
            Self::remote_with_source("Network request failed", err)
        }
    }
}

#[cfg(feature = "plotters")]
/// Convert from plotters drawing errors to StarGraphError
impl<T> From<plotters::drawing::DrawingAreaErrorKind<T>> for StarGraphError
where
    T: std::error::Error + Send + Sync + 'static,
{
    fn from(err: plotters::drawing::DrawingAreaErrorKind<T>) -> Self {
        Self::render_with_source("Chart rendering failed", err)
    }
}

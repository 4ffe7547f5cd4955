//! Common types, errors, logging and the GitHub client for stargraph

pub mod error;
pub mod github;
pub mod logging;
pub mod source;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

// Re-export commonly used types
pub use error::{Result, StarGraphError};
pub use github::{GitHubClient, GitHubConfig, DEFAULT_API_URL, STAR_MEDIA_TYPE};
pub use logging::{init_default_logging, init_logging, LoggingConfig};
pub use source::RemoteSource;
pub use types::*;

//! Application configuration structures

use crate::validation::{validate_hex_color, validate_log_level};
use serde::{Deserialize, Serialize};
use stargraph_common::{GitHubConfig, LoggingConfig, DEFAULT_API_URL};
use std::time::Duration;
use validator::{Validate, ValidationErrors};

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    /// HTTP listener
    #[validate]
    pub server: ServerSettings,

    /// GitHub API access
    #[validate]
    pub github: GitHubSettings,

    /// Page and response caches
    #[validate]
    pub cache: CacheSettings,

    /// Concurrency of page and repository fan-out
    #[validate]
    pub fan_out: FanOutSettings,

    /// Chart rendering
    #[validate]
    pub graph: GraphSettings,

    /// Logging
    #[validate]
    pub logging: LoggingSettings,
}

/// HTTP listener configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerSettings {
    /// Interface to bind; empty binds all interfaces
    pub host: String,

    /// Port to listen on
    #[validate(range(min = 1, message = "Port must be greater than 0"))]
    pub port: u16,
}

/// GitHub API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GitHubSettings {
    /// API base URL, override for GitHub Enterprise
    #[validate(url(message = "GitHub API URL must be a valid URL"))]
    pub base_url: String,

    /// Access token; requests are anonymous when absent
    pub token: Option<String>,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub timeout_seconds: u64,

    /// Retries for 5xx responses and timeouts
    #[validate(range(max = 10, message = "Max retries cannot exceed 10"))]
    pub max_retries: u32,

    /// Client-side request rate limit
    #[validate(range(min = 1, max = 1000, message = "Rate limit must be between 1 and 1000"))]
    pub rate_limit_per_sec: u32,

    /// Items requested per page
    #[validate(range(min = 1, max = 100, message = "Page size must be between 1 and 100"))]
    pub per_page: u32,

    /// User-Agent sent with every request
    #[validate(length(min = 1, message = "User agent cannot be empty"))]
    pub user_agent: String,
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CacheSettings {
    /// Total cost budget of the page cache
    #[validate(range(min = 1, message = "Cache budget must be greater than 0"))]
    pub max_cost: u64,

    /// Lifetime of cached pages in hours
    #[validate(range(min = 1, max = 720, message = "TTL must be between 1 and 720 hours"))]
    pub ttl_hours: u64,

    /// Whether pages and responses are retained at all
    pub enabled: bool,

    /// Lifetime of cached rendered charts, also sent as `max-age`
    #[validate(range(min = 1, message = "Response TTL must be greater than 0"))]
    pub response_ttl_seconds: u64,
}

/// Fan-out configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FanOutSettings {
    /// Upper bound on concurrent units per fan-out; unbounded when absent
    #[validate(range(min = 1, max = 1024, message = "Max concurrency must be between 1 and 1024"))]
    pub max_concurrency: Option<usize>,
}

/// Chart rendering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GraphSettings {
    /// Chart width in pixels
    #[validate(range(min = 100, max = 4000, message = "Width must be between 100 and 4000 pixels"))]
    pub width: u32,

    /// Chart height in pixels
    #[validate(range(min = 100, max = 4000, message = "Height must be between 100 and 4000 pixels"))]
    pub height: u32,

    /// Line series color (hex format)
    pub line_color: String,

    /// Axis color (hex format)
    pub axis_color: String,

    /// Stroke width of the line series and axes
    #[validate(range(min = 1, max = 20, message = "Line width must be between 1 and 20"))]
    pub line_width: u32,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level or `EnvFilter` directive
    pub level: String,

    /// One JSON object per line
    pub json: bool,

    /// Optional log file path
    pub file: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 5000,
        }
    }
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout_seconds: 30,
            max_retries: 3,
            rate_limit_per_sec: 10,
            per_page: 100,
            user_agent: concat!("stargraph/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_cost: 150_000_000,
            ttl_hours: 48,
            enabled: true,
            response_ttl_seconds: 86_400,
        }
    }
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 400,
            line_color: "#81C7EF".to_string(),
            axis_color: "#555555".to_string(),
            line_width: 2,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl Config {
    /// Comprehensive validation of the entire configuration
    pub fn validate_all(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        if let Err(err) = validate_hex_color(&self.graph.line_color) {
            errors.add("graph.line_color", err);
        }
        if let Err(err) = validate_hex_color(&self.graph.axis_color) {
            errors.add("graph.axis_color", err);
        }
        if let Err(err) = validate_log_level(&self.logging.level) {
            errors.add("logging.level", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Socket address string to bind; an empty host binds all interfaces
    pub fn listen_addr(&self) -> String {
        let host = self.server.host.trim();
        let host = if host.is_empty() { "0.0.0.0" } else { host };
        format!("{}:{}", host, self.server.port)
    }
}

impl GitHubSettings {
    /// Client configuration for the GitHub API client
    pub fn client_config(&self) -> GitHubConfig {
        GitHubConfig::new(self.base_url.clone())
            .with_token(self.token.clone())
            .with_timeout(self.timeout_seconds)
            .with_rate_limit(self.rate_limit_per_sec)
            .with_max_retries(self.max_retries as usize)
            .with_user_agent(self.user_agent.clone())
    }
}

impl CacheSettings {
    /// Lifetime of cached pages
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours * 60 * 60)
    }

    /// Lifetime of cached rendered charts
    pub fn response_ttl(&self) -> Duration {
        Duration::from_secs(self.response_ttl_seconds)
    }
}

impl LoggingSettings {
    /// Logging bootstrap configuration
    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.level.clone(),
            json_format: self.json,
            file_path: self.file.clone(),
            ..LoggingConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate_all().is_ok());
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.cache.max_cost, 150_000_000);
        assert_eq!(config.cache.ttl(), Duration::from_secs(48 * 3600));
        assert_eq!(config.cache.response_ttl(), Duration::from_secs(86_400));
        assert_eq!(config.github.per_page, 100);
        assert!(config.fan_out.max_concurrency.is_none());
    }

    #[test]
    fn test_listen_addr() {
        let mut config = Config::default();
        assert_eq!(config.listen_addr(), "0.0.0.0:5000");

        config.server.host = "127.0.0.1".to_string();
        config.server.port = 8080;
        assert_eq!(config.listen_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_invalid_colors_are_reported() {
        let mut config = Config::default();
        config.graph.line_color = "sky blue".to_string();

        let errors = config.validate_all().unwrap_err();
        assert!(errors.errors().contains_key("graph.line_color"));
    }

    #[test]
    fn test_nested_range_errors_are_reported() {
        let mut config = Config::default();
        config.github.per_page = 500;
        config.fan_out.max_concurrency = Some(0);

        assert!(config.validate_all().is_err());
    }

    #[test]
    fn test_client_config_mapping() {
        let mut settings = GitHubSettings::default();
        settings.token = Some("abc".to_string());
        settings.max_retries = 5;

        let client = settings.client_config();
        assert_eq!(client.token.as_deref(), Some("abc"));
        assert_eq!(client.max_retries, 5);
        assert_eq!(client.base_url, DEFAULT_API_URL);
    }
}

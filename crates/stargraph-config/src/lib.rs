//! Configuration management for stargraph

pub mod loader;
pub mod settings;
pub mod validation;

pub use loader::{ConfigError, ConfigLoader};
pub use settings::{
    CacheSettings, Config, FanOutSettings, GitHubSettings, GraphSettings, LoggingSettings,
    ServerSettings,
};

//! Validation utilities and regex patterns

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use validator::ValidationError;

/// Regex pattern for validating hex color codes (e.g., #FFFFFF, #81C7EF)
pub static HEX_COLOR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("Invalid hex color regex pattern")
});

/// Log levels accepted by the `logging.level` setting
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a `#RRGGBB` color string
pub fn validate_hex_color(color: &str) -> Result<(), ValidationError> {
    if HEX_COLOR_REGEX.is_match(color) {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_hex_color");
        err.message = Some(Cow::from("Color must be a hex color like #81C7EF"));
        err.add_param(Cow::from("value"), &color);
        Err(err)
    }
}

/// Validate a log level, either a bare level or a full `EnvFilter` directive
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let level = level.trim();
    if level.is_empty() {
        return Err(ValidationError::new("empty_log_level"));
    }

    // Directives such as "stargraph_graphs=debug,info" are passed to EnvFilter as-is
    if level.contains('=') || level.contains(',') {
        return Ok(());
    }

    if LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_log_level");
        err.message = Some(Cow::from(
            "Log level must be one of: trace, debug, info, warn, error",
        ));
        Err(err)
    }
}

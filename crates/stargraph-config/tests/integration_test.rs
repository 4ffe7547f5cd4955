//! Integration tests for stargraph-config crate.

use stargraph_config::{Config, ConfigLoader};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"graph:\n  width: 1200\n  height: 600\n  axis_color: \"#333333\"\n")
        .unwrap();

    let config = ConfigLoader::load_from_file(file.path()).unwrap();

    assert_eq!(config.graph.width, 1200);
    assert_eq!(config.graph.height, 600);
    assert_eq!(config.graph.axis_color, "#333333");
    assert_eq!(config.graph.line_color, Config::default().graph.line_color);
}

#[test]
fn test_load_from_file_reports_validation_as_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"graph:\n  width: 5\n").unwrap();

    let err = ConfigLoader::load_from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("Configuration error"));
}

#[test]
fn test_default_config_round_trips_through_yaml() {
    let config = Config::default();
    let yaml = serde_yaml::to_string(&config).unwrap();
    let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed, config);
}

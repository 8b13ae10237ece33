use std::io::Write;

use meterdesk_config::{CONFIG_PATH_ENV, ClientConfig, ConfigError, ConfigLoader};
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn file_values_override_defaults() {
    let file = config_file(
        r#"{
            "api_url": "https://billing.example",
            "list": { "page_size": 50 },
            "reports": { "poll_interval_ms": 500 }
        }"#,
    );

    let config = ConfigLoader::with_env(|_| None)
        .with_path(file.path())
        .load()
        .expect("config");

    assert_eq!(config.api_url, "https://billing.example");
    assert_eq!(config.list.page_size, 50);
    assert_eq!(config.list.debounce_ms, ClientConfig::default().list.debounce_ms);
    assert_eq!(config.reports.poll_interval_ms, 500);
}

#[test]
fn environment_wins_over_file() {
    let file = config_file(r#"{ "list": { "page_size": 50 }, "timeout_secs": 30 }"#);
    let path = file.path().to_string_lossy().into_owned();

    let config = ConfigLoader::with_env(move |key| match key {
        "METERDESK_CONFIG" => Some(path.clone()),
        "METERDESK_PAGE_SIZE" => Some("75".into()),
        _ => None,
    })
    .load()
    .expect("config");

    assert_eq!(config.list.page_size, 75);
    assert_eq!(config.timeout_secs, 30);
}

#[test]
fn invalid_file_values_fail_validation() {
    let file = config_file(r#"{ "list": { "page_size": 1000 } }"#);

    let err = ConfigLoader::with_env(|_| None)
        .with_path(file.path())
        .load()
        .expect_err("page size");

    assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "list.page_size"));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let file = config_file("{ not json");

    let err = ConfigLoader::with_env(|_| None)
        .with_path(file.path())
        .load()
        .expect_err("parse");

    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn config_path_variable_names_the_file() {
    let file = config_file(r#"{ "api_url": "https://from-file.example" }"#);
    let path = file.path().to_string_lossy().into_owned();

    let config = ConfigLoader::with_env(move |key| match key {
        CONFIG_PATH_ENV => Some(path.clone()),
        "METERDESK_POLL_INTERVAL_MS" => Some("750".to_string()),
        _ => None,
    })
    .load()
    .expect("config");

    assert_eq!(config.api_url, "https://from-file.example");
    assert_eq!(config.reports.poll_interval_ms, 750);
}

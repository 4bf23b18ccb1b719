//! Loading configuration from disk and the environment

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use host_monitor::config::{Webhook, load_config, read_config_file};
use host_monitor::util::{API_ENDPOINT, AUTH_KEY, INTERVAL};
use pretty_assertions::assert_eq;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_full_config_file() {
    let file = write_config(
        r#"{
            "interval": 120,
            "alert_cpu_threshold": 80,
            "alert_memory_threshold": 70.5,
            "api_endpoint": "https://collector.example.com/metrics",
            "disk_path": "/srv",
            "request_timeout": 10,
            "sample_timeout": 15,
            "alert_webhook": { "url": "https://hooks.example.com/alerts" }
        }"#,
    );

    let lookup = |key: &str| (key == AUTH_KEY).then(|| "from-env".to_string());
    let config = load_config(file.path().to_str(), lookup).unwrap();

    assert_eq!(config.interval, Duration::from_secs(120));
    assert_eq!(config.thresholds.cpu_threshold, 80.0);
    assert_eq!(config.thresholds.memory_threshold, 70.5);
    assert_eq!(config.thresholds.cooldown, Duration::from_secs(3600));
    assert_eq!(config.disk_path, PathBuf::from("/srv"));
    assert_eq!(config.request_timeout, Duration::from_secs(10));
    assert_eq!(config.sample_timeout, Duration::from_secs(15));
    assert_eq!(config.auth_key, "from-env");
    assert_eq!(
        config.alert_webhook,
        Some(Webhook {
            url: "https://hooks.example.com/alerts".to_string()
        })
    );
}

#[test]
fn test_environment_overrides_file() {
    let file = write_config(
        r#"{ "interval": 120, "api_endpoint": "https://collector.example.com/metrics" }"#,
    );

    let lookup = |key: &str| match key {
        AUTH_KEY => Some("k".to_string()),
        API_ENDPOINT => Some("http://127.0.0.1:8080/ingest".to_string()),
        INTERVAL => Some("30".to_string()),
        _ => None,
    };
    let config = load_config(file.path().to_str(), lookup).unwrap();

    assert_eq!(config.interval, Duration::from_secs(30));
    assert_eq!(config.api_endpoint.as_str(), "http://127.0.0.1:8080/ingest");
}

#[test]
fn test_malformed_file_is_an_error() {
    let file = write_config("{ not json");
    assert!(read_config_file(file.path().to_str().unwrap()).is_err());
}

#[test]
fn test_missing_file_is_an_error() {
    assert!(read_config_file("/definitely/not/here.json").is_err());
}

#[test]
fn test_missing_auth_key_fails_startup() {
    let file = write_config(r#"{ "api_endpoint": "https://collector.example.com/metrics" }"#);

    let err = load_config(file.path().to_str(), |_: &str| None).unwrap_err();
    assert!(err.to_string().contains("AUTH_KEY"));
}

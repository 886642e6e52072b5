//! Loading configuration from disk

use bell_feed::{BellConfig, ConfigError, MutationPolicy};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn loads_and_validates_file() {
    let file = write_config(
        r#"
        api_url = "https://crm.example.com/api"
        topic = "/topic/admin/notifications"
        request_timeout_secs = 15

        [mutation_policy]
        kind = "retry"
        attempts = 3
        backoff_ms = 250
        "#,
    );

    let config = BellConfig::load(file.path()).unwrap();

    assert_eq!(config.request_timeout_secs, 15);
    assert!(matches!(
        config.mutation_policy,
        MutationPolicy::Retry { attempts: 3, backoff_ms: 250 }
    ));
    assert_eq!(
        config.notifications_url().unwrap().as_str(),
        "https://crm.example.com/api/admin/notifications"
    );
}

#[test]
fn invalid_value_is_reported_by_field() {
    let file = write_config("request_timeout_secs = 0\n");
    let err = BellConfig::load(file.path()).unwrap_err();
    assert!(
        matches!(err, ConfigError::Invalid { field: "request_timeout_secs", .. }),
        "got {err:?}"
    );
}

#[test]
fn malformed_toml_is_parse_error() {
    let file = write_config("api_url = [\n");
    let err = BellConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)), "got {err:?}");
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = BellConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }), "got {err:?}");
    assert!(err.to_string().contains("absent.toml"));
}

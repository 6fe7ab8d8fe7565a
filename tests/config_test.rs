//! Configuration parsing from an injected lookup (no process environment).

use std::collections::HashMap;

use consenso::config::AppConfig;
use consenso::errors::AppError;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_defaults_apply_when_only_database_url_is_set() {
    let config =
        AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/consenso")]))
            .expect("config");

    assert_eq!(config.database_url, "postgres://localhost/consenso");
    assert_eq!(config.bind_addr, "127.0.0.1:8080");
    assert_eq!(config.storage_dir, "data/uploads");
    assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    assert_eq!(config.expiry_sweep_secs, 300);
    assert_eq!(config.db_max_connections, 8);
    assert_eq!(config.admin_username, "admin");
    assert_eq!(config.admin_email, "admin@localhost");
    assert!(config.session_key.is_none());
    assert!(config.storage_signing_key.is_none());
}

#[test]
fn test_database_url_is_required() {
    let result = AppConfig::from_lookup(lookup(&[("BIND_ADDR", "0.0.0.0:80")]));
    assert!(matches!(result, Err(AppError::Config(_))));

    let blank = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "   ")]));
    assert!(matches!(blank, Err(AppError::Config(_))));
}

#[test]
fn test_short_session_key_is_discarded() {
    let config = AppConfig::from_lookup(lookup(&[
        ("DATABASE_URL", "postgres://db"),
        ("SESSION_KEY", "too-short"),
    ]))
    .expect("config");
    assert!(config.session_key.is_none());

    let long_key = "k".repeat(64);
    let config = AppConfig::from_lookup(lookup(&[
        ("DATABASE_URL", "postgres://db"),
        ("SESSION_KEY", long_key.as_str()),
    ]))
    .expect("config");
    assert_eq!(config.session_key.as_deref(), Some(long_key.as_str()));
}

#[test]
fn test_overrides_are_trimmed_and_parsed() {
    let config = AppConfig::from_lookup(lookup(&[
        ("DATABASE_URL", " postgres://db "),
        ("BIND_ADDR", "0.0.0.0:9000"),
        ("MAX_UPLOAD_BYTES", "2048"),
        ("EXPIRY_SWEEP_SECS", " 60 "),
        ("DB_MAX_CONNECTIONS", "2"),
        ("STORAGE_SIGNING_KEY", "secret"),
        ("ADMIN_USERNAME", "root"),
    ]))
    .expect("config");

    assert_eq!(config.database_url, "postgres://db");
    assert_eq!(config.bind_addr, "0.0.0.0:9000");
    assert_eq!(config.max_upload_bytes, 2048);
    assert_eq!(config.expiry_sweep_secs, 60);
    assert_eq!(config.db_max_connections, 2);
    assert_eq!(config.storage_signing_key.as_deref(), Some("secret"));
    assert_eq!(config.admin_username, "root");
}

#[test]
fn test_bad_number_is_a_config_error() {
    let result = AppConfig::from_lookup(lookup(&[
        ("DATABASE_URL", "postgres://db"),
        ("MAX_UPLOAD_BYTES", "ten megabytes"),
    ]));
    match result {
        Err(AppError::Config(msg)) => assert!(msg.contains("MAX_UPLOAD_BYTES")),
        other => panic!("expected config error, got {other:?}"),
    }
}

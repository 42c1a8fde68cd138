//! Tests for schema and filesystem validation.

use bale_config::{BundleOptions, ConfigError, validate_fs, validate_schema};
use std::fs;
use tempfile::TempDir;

#[test]
fn fs_validator_reports_missing_entry() {
    let dir = TempDir::new().expect("tempdir");
    let config = BundleOptions::default().with_entry("src/main.js");

    let err = validate_fs(&config, dir.path()).unwrap_err();
    match err {
        ConfigError::EntryNotFound { path } => assert!(path.ends_with("src/main.js")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn fs_validator_accepts_existing_entry() {
    let dir = TempDir::new().expect("tempdir");
    fs::create_dir_all(dir.path().join("src")).expect("mkdir");
    fs::write(dir.path().join("src/main.js"), "console.log(1)").expect("write");

    let config = BundleOptions::default().with_entry("src/main.js");
    validate_fs(&config, dir.path()).expect("valid");
}

#[test]
fn fs_validator_requires_cache_dir() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("main.js"), "").expect("write");

    let mut config = BundleOptions::default().with_entry("main.js");
    config.cache.cache_dir = Some("missing-cache".into());

    let err = validate_fs(&config, dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::CacheDirNotWritable { .. }));
}

#[test]
fn schema_validation_checks_hash_length() {
    let mut config = BundleOptions::default().with_entry("main.js");
    config.filenames.image = "img/{hash:0}{ext}".into();
    assert!(matches!(
        validate_schema(&config).unwrap_err(),
        ConfigError::InvalidTemplate { .. }
    ));
}

#[test]
fn schema_validation_rejects_blank_external() {
    let mut config = BundleOptions::default().with_entry("main.js");
    config.external = vec!["jquery".into(), " ".into()];
    let err = validate_schema(&config).unwrap_err();
    assert!(err.hint().is_some());
}

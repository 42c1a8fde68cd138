//! Tests for configuration profiles and merging behavior.

use bale_config::ConfigDiscovery;
use std::fs;
use tempfile::TempDir;

#[test]
fn profile_overrides_bundle_options() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(
        dir.path().join("bale.toml"),
        r#"
[bundle]
entries = ["src/main.js"]
unresolved = "strict"

[profiles.preview.bundle]
unresolved = "tolerant"
output_dir = "preview"
"#,
    )
    .expect("write config");

    let config = ConfigDiscovery::new(dir.path())
        .load_with_profile("preview")
        .expect("load with profile");

    assert_eq!(config.bundle.unresolved, bale_config::UnresolvedPolicy::Tolerant);
    assert_eq!(config.bundle.output_dir, std::path::PathBuf::from("preview"));
}

#[test]
fn production_profile_layers_user_overrides() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(
        dir.path().join("bale.toml"),
        r#"
[bundle]
entries = ["src/main.js"]

[profiles.production.bundle]
source_maps = true
"#,
    )
    .expect("write config");

    let config = ConfigDiscovery::new(dir.path())
        .load_with_profile("production")
        .expect("load with profile");

    assert!(config.bundle.extract_styles);
    assert!(config.bundle.minify);
    assert!(config.bundle.source_maps);
}

#[test]
fn profile_creates_dev_section() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(
        dir.path().join("bale.toml"),
        r#"
[bundle]
entries = ["src/main.js"]

[profiles.ci.dev]
hot = false
debounce_ms = 250
"#,
    )
    .expect("write config");

    let config = ConfigDiscovery::new(dir.path())
        .load_with_profile("ci")
        .expect("load with profile");

    let dev = config.dev.expect("dev config");
    assert!(!dev.hot);
    assert_eq!(dev.debounce_ms, 250);
    assert!(dev.ignore.iter().any(|p| p == "node_modules"));
}

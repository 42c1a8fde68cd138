//! Tests for default values and edge cases.

use bale_config::{
    BaleConfig, BundleOptions, CacheOptions, DevConfig, FilenameTemplates, GlobalSettings,
    RuleType, SplitStrategy, UnresolvedPolicy,
};
use std::path::PathBuf;

#[test]
fn bale_config_defaults() {
    let config = BaleConfig::default();
    assert!(config.bundle.entries.is_empty());
    assert_eq!(config.bundle.output_dir, PathBuf::from("dist"));
    assert!(config.profiles.is_empty());
    assert!(config.dev.is_none());
}

#[test]
fn bundle_options_defaults() {
    let opts = BundleOptions::default();
    assert!(opts.entries.is_empty());
    assert_eq!(opts.output_dir, PathBuf::from("dist"));
    assert_eq!(opts.package_root, PathBuf::from("node_modules"));
    assert_eq!(opts.inline_limit, 20 * 1024);
    assert_eq!(opts.split_strategy, SplitStrategy::Duplicate);
    assert_eq!(opts.unresolved, UnresolvedPolicy::Strict);
    assert!(!opts.extract_styles);
    assert!(!opts.minify);
    assert!(!opts.clean);
    assert_eq!(opts.step_timeout_ms, Some(30_000));
    assert_eq!(opts.extensions.first().map(String::as_str), Some("js"));
}

#[test]
fn filename_template_defaults() {
    let names = FilenameTemplates::default();
    assert_eq!(names.script, "static/js/{name}.js");
    assert_eq!(names.style, "static/css/{name}.css");
    assert_eq!(names.image, "static/images/{hash:10}{ext}{query}");
    assert_eq!(names.asset, "static/media/{hash:10}{ext}{query}");
    assert_eq!(names.source_map, "{file}.map");
}

#[test]
fn cache_options_defaults() {
    let cache = CacheOptions::default();
    assert!(cache.enabled);
    assert!(cache.cache_dir.is_none());
}

#[test]
fn dev_config_defaults() {
    let dev = DevConfig::default();
    assert!(dev.hot);
    assert_eq!(dev.debounce_ms, 100);
    assert!(dev.ignore.iter().any(|p| p == "node_modules"));
    assert!(dev.acceptors.is_empty());
}

#[test]
fn global_settings_defaults() {
    let settings = GlobalSettings::default();
    assert!(settings.log_level.is_none());
    assert!(settings.parallel_jobs.is_none());
}

#[test]
fn empty_json_object_yields_defaults() {
    let opts = BundleOptions::from_value(serde_json::json!({})).unwrap();
    assert_eq!(opts.output_dir, PathBuf::from("dist"));
    assert!(!opts.rules.is_empty());
}

#[test]
fn rules_deserialize_from_json() {
    let opts = BundleOptions::from_value(serde_json::json!({
        "rules": [{
            "exclusive": true,
            "rules": [{
                "test": "\\.less$",
                "type": "style",
                "steps": [
                    { "step": "exec", "program": "lessc", "args": ["-"] },
                    { "step": "style_inject" }
                ]
            }]
        }]
    }))
    .unwrap();

    assert_eq!(opts.rules.len(), 1);
    assert_eq!(opts.rules[0].rules[0].rule_type, RuleType::Style);
    assert_eq!(opts.rules[0].rules[0].steps.len(), 2);
}

#[test]
fn invalid_value_reports_field() {
    let err = BaleConfig::from_value(serde_json::json!({ "bundle": { "inline_limit": "big" } }))
        .unwrap_err();
    assert!(err.hint().is_some());
}

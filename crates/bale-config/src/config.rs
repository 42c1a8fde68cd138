//! High-level configuration structure for bale.
//!
//! This module provides the main `BaleConfig` struct and profile merging logic.
//! For file discovery, see the `discovery` module.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::bundle::BundleOptions;
use crate::dev::DevConfig;
use crate::error::{ConfigError, Result as ConfigResult};
use crate::settings::GlobalSettings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaleConfig {
    #[serde(default)]
    pub bundle: BundleOptions,

    #[serde(default)]
    pub dev: Option<DevConfig>,

    #[serde(default)]
    pub profiles: HashMap<String, ProfileConfig>,

    #[serde(default)]
    pub settings: GlobalSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default)]
    pub bundle: Value,

    #[serde(default)]
    pub dev: Value,

    #[serde(default)]
    pub settings: Value,
}

impl ProfileConfig {
    /// Presets applied before user profiles of the same name.
    ///
    /// `development` keeps styles injected and emits source maps;
    /// `production` extracts styles, minifies and cleans the output directory.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "development" => Some(Self {
                bundle: json!({
                    "source_maps": true,
                    "extract_styles": false,
                    "minify": false,
                }),
                dev: Value::Null,
                settings: Value::Null,
            }),
            "production" => Some(Self {
                bundle: json!({
                    "source_maps": false,
                    "extract_styles": true,
                    "minify": true,
                    "clean": true,
                }),
                dev: Value::Null,
                settings: Value::Null,
            }),
            _ => None,
        }
    }
}

impl BaleConfig {
    /// Create from serde_json::Value (for programmatic config)
    ///
    /// # Example
    ///
    /// ```
    /// use bale_config::BaleConfig;
    /// use serde_json::json;
    /// use std::path::PathBuf;
    ///
    /// let value = json!({
    ///     "bundle": {
    ///         "entries": ["src/main.js"],
    ///         "minify": true
    ///     }
    /// });
    ///
    /// let config = BaleConfig::from_value(value).unwrap();
    /// assert_eq!(config.bundle.entries, vec![PathBuf::from("src/main.js")]);
    /// ```
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Convert to serde_json::Value
    pub fn to_value(&self) -> ConfigResult<Value> {
        serde_json::to_value(self).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Bundle options with the global settings folded in.
    ///
    /// `settings.parallel_jobs` fills `worker_count` when the bundle leaves
    /// it unset.
    pub fn bundle_options(&self) -> BundleOptions {
        let mut bundle = self.bundle.clone();
        if bundle.worker_count.is_none() {
            bundle.worker_count = self.settings.parallel_jobs;
        }
        bundle
    }

    /// Apply the built-in preset and then the user profile named `profile`.
    pub fn materialize_profile(mut self, profile: Option<&str>) -> ConfigResult<Self> {
        let Some(name) = profile else {
            return Ok(self);
        };

        let layers: Vec<ProfileConfig> = ProfileConfig::builtin(name)
            .into_iter()
            .chain(self.profiles.get(name).cloned())
            .collect();

        if layers.is_empty() {
            tracing::debug!(profile = name, "profile not defined, using base configuration");
        }

        for layer in &layers {
            self.apply(layer)?;
        }

        Ok(self)
    }

    fn apply(&mut self, profile_cfg: &ProfileConfig) -> ConfigResult<()> {
        if !profile_cfg.bundle.is_null() {
            self.bundle = merged(&self.bundle, &profile_cfg.bundle)?;
        }

        if !profile_cfg.dev.is_null() {
            let mut base = match &self.dev {
                Some(dev) => to_override_value(dev)?,
                None => Value::Null,
            };
            merge_values(&mut base, &profile_cfg.dev);
            self.dev = if base.is_null() {
                None
            } else {
                Some(from_override_value(base)?)
            };
        }

        if !profile_cfg.settings.is_null() {
            self.settings = merged(&self.settings, &profile_cfg.settings)?;
        }

        Ok(())
    }
}

fn merged<T>(base: &T, update: &Value) -> ConfigResult<T>
where
    T: Serialize + serde::de::DeserializeOwned,
{
    let mut value = to_override_value(base)?;
    merge_values(&mut value, update);
    from_override_value(value)
}

fn to_override_value<T: Serialize>(value: &T) -> ConfigResult<Value> {
    serde_json::to_value(value).map_err(|err| ConfigError::InvalidProfileOverride {
        message: err.to_string(),
    })
}

fn from_override_value<T: serde::de::DeserializeOwned>(value: Value) -> ConfigResult<T> {
    serde_json::from_value(value).map_err(|err| ConfigError::InvalidProfileOverride {
        message: err.to_string(),
    })
}

/// Deep-merge `update` into `target`. Objects merge key by key; arrays and
/// scalars replace.
pub fn merge_values(target: &mut Value, update: &Value) {
    match (target, update) {
        (Value::Object(target_map), Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_values(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target_slot, _) => {
            *target_slot = update.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn from_value_creates_config() {
        let value = json!({
            "bundle": {
                "entries": ["src/main.js"],
                "minify": true
            }
        });

        let config = BaleConfig::from_value(value).unwrap();
        assert_eq!(config.bundle.entries, vec![PathBuf::from("src/main.js")]);
        assert!(config.bundle.minify);
    }

    #[test]
    fn to_value_serializes_config() {
        let mut config = BaleConfig::default();
        config.bundle.entries = vec![PathBuf::from("src/main.js")];
        config.bundle.minify = true;

        let value = config.to_value().unwrap();
        assert_eq!(value["bundle"]["minify"], json!(true));
    }

    #[test]
    fn builtin_production_profile_extracts_styles() {
        let config = BaleConfig::default()
            .materialize_profile(Some("production"))
            .unwrap();

        assert!(config.bundle.extract_styles);
        assert!(config.bundle.minify);
        assert!(config.bundle.clean);
        assert!(!config.bundle.source_maps);
    }

    #[test]
    fn parallel_jobs_fills_unset_worker_count() {
        let config = BaleConfig::from_value(json!({
            "settings": { "parallel_jobs": 3 }
        }))
        .unwrap();
        assert_eq!(config.bundle_options().worker_count, Some(3));
        assert_eq!(config.bundle_options().effective_worker_count(), 3);

        let config = BaleConfig::from_value(json!({
            "bundle": { "worker_count": 5 },
            "settings": { "parallel_jobs": 3 }
        }))
        .unwrap();
        assert_eq!(config.bundle_options().worker_count, Some(5));
    }

    #[test]
    fn profile_settings_override_parallel_jobs() {
        let config = BaleConfig::from_value(json!({
            "settings": { "parallel_jobs": 8 },
            "profiles": { "ci": { "settings": { "parallel_jobs": 2 } } }
        }))
        .unwrap()
        .materialize_profile(Some("ci"))
        .unwrap();
        assert_eq!(config.bundle_options().worker_count, Some(2));
    }

    #[test]
    fn user_profile_wins_over_builtin() {
        let value = json!({
            "bundle": { "entries": ["src/main.js"] },
            "profiles": {
                "production": { "bundle": { "minify": false } }
            }
        });

        let config = BaleConfig::from_value(value)
            .unwrap()
            .materialize_profile(Some("production"))
            .unwrap();

        assert!(!config.bundle.minify);
        assert!(config.bundle.extract_styles);
    }

    #[test]
    fn unknown_profile_keeps_base() {
        let config = BaleConfig::default()
            .materialize_profile(Some("staging"))
            .unwrap();
        assert!(!config.bundle.minify);
    }

    #[test]
    fn merge_replaces_arrays() {
        let mut base = json!({ "list": [1, 2, 3], "nested": { "a": 1, "b": 2 } });
        merge_values(&mut base, &json!({ "list": [4], "nested": { "b": 3 } }));
        assert_eq!(base, json!({ "list": [4], "nested": { "a": 1, "b": 3 } }));
    }
}

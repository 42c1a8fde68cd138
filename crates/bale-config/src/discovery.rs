//! Locating and reading a project's config file.
//!
//! A project keeps its configuration in one of three places, checked in
//! this order: `bale.toml`, `bale.json`, or a `"bale"` object inside
//! `package.json`. A `package.json` without that object does not count.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::BaleConfig;
use crate::error::{ConfigError, Result};

/// Field of `package.json` holding the configuration
const PACKAGE_FIELD: &str = "bale";

/// How a config file is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    /// JSON, configuration under the `"bale"` field
    PackageJson,
}

impl ConfigFormat {
    /// Candidate file names in lookup order.
    pub const CANDIDATES: [(&'static str, ConfigFormat); 3] = [
        ("bale.toml", ConfigFormat::Toml),
        ("bale.json", ConfigFormat::Json),
        ("package.json", ConfigFormat::PackageJson),
    ];

    /// Format of `path`, judged by its file name. Anything that is neither
    /// `package.json` nor `*.json` is read as TOML.
    pub fn of(path: &Path) -> Self {
        match path.file_name().and_then(|name| name.to_str()) {
            Some("package.json") => ConfigFormat::PackageJson,
            _ if path.extension().is_some_and(|ext| ext == "json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }

    /// Raw configuration value held by `text`, or `None` when a
    /// `package.json` carries no configuration.
    fn parse(self, path: &Path, text: &str) -> Result<Option<Value>> {
        let invalid = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };

        match self {
            ConfigFormat::Toml => {
                let table: toml::Table = toml::from_str(text).map_err(|err| invalid(err.message().to_string()))?;
                serde_json::to_value(table)
                    .map(Some)
                    .map_err(|err| invalid(err.to_string()))
            }
            ConfigFormat::Json => serde_json::from_str(text)
                .map(Some)
                .map_err(|err| invalid(err.to_string())),
            ConfigFormat::PackageJson => {
                let mut package: Value = serde_json::from_str(text).map_err(|err| invalid(err.to_string()))?;
                Ok(package
                    .get_mut(PACKAGE_FIELD)
                    .map(Value::take)
                    .filter(|value| !value.is_null()))
            }
        }
    }
}

/// Finds and reads the config file of the project rooted at `root`.
///
/// ```no_run
/// use bale_config::ConfigDiscovery;
///
/// let config = ConfigDiscovery::new(".").load_with_profile("production").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigDiscovery {
    root: PathBuf,
}

impl ConfigDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// First candidate that holds configuration.
    pub fn find(&self) -> Option<PathBuf> {
        ConfigFormat::CANDIDATES.iter().find_map(|(name, format)| {
            let path = self.root.join(name);
            if !path.is_file() {
                return None;
            }
            if *format == ConfigFormat::PackageJson && !self.declares_config(&path) {
                tracing::trace!(path = %path.display(), "package.json has no bale field");
                return None;
            }
            Some(path)
        })
    }

    /// Load the discovered config file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NotFound`] when no candidate holds configuration.
    pub fn load(&self) -> Result<BaleConfig> {
        let path = self.find().ok_or(ConfigError::NotFound)?;
        tracing::debug!(path = %path.display(), "loading configuration");
        self.load_from(&path)
    }

    /// Load the discovered config file and apply `profile`.
    pub fn load_with_profile(&self, profile: &str) -> Result<BaleConfig> {
        self.load()?.materialize_profile(Some(profile))
    }

    /// Load `path`, relative to the root unless absolute.
    pub fn load_from(&self, path: &Path) -> Result<BaleConfig> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let text = fs::read_to_string(&path)?;

        match ConfigFormat::of(&path).parse(&path, &text)? {
            Some(value) => BaleConfig::from_value(value),
            None => Err(ConfigError::InvalidValue {
                field: PACKAGE_FIELD.to_string(),
                hint: Some(format!("Add a \"{PACKAGE_FIELD}\" object to {}", path.display())),
            }),
        }
    }

    fn declares_config(&self, package: &Path) -> bool {
        fs::read_to_string(package)
            .ok()
            .and_then(|text| ConfigFormat::PackageJson.parse(package, &text).ok())
            .flatten()
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn find_returns_none_when_no_config() {
        let dir = TempDir::new().unwrap();
        assert!(ConfigDiscovery::new(dir.path()).find().is_none());
    }

    #[test]
    fn toml_beats_json_beats_package_json() {
        let dir = TempDir::new().unwrap();
        let discovery = ConfigDiscovery::new(dir.path());
        fs::write(
            dir.path().join("package.json"),
            r#"{ "bale": { "bundle": { "entries": ["c.js"] } } }"#,
        )
        .unwrap();
        assert_eq!(discovery.find().unwrap(), dir.path().join("package.json"));

        fs::write(dir.path().join("bale.json"), r#"{ "bundle": { "entries": ["b.js"] } }"#).unwrap();
        assert_eq!(discovery.find().unwrap(), dir.path().join("bale.json"));

        fs::write(dir.path().join("bale.toml"), "[bundle]\nentries = [\"a.js\"]\n").unwrap();
        assert_eq!(discovery.find().unwrap(), dir.path().join("bale.toml"));
    }

    #[test]
    fn package_json_without_field_is_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), r#"{ "name": "app", "bale": null }"#).unwrap();
        assert!(ConfigDiscovery::new(dir.path()).find().is_none());

        let err = ConfigDiscovery::new(dir.path())
            .load_from(Path::new("package.json"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "bale"));
    }

    #[test]
    fn json_config_is_read() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("bale.json"),
            r#"{ "bundle": { "entries": ["src/main.js"], "minify": true } }"#,
        )
        .unwrap();
        let config = ConfigDiscovery::new(dir.path()).load().unwrap();
        assert_eq!(config.bundle.entries, vec![PathBuf::from("src/main.js")]);
        assert!(config.bundle.minify);
    }

    #[test]
    fn syntax_errors_name_the_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bale.toml"), "[bundle\nentries = 1").unwrap();
        let err = ConfigDiscovery::new(dir.path()).load().unwrap_err();
        match err {
            ConfigError::Parse { path, .. } => assert_eq!(path, dir.path().join("bale.toml")),
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn format_follows_the_file_name() {
        assert_eq!(ConfigFormat::of(Path::new("/app/package.json")), ConfigFormat::PackageJson);
        assert_eq!(ConfigFormat::of(Path::new("ci.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::of(Path::new("bale.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::of(Path::new("bale.conf")), ConfigFormat::Toml);
    }
}

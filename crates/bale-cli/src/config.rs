//! Layered configuration loading.
//!
//! Sources, lowest to highest priority:
//!
//! 1. built-in defaults
//! 2. the config file (`bale.toml`, or the `bale` field of `package.json`)
//! 3. `BALE_` environment variables, with `__` separating nested keys
//!    (`BALE_BUNDLE__OUTPUT_DIR=public`)
//! 4. command-line flags
//!
//! The selected profile is applied last, on the merged result.

use std::path::{Path, PathBuf};

use bale_config::{BaleConfig, ConfigDiscovery, UnresolvedPolicy};
use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized, Toml},
};
use path_clean::PathClean;

use crate::cli::ConfigArgs;
use crate::error::{ConfigError, Result};

const ENV_PREFIX: &str = "BALE_";

/// Values from command-line flags. Unset fields leave lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub entries: Vec<String>,
    pub output_dir: Option<PathBuf>,
    pub tolerant: bool,
    pub minify: bool,
    pub clean: bool,
    pub no_cache: bool,
    pub worker_count: Option<usize>,
    pub debounce_ms: Option<u64>,
    pub no_hot: bool,
}

/// Configuration plus the directory it is rooted at.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub root: PathBuf,
    /// File the configuration was read from, if any
    pub source: Option<PathBuf>,
    pub profile: Option<String>,
    pub config: BaleConfig,
}

/// Absolute project root from `--cwd`, relative to the process directory.
pub fn project_root(cwd: Option<&Path>) -> Result<PathBuf> {
    let current = std::env::current_dir()?;
    Ok(match cwd {
        Some(dir) if dir.is_absolute() => dir.to_path_buf().clean(),
        Some(dir) => current.join(dir).clean(),
        None => current,
    })
}

/// Load configuration for a command.
///
/// An explicit `--config` path must exist; otherwise a missing config file
/// is not an error and defaults apply.
pub fn load(args: &ConfigArgs, profile: Option<&str>, overrides: &Overrides) -> Result<LoadedConfig> {
    let root = project_root(args.cwd.as_deref())?;

    let source = match &args.config {
        Some(path) => {
            let path = if path.is_absolute() { path.clone() } else { root.join(path) };
            if !path.is_file() {
                return Err(ConfigError::NotFound(path).into());
            }
            Some(path)
        }
        None => ConfigDiscovery::new(&root).find(),
    };

    let mut figment = Figment::new().merge(Serialized::defaults(BaleConfig::default()));
    if let Some(path) = &source {
        figment = merge_file(figment, &root, path)?;
    }
    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
    figment = apply_overrides(figment, overrides);

    let config: BaleConfig = figment.extract().map_err(ConfigError::from)?;
    let config = config.materialize_profile(profile)?;
    crate::logger::apply_configured_level(config.settings.log_level.as_deref());

    tracing::debug!(
        root = %root.display(),
        source = ?source,
        profile = ?profile,
        "configuration loaded"
    );

    Ok(LoadedConfig {
        root,
        source,
        profile: profile.map(str::to_string),
        config,
    })
}

fn merge_file(figment: Figment, root: &Path, path: &Path) -> Result<Figment> {
    let is_package_json = path.file_name().is_some_and(|name| name == "package.json");
    let merged = if is_package_json {
        let from_package = ConfigDiscovery::new(root).load_from(path)?;
        figment.merge(Serialized::defaults(from_package))
    } else if path.extension().is_some_and(|ext| ext == "json") {
        figment.merge(Json::file(path))
    } else {
        figment.merge(Toml::file(path))
    };
    Ok(merged)
}

fn apply_overrides(mut figment: Figment, overrides: &Overrides) -> Figment {
    if !overrides.entries.is_empty() {
        figment = figment.merge(Serialized::default("bundle.entries", &overrides.entries));
    }
    if let Some(dir) = &overrides.output_dir {
        figment = figment.merge(Serialized::default("bundle.output_dir", dir));
    }
    if overrides.tolerant {
        figment = figment.merge(Serialized::default("bundle.unresolved", UnresolvedPolicy::Tolerant));
    }
    if overrides.minify {
        figment = figment.merge(Serialized::default("bundle.minify", true));
    }
    if overrides.clean {
        figment = figment.merge(Serialized::default("bundle.clean", true));
    }
    if overrides.no_cache {
        figment = figment.merge(Serialized::default("bundle.cache.enabled", false));
    }
    if let Some(workers) = overrides.worker_count {
        figment = figment.merge(Serialized::default("bundle.worker_count", workers));
    }
    if let Some(ms) = overrides.debounce_ms {
        figment = figment.merge(Serialized::default("dev.debounce_ms", ms));
    }
    if overrides.no_hot {
        figment = figment.merge(Serialized::default("dev.hot", false));
    }
    figment
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn args(dir: &TempDir) -> ConfigArgs {
        ConfigArgs {
            config: None,
            cwd: Some(dir.path().to_path_buf()),
            profile: None,
        }
    }

    #[test]
    #[serial]
    fn defaults_apply_without_a_config_file() {
        let dir = TempDir::new().unwrap();
        let loaded = load(&args(&dir), None, &Overrides::default()).unwrap();
        assert!(loaded.source.is_none());
        assert_eq!(loaded.config.bundle.output_dir, PathBuf::from("dist"));
        assert!(loaded.config.bundle.entries.is_empty());
    }

    #[test]
    #[serial]
    fn flags_override_the_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("bale.toml"),
            "[bundle]\nentries = [\"src/main.js\"]\noutput_dir = \"build\"\nminify = false\n",
        )
        .unwrap();

        let overrides = Overrides {
            output_dir: Some(PathBuf::from("public")),
            minify: true,
            tolerant: true,
            ..Default::default()
        };
        let loaded = load(&args(&dir), None, &overrides).unwrap();
        assert_eq!(loaded.source, Some(dir.path().join("bale.toml")));
        assert_eq!(loaded.config.bundle.entries, vec![PathBuf::from("src/main.js")]);
        assert_eq!(loaded.config.bundle.output_dir, PathBuf::from("public"));
        assert!(loaded.config.bundle.minify);
        assert_eq!(loaded.config.bundle.unresolved, UnresolvedPolicy::Tolerant);
    }

    #[test]
    #[serial]
    fn environment_sits_between_file_and_flags() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("bale.toml"),
            "[bundle]\nentries = [\"src/main.js\"]\npublic_path = \"/file/\"\n",
        )
        .unwrap();

        unsafe { std::env::set_var("BALE_BUNDLE__PUBLIC_PATH", "/env/") };
        let loaded = load(&args(&dir), None, &Overrides::default());
        unsafe { std::env::remove_var("BALE_BUNDLE__PUBLIC_PATH") };

        assert_eq!(loaded.unwrap().config.bundle.public_path, "/env/");
    }

    #[test]
    #[serial]
    fn package_json_field_is_read() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name": "app", "bale": {"bundle": {"entries": ["src/app.js"]}}}"#,
        )
        .unwrap();

        let loaded = load(&args(&dir), None, &Overrides::default()).unwrap();
        assert_eq!(loaded.config.bundle.entries, vec![PathBuf::from("src/app.js")]);
    }

    #[test]
    #[serial]
    fn jobs_flag_beats_parallel_jobs_setting() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("bale.toml"),
            "[bundle]\nentries = [\"src/main.js\"]\n\n[settings]\nparallel_jobs = 4\nlog_level = \"debug\"\n",
        )
        .unwrap();

        let loaded = load(&args(&dir), None, &Overrides::default()).unwrap();
        assert_eq!(loaded.config.settings.log_level.as_deref(), Some("debug"));
        assert_eq!(loaded.config.bundle_options().worker_count, Some(4));

        let overrides = Overrides {
            worker_count: Some(2),
            ..Default::default()
        };
        let loaded = load(&args(&dir), None, &overrides).unwrap();
        assert_eq!(loaded.config.bundle_options().worker_count, Some(2));
    }

    #[test]
    #[serial]
    fn production_profile_is_applied_after_overrides() {
        let dir = TempDir::new().unwrap();
        let overrides = Overrides {
            entries: vec!["src/main.js".into()],
            ..Default::default()
        };
        let loaded = load(&args(&dir), Some("production"), &overrides).unwrap();
        assert!(loaded.config.bundle.minify);
        assert!(loaded.config.bundle.extract_styles);
        assert_eq!(loaded.profile.as_deref(), Some("production"));
    }

    #[test]
    #[serial]
    fn explicit_config_must_exist() {
        let dir = TempDir::new().unwrap();
        let mut args = args(&dir);
        args.config = Some(PathBuf::from("missing.toml"));
        let err = load(&args, None, &Overrides::default()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::CliError::Config(ConfigError::NotFound(_))
        ));
    }

    #[test]
    #[serial]
    fn mistyped_values_are_load_errors() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bale.toml"), "[bundle]\ninline_limit = \"lots\"\n").unwrap();
        let err = load(&args(&dir), None, &Overrides::default()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::CliError::Config(ConfigError::Load(_))
        ));
    }
}

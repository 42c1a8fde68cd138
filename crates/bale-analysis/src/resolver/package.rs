//! Bare specifier lookup under the package root.

use std::path::{Path, PathBuf};

use bale_graph::Runtime;
use serde::Deserialize;

/// Manifest fields consulted when a bare specifier names a package.
#[derive(Debug, Default, Deserialize)]
struct PackageManifest {
    module: Option<String>,
    main: Option<String>,
}

/// Split a bare specifier into package name and optional subpath.
///
/// Scoped names keep their scope: `@scope/pkg/lib/x` -> (`@scope/pkg`, `lib/x`).
pub fn split_package(specifier: &str) -> (&str, Option<&str>) {
    let mut slashes = specifier.match_indices('/');
    let cut = if specifier.starts_with('@') {
        slashes.nth(1)
    } else {
        slashes.next()
    };
    match cut {
        Some((idx, _)) => (&specifier[..idx], Some(&specifier[idx + 1..])),
        None => (specifier, None),
    }
}

/// Candidate path for a bare specifier.
///
/// With a subpath the candidate is `pkg_dir/subpath`. Without one the
/// manifest's `module` field is preferred over `main`; a missing or
/// unreadable manifest falls back to the package directory itself so index
/// probing still applies.
pub async fn package_candidate(
    specifier: &str,
    package_root: &Path,
    runtime: &dyn Runtime,
) -> PathBuf {
    let (name, subpath) = split_package(specifier);
    let pkg_dir = package_root.join(name);

    if let Some(subpath) = subpath {
        return pkg_dir.join(subpath);
    }

    let manifest_path = pkg_dir.join("package.json");
    let manifest = match runtime.read_file(&manifest_path).await {
        Ok(bytes) => serde_json::from_slice::<PackageManifest>(&bytes).unwrap_or_else(|err| {
            tracing::debug!(path = %manifest_path.display(), %err, "ignoring unreadable package manifest");
            PackageManifest::default()
        }),
        Err(_) => PackageManifest::default(),
    };

    match manifest.module.or(manifest.main) {
        Some(entry) if !entry.trim().is_empty() => pkg_dir.join(entry.trim()),
        _ => pkg_dir,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bale_graph::MemoryRuntime;

    #[test]
    fn splits_plain_and_scoped_names() {
        assert_eq!(split_package("jquery"), ("jquery", None));
        assert_eq!(split_package("lodash/fp/map"), ("lodash", Some("fp/map")));
        assert_eq!(split_package("@scope/pkg"), ("@scope/pkg", None));
        assert_eq!(split_package("@scope/pkg/lib/x"), ("@scope/pkg", Some("lib/x")));
    }

    #[tokio::test]
    async fn prefers_module_over_main() {
        let runtime = MemoryRuntime::with_files(
            "/app",
            &[(
                "node_modules/dual/package.json",
                r#"{"main": "cjs/index.js", "module": "esm/index.js"}"#,
            )],
        );
        let candidate =
            package_candidate("dual", Path::new("/app/node_modules"), &runtime).await;
        assert_eq!(candidate, PathBuf::from("/app/node_modules/dual/esm/index.js"));
    }

    #[tokio::test]
    async fn broken_manifest_falls_back_to_directory() {
        let runtime =
            MemoryRuntime::with_files("/app", &[("node_modules/odd/package.json", "{not json")]);
        let candidate = package_candidate("odd", Path::new("/app/node_modules"), &runtime).await;
        assert_eq!(candidate, PathBuf::from("/app/node_modules/odd"));
    }
}

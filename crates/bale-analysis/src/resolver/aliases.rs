//! Path alias handling (e.g. `@` -> `src`).

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

/// Rewrite `specifier` through the longest matching alias.
///
/// An alias matches when the specifier equals it or continues with `/`.
/// Relative alias targets are anchored at `root`.
pub fn resolve_path_alias(
    specifier: &str,
    root: &Path,
    path_aliases: &IndexMap<String, PathBuf>,
) -> Option<PathBuf> {
    let (alias, target) = path_aliases
        .iter()
        .filter(|(alias, _)| {
            specifier == alias.as_str()
                || specifier
                    .strip_prefix(alias.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
        .max_by_key(|(alias, _)| alias.len())?;

    let rest = specifier[alias.len()..].trim_start_matches('/');
    let base = if target.is_absolute() {
        target.clone()
    } else {
        root.join(target)
    };

    Some(if rest.is_empty() { base } else { base.join(rest) })
}

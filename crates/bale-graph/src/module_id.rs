use std::fmt;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use serde::{Deserialize, Serialize};

/// Identity of a module: a lexically cleaned path plus an optional
/// normalized query string.
///
/// Two specifiers that resolve to the same path and the same query (in any
/// parameter order) share one identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId {
    path: PathBuf,
    query: Option<String>,
}

impl ModuleId {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().clean(),
            query: None,
        }
    }

    pub fn with_query(path: impl AsRef<Path>, query: &str) -> Self {
        Self {
            path: path.as_ref().clean(),
            query: normalize_query(query),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// File stem used as a logical name (`src/main.js` -> `main`)
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "module".to_string())
    }

    /// Extension without the leading dot
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.query {
            Some(query) => write!(f, "{}?{}", self.path.display(), query),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

/// Split `spec?query` into its path part and normalized query.
pub fn split_query(specifier: &str) -> (&str, Option<String>) {
    match specifier.split_once('?') {
        Some((path, query)) => (path, normalize_query(query)),
        None => (specifier, None),
    }
}

/// Sort `&`-separated pairs and drop empty ones; an empty result is `None`.
pub fn normalize_query(query: &str) -> Option<String> {
    let mut pairs: Vec<&str> = query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .collect();
    if pairs.is_empty() {
        return None;
    }
    pairs.sort_unstable();
    pairs.dedup();
    Some(pairs.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn cleans_paths() {
        let id = ModuleId::new("/app/src/js/../main.js");
        assert_eq!(id.path(), Path::new("/app/src/main.js"));
        assert_eq!(id.name(), "main");
        assert_eq!(id.extension(), Some("js"));
    }

    #[test]
    fn query_order_does_not_matter() {
        let a = ModuleId::with_query("/app/logo.svg", "?b=2&a=1");
        let b = ModuleId::with_query("/app/logo.svg", "a=1&b=2");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "/app/logo.svg?a=1&b=2");
    }

    #[test]
    fn empty_query_is_none() {
        assert_eq!(normalize_query("?"), None);
        assert_eq!(normalize_query("&&"), None);
        assert_eq!(ModuleId::with_query("/a.js", ""), ModuleId::new("/a.js"));
    }

    #[test]
    fn split_query_separates_suffix() {
        let (path, query) = split_query("./font.woff2?v=3");
        assert_eq!(path, "./font.woff2");
        assert_eq!(query.as_deref(), Some("v=3"));
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(parts in proptest::collection::vec("[a-z]{1,3}=[0-9]{1,2}", 0..5)) {
            let query = parts.join("&");
            let once = normalize_query(&query);
            let twice = once.as_deref().and_then(normalize_query);
            prop_assert_eq!(once, twice);
        }
    }
}

use std::path::PathBuf;

// Helper defaults
pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

pub(crate) fn default_package_root() -> PathBuf {
    PathBuf::from("node_modules")
}

pub(crate) fn default_public_path() -> String {
    "/".to_string()
}

pub(crate) fn default_extensions() -> Vec<String> {
    ["js", "mjs", "json", "css", "less", "scss", "sass", "styl"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Assets strictly smaller than this are inlined as data URLs.
pub(crate) fn default_inline_limit() -> u64 {
    20 * 1024
}

pub(crate) fn default_large_asset_bytes() -> u64 {
    512 * 1024
}

pub(crate) fn default_step_timeout_ms() -> Option<u64> {
    Some(30_000)
}

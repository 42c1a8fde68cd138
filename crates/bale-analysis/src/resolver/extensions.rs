//! Extension and index-file probing for local candidates.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use bale_graph::Runtime;

/// Probe `candidate` as a file, then with each extension appended, then as a
/// directory holding `index.<ext>`.
///
/// Every probed path is pushed onto `tried` in probe order, which is what the
/// resolver reports when nothing matches.
pub fn probe(
    candidate: &Path,
    extensions: &[String],
    runtime: &dyn Runtime,
    tried: &mut Vec<PathBuf>,
) -> Option<PathBuf> {
    if let Some(found) = try_extensions(candidate, extensions, runtime, tried) {
        return Some(found);
    }
    try_index_files(candidate, extensions, runtime, tried)
}

/// Try the path as-is, then `path.<ext>` for each configured extension.
///
/// Extensions are appended rather than substituted, so `./jquery.min`
/// probes `jquery.min.js`.
pub fn try_extensions(
    base_path: &Path,
    extensions: &[String],
    runtime: &dyn Runtime,
    tried: &mut Vec<PathBuf>,
) -> Option<PathBuf> {
    tried.push(base_path.to_path_buf());
    if runtime.is_file(base_path) {
        return Some(base_path.to_path_buf());
    }

    for ext in extensions {
        let with_ext = append_extension(base_path, ext);
        tried.push(with_ext.clone());
        if runtime.is_file(&with_ext) {
            return Some(with_ext);
        }
    }

    None
}

/// Try `dir/index.<ext>` for each configured extension.
pub fn try_index_files(
    dir_path: &Path,
    extensions: &[String],
    runtime: &dyn Runtime,
    tried: &mut Vec<PathBuf>,
) -> Option<PathBuf> {
    if !runtime.exists(dir_path) || runtime.is_file(dir_path) {
        return None;
    }

    for ext in extensions {
        let index = dir_path.join(format!("index.{ext}"));
        tried.push(index.clone());
        if runtime.is_file(&index) {
            return Some(index);
        }
    }

    None
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(".");
    raw.push(ext);
    PathBuf::from(raw)
}

//! Writing emitted assets through the runtime.
//!
//! Every target path is validated before anything is written: filenames are
//! cleaned, joined onto the output directory and must still lie inside it.
//! Files are then written in order; if one write fails, the files already
//! written by this call are removed again so a failed write never leaves a
//! partial bundle behind.

use std::path::{Path, PathBuf};

use bale_graph::Runtime;
use path_clean::PathClean;

use crate::emit::EmittedAsset;
use crate::{Error, Result};

/// Write `assets` under `dir`.
///
/// With `overwrite` off, an existing target file is an
/// [`Error::OutputExists`] and nothing is written. Returns the written paths
/// in asset order.
pub async fn write_assets(
    assets: &[EmittedAsset],
    dir: &Path,
    runtime: &dyn Runtime,
    overwrite: bool,
) -> Result<Vec<PathBuf>> {
    let dir = validate_and_normalize_dir(dir, runtime)?;

    runtime.create_dir(&dir, true).await.map_err(|e| {
        Error::WriteFailure(format!(
            "Failed to create output directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let mut operations = Vec::with_capacity(assets.len());
    for asset in assets {
        let target = validate_output_path(&dir, asset.path())?;
        if !overwrite && runtime.is_file(&target) {
            return Err(Error::OutputExists(format!(
                "File already exists: '{}'. Use overwrite=true to replace.",
                target.display()
            )));
        }
        operations.push((target, asset.content.as_slice()));
    }

    write_files(&operations, runtime).await
}

/// Remove `dir` and everything below it.
pub async fn clean_dir(dir: &Path, runtime: &dyn Runtime) -> Result<()> {
    let dir = validate_and_normalize_dir(dir, runtime)?;
    if !runtime.exists(&dir) {
        return Ok(());
    }
    let cwd = runtime.get_cwd()?;
    if cwd.starts_with(&dir) {
        return Err(Error::InvalidOutputPath(format!(
            "Refusing to clean '{}': it contains the project directory",
            dir.display()
        )));
    }
    tracing::debug!(dir = %dir.display(), "cleaning output directory");
    runtime.remove_dir_all(&dir).await?;
    Ok(())
}

/// Clean `dir`, resolving a relative path against the runtime's working
/// directory.
fn validate_and_normalize_dir(dir: &Path, runtime: &dyn Runtime) -> Result<PathBuf> {
    let cleaned = dir.clean();
    if cleaned.is_absolute() {
        return Ok(cleaned);
    }
    let cwd = runtime.get_cwd().map_err(|e| {
        Error::InvalidOutputPath(format!("Failed to get current directory: {}", e))
    })?;
    Ok(cwd.join(cleaned).clean())
}

/// Join `filename` onto `base_dir`, refusing anything that escapes it.
fn validate_output_path(base_dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.is_empty() {
        return Err(Error::InvalidOutputPath("Filename is empty".to_string()));
    }
    if filename.contains('\0') {
        return Err(Error::InvalidOutputPath(
            "Filename contains null byte".to_string(),
        ));
    }

    #[cfg(target_os = "windows")]
    {
        let stem = Path::new(filename)
            .file_name()
            .map(|n| n.to_string_lossy().to_uppercase())
            .unwrap_or_default();
        let device_names = [
            "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
            "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
        ];
        for device in &device_names {
            if stem == *device || stem.starts_with(&format!("{}.", device)) {
                return Err(Error::InvalidOutputPath(format!(
                    "Filename is a reserved device name: {}",
                    filename
                )));
            }
        }
    }

    let full_path = base_dir.join(Path::new(filename).clean()).clean();
    if !full_path.starts_with(base_dir) || full_path == base_dir {
        return Err(Error::InvalidOutputPath(format!(
            "Path '{}' escapes output directory '{}' (resolved to '{}')",
            filename,
            base_dir.display(),
            full_path.display()
        )));
    }
    Ok(full_path)
}

async fn write_files(operations: &[(PathBuf, &[u8])], runtime: &dyn Runtime) -> Result<Vec<PathBuf>> {
    let mut written: Vec<PathBuf> = Vec::with_capacity(operations.len());

    for (target, content) in operations {
        if let Some(parent) = target.parent() {
            if let Err(e) = runtime.create_dir(parent, true).await {
                rollback(&written, runtime).await;
                return Err(Error::WriteFailure(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                )));
            }
        }

        if let Err(e) = runtime.write_file(target, content).await {
            rollback(&written, runtime).await;
            return Err(Error::WriteFailure(format!(
                "Failed to write '{}': {}",
                target.display(),
                e
            )));
        }
        written.push(target.clone());
    }

    tracing::debug!(files = written.len(), "wrote output files");
    Ok(written)
}

async fn rollback(written: &[PathBuf], runtime: &dyn Runtime) {
    for path in written.iter().rev() {
        if let Err(e) = runtime.remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to roll back written file");
        }
    }
}

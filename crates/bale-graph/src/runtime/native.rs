//! Native Runtime Implementation
//!
//! Blocking `std::fs` calls are moved onto tokio's blocking pool so the
//! coordinator and transform workers never stall the executor.

// NativeRuntime is the one place std::fs is called directly
#![allow(clippy::disallowed_methods)]

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::task;

use super::{FileMetadata, Runtime, RuntimeError, RuntimeResult};

/// Native filesystem Runtime implementation using `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRuntime;

impl NativeRuntime {
    pub fn new() -> Self {
        Self
    }
}

fn map_io(path: &Path, action: &str, err: io::Error) -> RuntimeError {
    if err.kind() == io::ErrorKind::NotFound {
        RuntimeError::FileNotFound(path.to_path_buf())
    } else {
        RuntimeError::Io(format!("Failed to {} {}: {}", action, path.display(), err))
    }
}

async fn blocking<T, F>(f: F) -> RuntimeResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> RuntimeResult<T> + Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| RuntimeError::Other(format!("Task join error: {}", e)))?
}

#[async_trait]
impl Runtime for NativeRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let path = path.to_path_buf();
        blocking(move || std::fs::read(&path).map_err(|e| map_io(&path, "read", e))).await
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()> {
        let path = path.to_path_buf();
        let content = content.to_vec();
        blocking(move || std::fs::write(&path, content).map_err(|e| map_io(&path, "write", e)))
            .await
    }

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata> {
        let path = path.to_path_buf();
        blocking(move || {
            let metadata = std::fs::metadata(&path).map_err(|e| map_io(&path, "stat", e))?;
            let modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as u64);

            Ok(FileMetadata {
                size: metadata.len(),
                is_dir: metadata.is_dir(),
                is_file: metadata.is_file(),
                modified,
            })
        })
        .await
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    async fn create_dir(&self, path: &Path, recursive: bool) -> RuntimeResult<()> {
        let path = path.to_path_buf();
        blocking(move || {
            let result = if recursive {
                std::fs::create_dir_all(&path)
            } else {
                std::fs::create_dir(&path)
            };
            result.map_err(|e| map_io(&path, "create directory", e))
        })
        .await
    }

    async fn remove_file(&self, path: &Path) -> RuntimeResult<()> {
        let path = path.to_path_buf();
        blocking(move || std::fs::remove_file(&path).map_err(|e| map_io(&path, "remove", e)))
            .await
    }

    async fn remove_dir_all(&self, path: &Path) -> RuntimeResult<()> {
        let path = path.to_path_buf();
        blocking(move || {
            std::fs::remove_dir_all(&path).map_err(|e| map_io(&path, "remove directory", e))
        })
        .await
    }

    async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>> {
        let path = path.to_path_buf();
        blocking(move || {
            let entries = std::fs::read_dir(&path).map_err(|e| map_io(&path, "read directory", e))?;
            let mut result = Vec::new();
            for entry in entries {
                let entry = entry.map_err(|e| map_io(&path, "read directory entry in", e))?;
                if let Some(name) = entry.file_name().to_str() {
                    result.push(name.to_string());
                }
            }
            result.sort();
            Ok(result)
        })
        .await
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        std::env::current_dir().map_err(|e| {
            RuntimeError::Io(format!("Failed to get current working directory: {}", e))
        })
    }
}

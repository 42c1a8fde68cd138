//! In-memory runtime for tests.
//!
//! Holds a snapshot of files keyed by absolute path. Directories are implied
//! by file paths and by explicit `create_dir` calls. Writes can be made to
//! fail for a given path and reads or writes can be slowed down, which lets
//! tests exercise rollback and cancellation.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::{FileMetadata, Runtime, RuntimeError, RuntimeResult};

#[derive(Debug, Default)]
struct MemoryFs {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
    failing_writes: BTreeSet<PathBuf>,
    read_delay: Option<Duration>,
    write_delay: Option<Duration>,
    reads: usize,
    writes: usize,
}

/// Cloneable handle to a shared in-memory filesystem.
#[derive(Debug, Clone)]
pub struct MemoryRuntime {
    cwd: PathBuf,
    fs: Arc<RwLock<MemoryFs>>,
}

impl MemoryRuntime {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        let cwd = cwd.into();
        let mut fs = MemoryFs::default();
        fs.dirs.insert(cwd.clone());
        Self {
            cwd,
            fs: Arc::new(RwLock::new(fs)),
        }
    }

    /// Build a runtime from `(relative path, content)` pairs under `cwd`.
    pub fn with_files(cwd: impl Into<PathBuf>, files: &[(&str, &str)]) -> Self {
        let runtime = Self::new(cwd);
        for (path, content) in files {
            runtime.insert(runtime.cwd.join(path), content.as_bytes());
        }
        runtime
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn insert(&self, path: impl Into<PathBuf>, content: impl AsRef<[u8]>) {
        let path = path.into();
        self.fs.write().files.insert(path, content.as_ref().to_vec());
    }

    pub fn remove(&self, path: &Path) -> bool {
        self.fs.write().files.remove(path).is_some()
    }

    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.fs.read().files.get(path).cloned()
    }

    /// All file paths in sorted order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.fs.read().files.keys().cloned().collect()
    }

    /// Make every subsequent write to `path` fail
    pub fn fail_writes_to(&self, path: impl Into<PathBuf>) {
        self.fs.write().failing_writes.insert(path.into());
    }

    /// Delay every read by `delay`
    pub fn set_read_delay(&self, delay: Option<Duration>) {
        self.fs.write().read_delay = delay;
    }

    /// Number of `read_file` calls served so far
    pub fn read_count(&self) -> usize {
        self.fs.read().reads
    }

    /// Delay every write by `delay`
    pub fn set_write_delay(&self, delay: Option<Duration>) {
        self.fs.write().write_delay = delay;
    }

    /// Number of `write_file` calls started so far
    pub fn write_count(&self) -> usize {
        self.fs.read().writes
    }

    fn is_dir(&self, path: &Path) -> bool {
        let fs = self.fs.read();
        fs.dirs.contains(path) || fs.files.keys().any(|p| p.starts_with(path) && p != path)
    }
}

#[async_trait]
impl Runtime for MemoryRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let delay = {
            let mut fs = self.fs.write();
            fs.reads += 1;
            fs.read_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.get(path)
            .ok_or_else(|| RuntimeError::FileNotFound(path.to_path_buf()))
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()> {
        let delay = {
            let mut fs = self.fs.write();
            fs.writes += 1;
            fs.write_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut fs = self.fs.write();
        if fs.failing_writes.contains(path) {
            return Err(RuntimeError::Io(format!(
                "Failed to write {}: injected failure",
                path.display()
            )));
        }
        fs.files.insert(path.to_path_buf(), content.to_vec());
        Ok(())
    }

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata> {
        if let Some(content) = self.get(path) {
            return Ok(FileMetadata {
                size: content.len() as u64,
                is_dir: false,
                is_file: true,
                modified: None,
            });
        }
        if self.is_dir(path) {
            return Ok(FileMetadata {
                size: 0,
                is_dir: true,
                is_file: false,
                modified: None,
            });
        }
        Err(RuntimeError::FileNotFound(path.to_path_buf()))
    }

    fn exists(&self, path: &Path) -> bool {
        self.fs.read().files.contains_key(path) || self.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.fs.read().files.contains_key(path)
    }

    async fn create_dir(&self, path: &Path, _recursive: bool) -> RuntimeResult<()> {
        self.fs.write().dirs.insert(path.to_path_buf());
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> RuntimeResult<()> {
        if self.remove(path) {
            Ok(())
        } else {
            Err(RuntimeError::FileNotFound(path.to_path_buf()))
        }
    }

    async fn remove_dir_all(&self, path: &Path) -> RuntimeResult<()> {
        let mut fs = self.fs.write();
        fs.files.retain(|p, _| !p.starts_with(path));
        fs.dirs.retain(|p| !p.starts_with(path));
        Ok(())
    }

    async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>> {
        if !self.is_dir(path) {
            return Err(RuntimeError::FileNotFound(path.to_path_buf()));
        }
        let fs = self.fs.read();
        let mut names = BTreeSet::new();
        for candidate in fs.files.keys().chain(fs.dirs.iter()) {
            if let Ok(rest) = candidate.strip_prefix(path) {
                if let Some(first) = rest.components().next() {
                    names.insert(first.as_os_str().to_string_lossy().into_owned());
                }
            }
        }
        Ok(names.into_iter().collect())
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        Ok(self.cwd.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn files_imply_directories() {
        let runtime = MemoryRuntime::with_files("/app", &[("src/js/count.js", "")]);
        assert!(runtime.exists(Path::new("/app/src/js")));
        assert!(!runtime.is_file(Path::new("/app/src/js")));
        assert_eq!(
            runtime.read_dir(Path::new("/app/src")).await.unwrap(),
            vec!["js"]
        );
    }

    #[tokio::test]
    async fn injected_write_failure() {
        let runtime = MemoryRuntime::new("/app");
        runtime.fail_writes_to("/app/dist/main.js");
        assert!(
            runtime
                .write_file(Path::new("/app/dist/main.js"), b"x")
                .await
                .is_err()
        );
        assert!(
            runtime
                .write_file(Path::new("/app/dist/other.js"), b"x")
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn counts_reads() {
        let runtime = MemoryRuntime::with_files("/app", &[("a.js", "1")]);
        runtime.read_file(Path::new("/app/a.js")).await.unwrap();
        let _ = runtime.read_file(Path::new("/app/missing.js")).await;
        assert_eq!(runtime.read_count(), 2);
    }
}

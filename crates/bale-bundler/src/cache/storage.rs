//! redb-backed transform storage.
//!
//! One database file, `<cache_dir>/cache.redb`, holds a table of bincode
//! encoded [`CachedTransform`]s keyed by module identity and a metadata
//! table that records the format version the entries were written with.

use std::path::{Path, PathBuf};

use bale_analysis::walker::CACHE_FORMAT_VERSION;
use bale_analysis::{CachedTransform, Diagnostic, DiagnosticKind};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

/// Module identity → serialized transform.
const TRANSFORMS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("transforms");

const METADATA_TABLE: TableDefinition<&str, &str> = TableDefinition::new("metadata");

const FORMAT_VERSION_KEY: &str = "format_version";

pub const DATABASE_FILE: &str = "cache.redb";

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache database error: {0}")]
    DatabaseError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("deserialization error: {0}")]
    DeserializationError(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("cache version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("cache corrupted: {0}")]
    Corrupted(String),
}

impl From<redb::Error> for CacheError {
    fn from(err: redb::Error) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

impl From<redb::DatabaseError> for CacheError {
    fn from(err: redb::DatabaseError) -> Self {
        CacheError::Corrupted(err.to_string())
    }
}

impl From<redb::TableError> for CacheError {
    fn from(err: redb::TableError) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

impl From<redb::TransactionError> for CacheError {
    fn from(err: redb::TransactionError) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

impl From<redb::StorageError> for CacheError {
    fn from(err: redb::StorageError) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

impl From<redb::CommitError> for CacheError {
    fn from(err: redb::CommitError) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

pub struct CacheStore {
    db: Database,
    path: PathBuf,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore").field("path", &self.path).finish()
    }
}

impl CacheStore {
    /// Open or create the store in `cache_dir`.
    ///
    /// A store written with another format version is a
    /// [`CacheError::VersionMismatch`]; an unreadable file is
    /// [`CacheError::Corrupted`].
    pub fn open(cache_dir: &Path) -> Result<Self, CacheError> {
        std::fs::create_dir_all(cache_dir)?;
        let path = cache_dir.join(DATABASE_FILE);
        let db = Database::create(&path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(TRANSFORMS_TABLE)?;
            let _ = write_txn.open_table(METADATA_TABLE)?;
        }
        write_txn.commit()?;

        let store = Self { db, path };
        match store.get_metadata(FORMAT_VERSION_KEY)? {
            None => store.set_metadata(FORMAT_VERSION_KEY, &CACHE_FORMAT_VERSION.to_string())?,
            Some(found) => {
                let found: u32 = found
                    .parse()
                    .map_err(|_| CacheError::Corrupted(format!("bad format version '{found}'")))?;
                if found != CACHE_FORMAT_VERSION {
                    return Err(CacheError::VersionMismatch {
                        expected: CACHE_FORMAT_VERSION,
                        found,
                    });
                }
            }
        }
        Ok(store)
    }

    /// Open the store, discarding and recreating it when it cannot be used.
    ///
    /// The returned diagnostic describes why an existing store was dropped.
    pub fn open_or_recreate(cache_dir: &Path) -> Result<(Self, Option<Diagnostic>), CacheError> {
        match Self::open(cache_dir) {
            Ok(store) => Ok((store, None)),
            Err(
                err @ (CacheError::VersionMismatch { .. }
                | CacheError::Corrupted(_)
                | CacheError::DatabaseError(_)),
            ) => {
                let path = cache_dir.join(DATABASE_FILE);
                tracing::warn!(path = %path.display(), error = %err, "discarding unusable cache");
                if path.exists() {
                    std::fs::remove_file(&path)?;
                }
                let store = Self::open(cache_dir)?;
                let diagnostic = Diagnostic::warning(
                    DiagnosticKind::CacheCorruption,
                    format!("cache at {} was discarded: {err}", path.display()),
                )
                .with_help("the build continues without cached transforms");
                Ok((store, Some(diagnostic)))
            }
            Err(err) => Err(err),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Result<Option<CachedTransform>, CacheError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSFORMS_TABLE)?;
        let Some(value) = table.get(key)? else {
            return Ok(None);
        };
        let entry = bincode::deserialize(value.value())
            .map_err(|e| CacheError::DeserializationError(e.to_string()))?;
        Ok(Some(entry))
    }

    /// Store every entry in one transaction.
    pub fn put_many(&self, entries: &[CachedTransform]) -> Result<(), CacheError> {
        if entries.is_empty() {
            return Ok(());
        }
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TRANSFORMS_TABLE)?;
            for entry in entries {
                let bytes = bincode::serialize(entry)
                    .map_err(|e| CacheError::SerializationError(e.to_string()))?;
                table.insert(entry.module.to_string().as_str(), bytes.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), CacheError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TRANSFORMS_TABLE)?;
            table.remove(key)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Drop every entry whose key `keep` rejects. Returns how many went.
    pub fn retain(&self, mut keep: impl FnMut(&str) -> bool) -> Result<usize, CacheError> {
        let stale: Vec<String> = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(TRANSFORMS_TABLE)?;
            let mut stale = Vec::new();
            for item in table.iter()? {
                let (key, _) = item?;
                if !keep(key.value()) {
                    stale.push(key.value().to_string());
                }
            }
            stale
        };

        if stale.is_empty() {
            return Ok(0);
        }
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TRANSFORMS_TABLE)?;
            for key in &stale {
                table.remove(key.as_str())?;
            }
        }
        write_txn.commit()?;
        Ok(stale.len())
    }

    /// Every stored entry. An undecodable entry is [`CacheError::Corrupted`].
    pub fn load_all(&self) -> Result<Vec<CachedTransform>, CacheError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSFORMS_TABLE)?;
        let mut entries = Vec::new();
        for item in table.iter()? {
            let (key, value) = item?;
            let entry: CachedTransform = bincode::deserialize(value.value()).map_err(|e| {
                CacheError::Corrupted(format!("entry '{}' is unreadable: {e}", key.value()))
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }

    pub fn clear(&self) -> Result<(), CacheError> {
        let write_txn = self.db.begin_write()?;
        {
            write_txn.delete_table(TRANSFORMS_TABLE)?;
            let _ = write_txn.open_table(TRANSFORMS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn len(&self) -> Result<usize, CacheError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSFORMS_TABLE)?;
        Ok(table.iter()?.count())
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(METADATA_TABLE)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>, CacheError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(METADATA_TABLE)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }
}

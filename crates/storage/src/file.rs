//! FileStore: record store persisted as JSON
//!
//! All tables are kept in memory and mirrored to `records.json` inside the
//! data directory. Each mutating call writes the whole table set to a
//! temporary file, syncs it, and renames it over the previous file, so a
//! crash leaves either the old or the new state on disk. The in-memory
//! state only changes once the file write succeeded.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info};

use tether_core::{Error, Identity, Record, RecordStore, Result};

use crate::table::Tables;

/// Data file name inside the store directory
pub const DATA_FILE_NAME: &str = "records.json";

/// Durable record store backed by a JSON file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    tables: Mutex<Tables>,
}

impl FileStore {
    /// Open (or create) a store in `dir`
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` if the directory cannot be created or the
    /// data file cannot be read or parsed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| {
            Error::storage(format!("failed to create '{}': {}", dir.display(), e))
        })?;
        let path = dir.join(DATA_FILE_NAME);

        let tables = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                Error::storage(format!("failed to read '{}': {}", path.display(), e))
            })?;
            serde_json::from_str(&content).map_err(|e| {
                Error::storage(format!("failed to parse '{}': {}", path.display(), e))
            })?
        } else {
            Tables::default()
        };

        info!(target: "tether::store", path = ?path, "Opened file store");
        Ok(Self {
            path,
            tables: Mutex::new(tables),
        })
    }

    /// Path of the data file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `op` to a copy of the tables, persist the copy, then publish it
    fn mutate<T>(&self, op: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        let mut guard = self.tables.lock();
        let mut next = guard.clone();
        let out = op(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(out)
    }

    fn persist(&self, tables: &Tables) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        let write = || -> std::io::Result<()> {
            let bytes = serde_json::to_vec_pretty(tables)?;
            let mut file = File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|e| {
            Error::storage(format!("failed to write '{}': {}", self.path.display(), e))
        })
    }
}

impl RecordStore for FileStore {
    fn insert(&self, record: &Record) -> Result<Identity> {
        let identity = self.mutate(|t| Ok(t.insert(record)))?;
        debug!(target: "tether::store", table = record.table(), %identity, "insert");
        Ok(identity)
    }

    fn read(&self, table: &str, identity: Identity) -> Result<Record> {
        self.tables.lock().read(table, identity)
    }

    fn update(&self, identity: Identity, record: &Record) -> Result<()> {
        self.mutate(|t| t.update(identity, record))?;
        debug!(target: "tether::store", table = record.table(), %identity, "update");
        Ok(())
    }

    fn delete(&self, table: &str, identity: Identity) -> Result<()> {
        self.mutate(|t| t.delete(table, identity))?;
        debug!(target: "tether::store", table, %identity, "delete");
        Ok(())
    }

    fn len(&self, table: &str) -> Result<usize> {
        Ok(self.tables.lock().len(table))
    }
}

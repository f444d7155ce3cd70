//! MemoryStore: in-process record store
//!
//! Tables live in a `BTreeMap` behind a `parking_lot::RwLock`. Writers take
//! the write lock for the duration of one record operation; readers share
//! the read lock. Nothing survives the process.

use parking_lot::RwLock;
use tracing::debug;

use tether_core::{Identity, Record, RecordStore, Result};

use crate::table::Tables;

/// In-memory record store
///
/// Thread-safe through `parking_lot::RwLock`; share it with `Arc`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn insert(&self, record: &Record) -> Result<Identity> {
        let identity = self.tables.write().insert(record);
        debug!(target: "tether::store", table = record.table(), %identity, "insert");
        Ok(identity)
    }

    fn read(&self, table: &str, identity: Identity) -> Result<Record> {
        self.tables.read().read(table, identity)
    }

    fn update(&self, identity: Identity, record: &Record) -> Result<()> {
        self.tables.write().update(identity, record)?;
        debug!(target: "tether::store", table = record.table(), %identity, "update");
        Ok(())
    }

    fn delete(&self, table: &str, identity: Identity) -> Result<()> {
        self.tables.write().delete(table, identity)?;
        debug!(target: "tether::store", table, %identity, "delete");
        Ok(())
    }

    fn len(&self, table: &str) -> Result<usize> {
        Ok(self.tables.read().len(table))
    }
}

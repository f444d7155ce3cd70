//! Core trait for the record store abstraction
//!
//! The session layer talks to durable state only through this trait, so the
//! backing medium (memory, file, external database) can be swapped without
//! touching the identity map or transaction code.

use crate::error::Result;
use crate::record::Record;
use crate::types::Identity;

/// Durable table storage keyed by generated identity
///
/// Thread safety: All methods must be safe to call concurrently from
/// multiple threads (requires Send + Sync). Each call is atomic for the
/// single record it touches; there is no multi-record isolation here.
/// Transactions are layered above by the session.
pub trait RecordStore: Send + Sync {
    /// Insert a new row into `record.table()` and return its identity
    ///
    /// Identities are allocated per table starting at 1 and never reused.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` on a write fault.
    fn insert(&self, record: &Record) -> Result<Identity>;

    /// Read the row stored under `identity`
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no such row exists, `Error::Storage` on a
    /// read fault.
    fn read(&self, table: &str, identity: Identity) -> Result<Record>;

    /// Replace the row stored under `identity` with `record`
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no such row exists, `Error::Storage` on a
    /// write fault.
    fn update(&self, identity: Identity, record: &Record) -> Result<()>;

    /// Remove the row stored under `identity`
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no such row exists, `Error::Storage` on a
    /// write fault.
    fn delete(&self, table: &str, identity: Identity) -> Result<()>;

    /// Check whether a row exists
    fn contains(&self, table: &str, identity: Identity) -> Result<bool> {
        match self.read(table, identity) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Number of rows in `table`
    fn len(&self, table: &str) -> Result<usize>;

    /// True if `table` has no rows
    fn is_empty(&self, table: &str) -> Result<bool> {
        Ok(self.len(table)? == 0)
    }
}

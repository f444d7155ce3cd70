//! Storage layer for Tether
//!
//! This crate implements the `RecordStore` backends:
//! - MemoryStore: BTreeMap tables behind a `parking_lot::RwLock`
//! - FileStore: the same tables persisted as JSON in a data directory
//! - testing::FaultyStore: wrapper that injects storage faults
//!
//! Every call locks for exactly one record operation, which gives
//! per-record atomicity and nothing more.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod file;
pub mod memory;
pub mod testing;

mod table;

pub use file::FileStore;
pub use memory::MemoryStore;

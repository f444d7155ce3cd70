//! Session engine for Tether
//!
//! This crate layers unit-of-work semantics over a `RecordStore`:
//! - EntityRef: shared entity handle, possibly a lazy proxy
//! - IdentityMap: at most one handle per identity per session
//! - Transaction: write-behind buffer with commit/rollback
//! - Session: the persistence operations (save, persist, get, load, update,
//!   save_or_update, merge, delete, evict, clear)
//! - Database: explicit store owner that opens sessions, configured by `tether.toml`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod database;
pub mod entity_ref;
pub mod identity_map;
pub mod session;
pub mod transaction;

pub use database::{Backend, Database, TetherConfig, CONFIG_FILE_NAME};
pub use entity_ref::EntityRef;
pub use identity_map::{EntityKey, IdentityMap};
pub use session::Session;
pub use transaction::{ApplyResult, PendingWrites, Transaction, TransactionStats, TransactionStatus};

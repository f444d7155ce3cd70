//! Tether - identity-mapped sessions over a pluggable record store
//!
//! Tether maps entities onto records and gives each [`Session`] an identity
//! map, a write-behind [`Transaction`], and the classic persistence
//! operations: save, persist, get, load, update, save_or_update, merge,
//! delete, evict and clear.
//!
//! # Quick Start
//!
//! ```ignore
//! use tether::{Database, EntityRef, Person};
//!
//! let db = Database::ephemeral();
//! let mut session = db.session();
//!
//! let person = EntityRef::new(Person::new("John Doe", None));
//! let id = session.transaction(|s| s.save(&person))?;
//!
//! let fetched = session.get::<Person>(id)?.unwrap();
//! assert!(fetched.ptr_eq(&person));
//! ```

pub use tether_core::{Entity, Error, Identity, Person, Record, RecordStore, Result, Value};
pub use tether_engine::*;
pub use tether_storage::{FileStore, MemoryStore};

//! Testing utilities for storage fault handling
//!
//! - **Fault injection**: `FaultyStore` wraps any `RecordStore` and fails
//!   chosen operations with `Error::Storage`, so upper layers can exercise
//!   their error paths (failed commits, read faults) deterministically.
//!
//! # Example
//!
//! ```ignore
//! use tether_storage::{MemoryStore, testing::{FaultyStore, FaultPoint}};
//!
//! let store = FaultyStore::new(MemoryStore::new());
//! store.fail_next(FaultPoint::Insert, 1);
//! assert!(store.insert(&record).unwrap_err().is_storage());
//! ```

mod fault;

pub use fault::{FaultPoint, FaultyStore};

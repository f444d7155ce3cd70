//! Core types and traits for Tether
//!
//! This crate defines the foundational types used throughout the system:
//! - Identity: Generated key of a persisted entity (0 = transient)
//! - Value: Unified value enum for record fields
//! - Record: Durable row form of an entity
//! - Entity: Trait mapping a Rust type onto a table
//! - RecordStore: The four-operation storage contract
//! - Error: Error type hierarchy
//! - Person: The demonstration entity

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entity;
pub mod error;
pub mod person;
pub mod record;
pub mod traits;
pub mod types;
pub mod value;

pub use entity::Entity;
pub use error::{Error, Result};
pub use person::Person;
pub use record::Record;
pub use traits::RecordStore;
pub use types::{Identity, IdentitySequence};
pub use value::Value;

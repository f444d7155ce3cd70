//! Error types for Tether
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Expected read misses are not errors: `Session::get` reports them as `None`.
//! Everything here is a failure the caller has to react to.

use crate::types::Identity;
use std::io;
use thiserror::Error;

/// Result type alias for Tether operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Tether
#[derive(Debug, Error)]
pub enum Error {
    /// No record exists for the table/identity pair
    #[error("{table} with identity {identity} not found")]
    NotFound {
        /// Table that was searched
        table: String,
        /// Identity that was requested
        identity: Identity,
    },

    /// Write target is not attached to the session's identity map
    #[error("{table} with identity {identity} is not managed by this session")]
    NotManaged {
        /// Table of the entity
        table: String,
        /// Identity carried by the entity
        identity: Identity,
    },

    /// Operation requires a transaction state that does not hold
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Backing medium fault
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid operation on an entity (e.g. changing an assigned identity)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Invalid input (field constraints, configuration values)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Build a `NotFound` error
    pub fn not_found(table: impl Into<String>, identity: Identity) -> Self {
        Error::NotFound {
            table: table.into(),
            identity,
        }
    }

    /// Build a `NotManaged` error
    pub fn not_managed(table: impl Into<String>, identity: Identity) -> Self {
        Error::NotManaged {
            table: table.into(),
            identity,
        }
    }

    /// Build an `IllegalState` error
    pub fn illegal_state(msg: impl Into<String>) -> Self {
        Error::IllegalState(msg.into())
    }

    /// Build a `Storage` error
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    /// Build an `InvalidInput` error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Check for `NotFound`
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check for `NotManaged`
    pub fn is_not_managed(&self) -> bool {
        matches!(self, Error::NotManaged { .. })
    }

    /// Check for `IllegalState`
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Error::IllegalState(_))
    }

    /// Check for `Storage`
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

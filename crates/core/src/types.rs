//! Identity type
//!
//! Identities are generated by the record store on first insert and never
//! change afterwards. Zero is reserved for transient entities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generated identity of a persisted entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(u64);

impl Identity {
    /// Identity carried by entities that were never persisted
    pub const TRANSIENT: Identity = Identity(0);

    /// Wrap a raw identity value
    pub const fn new(raw: u64) -> Self {
        Identity(raw)
    }

    /// Raw numeric value
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// True when unset (zero)
    pub const fn is_transient(self) -> bool {
        self.0 == 0
    }

    /// The identity allocated after this one
    pub(crate) fn next(self) -> Self {
        Identity(self.0 + 1)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Identity {
    fn from(raw: u64) -> Self {
        Identity(raw)
    }
}

/// Per-table identity allocator
///
/// Hands out 1, 2, 3, ... and never reuses a value, even after deletes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentitySequence(Identity);

impl IdentitySequence {
    /// Sequence that has not allocated anything yet
    pub fn new() -> Self {
        IdentitySequence(Identity::TRANSIENT)
    }

    /// Allocate the next identity
    pub fn allocate(&mut self) -> Identity {
        self.0 = self.0.next();
        self.0
    }

    /// Last identity handed out (TRANSIENT if none)
    pub fn last(&self) -> Identity {
        self.0
    }
}

//! Per-session identity map
//!
//! Maps `(table, identity)` to the one in-memory handle the session tracks
//! for it. Entries are type-erased so one map can hold every entity type;
//! typed lookups downcast back to `EntityRef<E>`.
//!
//! Invariant: at most one handle per key. `lookup` returns a clone of that
//! handle (same underlying entity), never a copy of its fields.

use std::collections::HashMap;
use std::fmt;

use tether_core::{Entity, Error, Identity, Result};

use crate::entity_ref::{EntityRef, Tracked};

/// Identity map key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    /// Table (entity type)
    pub table: &'static str,
    /// Identity within the table
    pub identity: Identity,
}

impl EntityKey {
    /// Key for an entity type and identity
    pub fn of<E: Entity>(identity: Identity) -> Self {
        Self {
            table: E::TABLE,
            identity,
        }
    }

    pub(crate) fn for_tracked(t: &dyn Tracked) -> Self {
        Self {
            table: t.table(),
            identity: t.identity(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.table, self.identity)
    }
}

/// Identity map: key → tracked handle
#[derive(Default)]
pub struct IdentityMap {
    entries: HashMap<EntityKey, Box<dyn Tracked>>,
}

impl IdentityMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `entity` under its identity, replacing any previous entry
    ///
    /// # Errors
    ///
    /// `Error::IllegalState` if the entity is still transient.
    pub fn attach<E: Entity>(&mut self, entity: &EntityRef<E>) -> Result<()> {
        self.attach_tracked(Box::new(entity.clone()))
    }

    pub(crate) fn attach_tracked(&mut self, entity: Box<dyn Tracked>) -> Result<()> {
        let key = EntityKey::for_tracked(entity.as_ref());
        if key.identity.is_transient() {
            return Err(Error::illegal_state(format!(
                "cannot attach a transient {} to the identity map",
                key.table
            )));
        }
        self.entries.insert(key, entity);
        Ok(())
    }

    /// Handle tracked for `identity`, if any
    pub fn lookup<E: Entity>(&self, identity: Identity) -> Option<EntityRef<E>> {
        self.entries
            .get(&EntityKey::of::<E>(identity))
            .and_then(|t| t.as_any().downcast_ref::<EntityRef<E>>())
            .cloned()
    }

    /// True if `entity` is the very handle tracked for its identity
    pub fn contains<E: Entity>(&self, entity: &EntityRef<E>) -> bool {
        self.lookup::<E>(entity.identity())
            .map_or(false, |tracked| tracked.ptr_eq(entity))
    }

    pub(crate) fn contains_tracked(&self, entity: &dyn Tracked) -> bool {
        self.entries
            .get(&EntityKey::for_tracked(entity))
            .map_or(false, |tracked| tracked.same_ref(entity))
    }

    /// Remove the entry for `key`; the record store is not touched
    pub fn detach(&mut self, key: EntityKey) -> bool {
        self.entries.remove(&key).is_some()
    }

    /// Remove every entry, returning how many there were
    pub fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }

    /// Number of tracked entities
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tracked keys in sorted order
    pub fn keys(&self) -> Vec<EntityKey> {
        let mut keys: Vec<_> = self.entries.keys().copied().collect();
        keys.sort();
        keys
    }
}

impl fmt::Debug for IdentityMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityMap")
            .field("keys", &self.keys())
            .finish()
    }
}

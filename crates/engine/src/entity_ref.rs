//! Shared entity handles and lazy proxies
//!
//! An [`EntityRef`] is the in-memory representation the identity map tracks.
//! Clones share state: mutating through one clone is visible through every
//! other, which is how the session hands out "the same reference" for an
//! identity.
//!
//! A handle is either resolved (holds the entity) or an unresolved proxy
//! (holds only the identity and the store to read it from). Proxies resolve
//! on the first field access; if the record does not exist that access fails
//! with `Error::NotFound` and the proxy stays unresolved.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use tether_core::{Entity, Error, Identity, Record, RecordStore, Result};

enum Slot<E> {
    Unresolved {
        identity: Identity,
        source: Arc<dyn RecordStore>,
    },
    Resolved(E),
}

/// Shared handle to an entity, possibly a lazy proxy
pub struct EntityRef<E: Entity> {
    cell: Rc<RefCell<Slot<E>>>,
}

impl<E: Entity> EntityRef<E> {
    /// Wrap a caller-built entity (transient, or a detached copy)
    pub fn new(entity: E) -> Self {
        Self {
            cell: Rc::new(RefCell::new(Slot::Resolved(entity))),
        }
    }

    /// Identity-only placeholder that reads from `source` on first access
    pub(crate) fn proxy(identity: Identity, source: Arc<dyn RecordStore>) -> Self {
        Self {
            cell: Rc::new(RefCell::new(Slot::Unresolved { identity, source })),
        }
    }

    /// Identity; never triggers proxy resolution
    pub fn identity(&self) -> Identity {
        match &*self.cell.borrow() {
            Slot::Unresolved { identity, .. } => *identity,
            Slot::Resolved(e) => e.identity(),
        }
    }

    /// True once the fields are loaded
    pub fn is_resolved(&self) -> bool {
        matches!(&*self.cell.borrow(), Slot::Resolved(_))
    }

    /// True if both handles share the same underlying entity
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    /// Read fields through a closure, resolving a proxy first
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if this is a proxy whose record does not exist.
    pub fn read<R>(&self, f: impl FnOnce(&E) -> R) -> Result<R> {
        self.resolve()?;
        match &*self.cell.borrow() {
            Slot::Resolved(e) => Ok(f(e)),
            Slot::Unresolved { identity, .. } => Err(Error::not_found(E::TABLE, *identity)),
        }
    }

    /// Mutate fields through a closure, resolving a proxy first
    ///
    /// An assigned identity cannot be changed: if the closure does so the
    /// old identity is restored and `Error::InvalidOperation` is returned.
    /// Other field changes made by the closure are kept.
    pub fn write<R>(&self, f: impl FnOnce(&mut E) -> R) -> Result<R> {
        self.resolve()?;
        match &mut *self.cell.borrow_mut() {
            Slot::Resolved(e) => {
                let before = e.identity();
                let out = f(e);
                if !before.is_transient() && e.identity() != before {
                    e.set_identity(before);
                    return Err(Error::InvalidOperation(format!(
                        "identity of {} {} is immutable",
                        E::TABLE,
                        before
                    )));
                }
                Ok(out)
            }
            Slot::Unresolved { identity, .. } => Err(Error::not_found(E::TABLE, *identity)),
        }
    }

    /// Clone of the current field values
    pub fn get(&self) -> Result<E> {
        self.read(E::clone)
    }

    pub(crate) fn resolve(&self) -> Result<()> {
        let loaded = match &*self.cell.borrow() {
            Slot::Resolved(_) => return Ok(()),
            Slot::Unresolved { identity, source } => {
                let record = source.read(E::TABLE, *identity)?;
                E::from_record(*identity, &record)?
            }
        };
        *self.cell.borrow_mut() = Slot::Resolved(loaded);
        Ok(())
    }

    pub(crate) fn assign_identity(&self, identity: Identity) {
        match &mut *self.cell.borrow_mut() {
            Slot::Resolved(e) => e.set_identity(identity),
            Slot::Unresolved { identity: id, .. } => *id = identity,
        }
    }
}

impl<E: Entity> Clone for EntityRef<E> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<E: Entity> From<E> for EntityRef<E> {
    fn from(entity: E) -> Self {
        Self::new(entity)
    }
}

impl<E: Entity + fmt::Debug> fmt::Debug for EntityRef<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.cell.borrow() {
            Slot::Resolved(e) => f.debug_tuple("EntityRef").field(e).finish(),
            Slot::Unresolved { identity, .. } => f
                .debug_struct("EntityRef")
                .field("table", &E::TABLE)
                .field("proxy", identity)
                .finish(),
        }
    }
}

/// Type-erased view of an `EntityRef`, held by the identity map and the
/// transaction write buffer
pub(crate) trait Tracked {
    fn table(&self) -> &'static str;
    fn identity(&self) -> Identity;
    fn validate(&self) -> Result<()>;
    fn record(&self) -> Result<Record>;
    fn assign_identity(&self, identity: Identity);
    fn as_any(&self) -> &dyn Any;
    fn same_ref(&self, other: &dyn Tracked) -> bool;
}

impl<E: Entity> Tracked for EntityRef<E> {
    fn table(&self) -> &'static str {
        E::TABLE
    }

    fn identity(&self) -> Identity {
        EntityRef::identity(self)
    }

    fn validate(&self) -> Result<()> {
        self.read(|e| e.validate())?
    }

    fn record(&self) -> Result<Record> {
        self.read(|e| e.to_record())
    }

    fn assign_identity(&self, identity: Identity) {
        EntityRef::assign_identity(self, identity);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn same_ref(&self, other: &dyn Tracked) -> bool {
        other
            .as_any()
            .downcast_ref::<EntityRef<E>>()
            .map_or(false, |o| self.ptr_eq(o))
    }
}

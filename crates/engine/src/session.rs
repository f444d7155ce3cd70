//! Session: identity-mapped access to a record store
//!
//! The [`Session`] owns an identity map and at most one active
//! [`Transaction`]. It exposes the persistence operations whose semantics
//! differ in small but observable ways:
//!
//! | Operation | Write timing | Identity assigned | Attaches argument |
//! |-----------|--------------|-------------------|-------------------|
//! | `save` | immediate | at call | yes |
//! | `persist` | commit | at commit | yes (at commit) |
//! | `update` | commit | already set | must already be attached |
//! | `save_or_update` | as `save` / `update` | | |
//! | `merge` | commit (or immediate when new) | | no, returns the managed handle |
//! | `delete` | commit | unchanged | detached at commit |
//!
//! `get` and `load` differ on misses: `get` returns `None`, `load` returns a
//! proxy that fails with `NotFound` on first field access. `evict` and
//! `clear` only touch the identity map, never the store.
//!
//! # Usage
//!
//! ```ignore
//! let db = Database::ephemeral();
//! let mut session = db.session();
//!
//! let person = EntityRef::new(Person::new("John Doe", None));
//! session.begin()?;
//! let id = session.save(&person)?;
//! session.commit()?;
//!
//! let fetched = session.get::<Person>(id)?.unwrap();
//! assert!(fetched.ptr_eq(&person));
//! ```
//!
//! A session is single-threaded. Dropping a session with an active
//! transaction rolls it back.

use std::sync::Arc;

use tether_core::{Entity, Error, Identity, RecordStore, Result};
use tracing::{debug, info, warn};

use crate::entity_ref::EntityRef;
use crate::identity_map::{EntityKey, IdentityMap};
use crate::transaction::{
    ApplyResult, PendingWrites, Transaction, TransactionStats, TransactionStatus, WriteKind,
    WriteOp,
};

/// Identity-mapped unit-of-work over a record store
pub struct Session {
    store: Arc<dyn RecordStore>,
    identity_map: IdentityMap,
    active: Option<Transaction>,
    last_status: Option<TransactionStatus>,
    next_txn_id: u64,
    stats: TransactionStats,
    closed: bool,
}

impl Session {
    /// Open a session over `store`
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        debug!(target: "tether::session", "Session opened");
        Self {
            store,
            identity_map: IdentityMap::new(),
            active: None,
            last_status: None,
            next_txn_id: 1,
            stats: TransactionStats::default(),
            closed: false,
        }
    }

    /// The backing record store
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    // =========================================================================
    // Transaction lifecycle
    // =========================================================================

    /// Begin a transaction
    ///
    /// # Errors
    ///
    /// `Error::IllegalState` if a transaction is already active.
    pub fn begin(&mut self) -> Result<u64> {
        if let Some(txn) = &self.active {
            return Err(Error::illegal_state(format!(
                "transaction {} is already active",
                txn.id()
            )));
        }
        let id = self.next_txn_id;
        self.next_txn_id += 1;
        self.active = Some(Transaction::begin(id));
        self.last_status = Some(TransactionStatus::Active);
        self.stats.started += 1;
        Ok(id)
    }

    /// Commit the active transaction
    ///
    /// On failure the transaction is `RolledBack`; start a new one to retry.
    ///
    /// # Errors
    ///
    /// `Error::IllegalState` if no transaction is active, otherwise the
    /// validation or storage error that aborted the commit.
    pub fn commit(&mut self) -> Result<ApplyResult> {
        let mut txn = self.take_active("commit")?;
        let result = txn.commit(self.store.as_ref(), &mut self.identity_map);
        self.finish(&txn);
        result
    }

    /// Roll back the active transaction, returning the number of discarded writes
    ///
    /// Immediate writes made by `save` are not undone.
    pub fn rollback(&mut self) -> Result<usize> {
        let mut txn = self.take_active("rollback")?;
        let discarded = txn.rollback();
        self.finish(&txn);
        discarded
    }

    /// Run `f` inside a transaction: commit on `Ok`, roll back on `Err`
    pub fn transaction<T>(&mut self, f: impl FnOnce(&mut Session) -> Result<T>) -> Result<T> {
        self.begin()?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(e) => {
                if self.in_transaction() {
                    if let Err(rb) = self.rollback() {
                        warn!(target: "tether::txn", error = %rb, "Rollback after error failed");
                    }
                }
                Err(e)
            }
        }
    }

    /// True while a transaction is active
    pub fn in_transaction(&self) -> bool {
        self.active.is_some()
    }

    /// Status of the active transaction, or of the last one that finished
    pub fn transaction_status(&self) -> Option<TransactionStatus> {
        self.last_status
    }

    /// Writes buffered in the active transaction
    pub fn pending(&self) -> PendingWrites {
        self.active
            .as_ref()
            .map_or_else(PendingWrites::default, Transaction::pending)
    }

    /// Transaction counters for this session
    pub fn stats(&self) -> TransactionStats {
        self.stats
    }

    /// Close the session, rolling back an active transaction
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn take_active(&mut self, op: &str) -> Result<Transaction> {
        self.active
            .take()
            .ok_or_else(|| Error::illegal_state(format!("{} requires an active transaction", op)))
    }

    fn active_mut(&mut self, op: &str) -> Result<&mut Transaction> {
        self.active
            .as_mut()
            .ok_or_else(|| Error::illegal_state(format!("{} requires an active transaction", op)))
    }

    fn finish(&mut self, txn: &Transaction) {
        let status = txn.status();
        match status {
            TransactionStatus::Committed => self.stats.committed += 1,
            TransactionStatus::RolledBack => self.stats.rolled_back += 1,
            TransactionStatus::Active => {}
        }
        self.last_status = Some(status);
    }

    fn release(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.active.is_some() {
            warn!(target: "tether::session", "Closing session with an active transaction; rolling back");
            self.rollback()?;
        }
        debug!(target: "tether::session", "Session closed");
        Ok(())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert a transient entity immediately and attach it
    ///
    /// The insert reaches the store before this returns; rolling back the
    /// enclosing transaction does not remove it.
    ///
    /// # Errors
    ///
    /// - `Error::IllegalState` without an active transaction
    /// - `Error::InvalidOperation` if the entity already has an identity
    /// - `Error::InvalidInput` if field constraints fail
    /// - `Error::Storage` on a write fault
    pub fn save<E: Entity>(&mut self, entity: &EntityRef<E>) -> Result<Identity> {
        debug!(target: "tether::session", table = E::TABLE, "save");
        self.active_mut("save")?;
        if !entity.identity().is_transient() {
            return Err(Error::InvalidOperation(format!(
                "save requires a transient {}, got identity {}",
                E::TABLE,
                entity.identity()
            )));
        }
        entity.read(|e| e.validate())??;
        let record = entity.read(|e| e.to_record())?;

        let identity = self.store.insert(&record)?;
        entity.assign_identity(identity);
        self.identity_map.attach(entity)?;

        // A pending persist of the same handle would insert it twice
        if let Some(txn) = self.active.as_mut() {
            txn.discard_for(entity);
        }
        Ok(identity)
    }

    /// Schedule a transient entity for insert at commit
    ///
    /// The identity stays unset until the commit succeeds. Persisting an
    /// entity that is already attached, or already scheduled, is a no-op.
    ///
    /// # Errors
    ///
    /// - `Error::IllegalState` without an active transaction
    /// - `Error::InvalidOperation` for a detached entity (identity set, not attached)
    pub fn persist<E: Entity>(&mut self, entity: &EntityRef<E>) -> Result<()> {
        debug!(target: "tether::session", table = E::TABLE, "persist");
        self.active_mut("persist")?;
        if !entity.identity().is_transient() {
            if self.identity_map.contains(entity) {
                return Ok(());
            }
            return Err(Error::InvalidOperation(format!(
                "detached {} {} passed to persist",
                E::TABLE,
                entity.identity()
            )));
        }
        let txn = self.active_mut("persist")?;
        txn.schedule(WriteOp::new(WriteKind::Insert, Box::new(entity.clone())))
    }

    /// Schedule an update of all fields of an attached entity
    ///
    /// # Errors
    ///
    /// - `Error::IllegalState` without an active transaction
    /// - `Error::NotManaged` if the entity is transient or not attached
    /// - `Error::InvalidOperation` if a delete of the entity is already buffered
    pub fn update<E: Entity>(&mut self, entity: &EntityRef<E>) -> Result<()> {
        debug!(target: "tether::session", table = E::TABLE, identity = %entity.identity(), "update");
        self.active_mut("update")?;
        self.ensure_managed(entity)?;
        self.ensure_not_deleted(entity, "update")?;
        let txn = self.active_mut("update")?;
        txn.schedule(WriteOp::new(WriteKind::Update, Box::new(entity.clone())))
    }

    /// `save` for transient entities, `update` otherwise
    pub fn save_or_update<E: Entity>(&mut self, entity: &EntityRef<E>) -> Result<()> {
        if entity.identity().is_transient() {
            self.save(entity).map(|_| ())
        } else {
            self.update(entity)
        }
    }

    /// Copy a detached entity's state into the session
    ///
    /// Without an identity the argument is saved and returned. With an
    /// identity, the managed handle for it is fetched (read from the store if
    /// needed), every field of `detached` is copied onto it, an update is
    /// scheduled, and the managed handle is returned. The argument itself is
    /// never attached.
    ///
    /// # Errors
    ///
    /// - `Error::IllegalState` without an active transaction
    /// - `Error::NotFound` if no record exists for the argument's identity
    /// - `Error::InvalidOperation` if a delete of the managed entity is already buffered
    pub fn merge<E: Entity>(&mut self, detached: &EntityRef<E>) -> Result<EntityRef<E>> {
        debug!(target: "tether::session", table = E::TABLE, identity = %detached.identity(), "merge");
        self.active_mut("merge")?;

        let identity = detached.identity();
        if identity.is_transient() {
            self.save(detached)?;
            return Ok(detached.clone());
        }

        let managed = self
            .get::<E>(identity)?
            .ok_or_else(|| Error::not_found(E::TABLE, identity))?;
        self.ensure_not_deleted(&managed, "merge")?;
        if !managed.ptr_eq(detached) {
            let state = detached.get()?;
            managed.write(|m| m.copy_fields_from(&state))??;
        }
        let txn = self.active_mut("merge")?;
        txn.schedule(WriteOp::new(WriteKind::Update, Box::new(managed.clone())))?;
        Ok(managed)
    }

    /// Schedule an attached entity for delete at commit
    ///
    /// The entity is detached once the commit succeeds. Its identity value
    /// stays readable on the handle.
    ///
    /// # Errors
    ///
    /// - `Error::IllegalState` without an active transaction
    /// - `Error::NotManaged` if the entity is transient or not attached
    pub fn delete<E: Entity>(&mut self, entity: &EntityRef<E>) -> Result<()> {
        debug!(target: "tether::session", table = E::TABLE, identity = %entity.identity(), "delete");
        self.active_mut("delete")?;
        self.ensure_managed(entity)?;
        let txn = self.active_mut("delete")?;
        txn.schedule(WriteOp::new(WriteKind::Delete, Box::new(entity.clone())))
    }

    /// A handle with a buffered delete accepts no further writes in this transaction
    fn ensure_not_deleted<E: Entity>(&self, entity: &EntityRef<E>, op: &str) -> Result<()> {
        let deleting = self
            .active
            .as_ref()
            .is_some_and(|txn| txn.is_scheduled(WriteKind::Delete, entity));
        if deleting {
            return Err(Error::InvalidOperation(format!(
                "deleted {} {} passed to {}",
                E::TABLE,
                entity.identity(),
                op
            )));
        }
        Ok(())
    }

    fn ensure_managed<E: Entity>(&self, entity: &EntityRef<E>) -> Result<()> {
        let identity = entity.identity();
        if identity.is_transient() || !self.identity_map.contains(entity) {
            return Err(Error::not_managed(E::TABLE, identity));
        }
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Fetch the entity with `identity`, or `None` if no record exists
    ///
    /// Returns the attached handle when there is one (resolving it if it is
    /// a proxy); otherwise reads the store and attaches the result.
    ///
    /// # Errors
    ///
    /// Only genuine faults (`Error::Storage`, decoding errors). A miss is `Ok(None)`.
    pub fn get<E: Entity>(&mut self, identity: Identity) -> Result<Option<EntityRef<E>>> {
        debug!(target: "tether::session", table = E::TABLE, %identity, "get");
        if identity.is_transient() {
            return Ok(None);
        }

        if let Some(tracked) = self.identity_map.lookup::<E>(identity) {
            return match tracked.resolve() {
                Ok(()) => Ok(Some(tracked)),
                Err(e) if e.is_not_found() => Ok(None),
                Err(e) => Err(e),
            };
        }

        let record = match self.store.read(E::TABLE, identity) {
            Ok(record) => record,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        let entity = EntityRef::new(E::from_record(identity, &record)?);
        self.identity_map.attach(&entity)?;
        Ok(Some(entity))
    }

    /// Handle for `identity` without touching the store
    ///
    /// Returns the attached handle when there is one; otherwise attaches and
    /// returns an unresolved proxy. Field access on a proxy whose record does
    /// not exist fails with `Error::NotFound`.
    pub fn load<E: Entity>(&mut self, identity: Identity) -> EntityRef<E> {
        debug!(target: "tether::session", table = E::TABLE, %identity, "load");
        if let Some(tracked) = self.identity_map.lookup::<E>(identity) {
            return tracked;
        }
        let proxy = EntityRef::proxy(identity, Arc::clone(&self.store));
        if !identity.is_transient() {
            if let Err(e) = self.identity_map.attach(&proxy) {
                warn!(target: "tether::session", table = E::TABLE, %identity, error = %e, "Proxy not attached");
            }
        }
        proxy
    }

    // =========================================================================
    // Identity map maintenance
    // =========================================================================

    /// Detach one entity; the store is untouched
    ///
    /// Buffered writes for the entity in the active transaction are dropped.
    /// Evicting an entity that is not attached is a no-op.
    pub fn evict<E: Entity>(&mut self, entity: &EntityRef<E>) {
        let mut dropped = 0;
        if let Some(txn) = self.active.as_mut() {
            dropped = txn.discard_for(entity);
        }
        let detached = self.identity_map.contains(entity)
            && self
                .identity_map
                .detach(EntityKey::of::<E>(entity.identity()));
        info!(
            target: "tether::session",
            table = E::TABLE,
            identity = %entity.identity(),
            detached,
            dropped_writes = dropped,
            "evict"
        );
    }

    /// Detach every entity; the store is untouched
    ///
    /// Buffered writes in the active transaction are dropped. Handles held by
    /// the caller become detached: `update` and `delete` on them fail with
    /// `Error::NotManaged` until they are merged back.
    pub fn clear(&mut self) {
        let dropped = self.active.as_mut().map_or(0, Transaction::discard_all);
        let detached = self.identity_map.clear();
        info!(target: "tether::session", detached, dropped_writes = dropped, "clear");
    }

    /// True if `entity` is the attached handle for its identity
    pub fn contains<E: Entity>(&self, entity: &EntityRef<E>) -> bool {
        self.identity_map.contains(entity)
    }

    /// Number of attached entities
    pub fn managed_count(&self) -> usize {
        self.identity_map.len()
    }

    /// Keys of the attached entities
    pub fn managed_keys(&self) -> Vec<EntityKey> {
        self.identity_map.keys()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(target: "tether::session", error = %e, "Session release failed");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity_map", &self.identity_map)
            .field("active", &self.active)
            .field("stats", &self.stats)
            .finish()
    }
}

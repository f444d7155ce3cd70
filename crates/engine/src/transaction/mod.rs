//! Transaction: a unit of work over one session
//!
//! State transitions:
//! - `Active` → `Committed` (all buffered writes applied)
//! - `Active` → `RolledBack` (explicit rollback, failed commit, or session close)
//!
//! Both terminal states are final. A transaction buffers the inserts,
//! updates and deletes scheduled by `persist`, `update`, `saveOrUpdate`,
//! `merge` and `delete`; `save` bypasses the buffer and writes immediately.
//!
//! # Commit protocol
//!
//! 1. Validate every buffered write (field constraints, proxy resolution)
//! 2. Apply the writes to the record store in the order they were scheduled
//! 3. Reflect applied writes in the identity map (attach inserts, detach deletes)
//!
//! Validation runs before the first write is applied, so a constraint
//! violation never leaves a partially applied commit. A storage fault in
//! step 2 does not undo writes already applied; the transaction still ends
//! `RolledBack`.

mod write;

pub use write::{ApplyResult, PendingWrites};
pub(crate) use write::{WriteKind, WriteOp};

use std::fmt;

use tether_core::{Error, RecordStore, Result};
use tracing::{debug, info, warn};

use crate::entity_ref::Tracked;
use crate::identity_map::{EntityKey, IdentityMap};

/// Status of a transaction in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Open; writes may be scheduled
    Active,
    /// All buffered writes were applied
    Committed,
    /// Buffered writes were discarded
    RolledBack,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Active => "active",
            TransactionStatus::Committed => "committed",
            TransactionStatus::RolledBack => "rolled back",
        };
        f.write_str(s)
    }
}

/// Per-session transaction counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionStats {
    /// Transactions begun
    pub started: u64,
    /// Transactions committed
    pub committed: u64,
    /// Transactions rolled back (explicitly, by failed commit, or on close)
    pub rolled_back: u64,
}

/// A unit of work with a write-behind buffer
pub struct Transaction {
    id: u64,
    status: TransactionStatus,
    writes: Vec<WriteOp>,
}

impl Transaction {
    pub(crate) fn begin(id: u64) -> Self {
        debug!(target: "tether::txn", txn_id = id, "Transaction started");
        Self {
            id,
            status: TransactionStatus::Active,
            writes: Vec::new(),
        }
    }

    /// Session-local transaction id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current status
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// True while writes may be scheduled
    pub fn is_active(&self) -> bool {
        self.status == TransactionStatus::Active
    }

    /// Counts of buffered writes by kind
    pub fn pending(&self) -> PendingWrites {
        PendingWrites::count(&self.writes)
    }

    /// Buffer a write. Repeated scheduling of the same kind for the same
    /// handle is collapsed into the first one.
    pub(crate) fn schedule(&mut self, op: WriteOp) -> Result<()> {
        self.ensure_active()?;
        if self.is_scheduled(op.kind, op.target.as_ref()) {
            return Ok(());
        }
        debug!(
            target: "tether::txn",
            txn_id = self.id,
            kind = ?op.kind,
            table = op.target.table(),
            "Write scheduled"
        );
        self.writes.push(op);
        Ok(())
    }

    pub(crate) fn is_scheduled(&self, kind: WriteKind, target: &dyn Tracked) -> bool {
        self.writes
            .iter()
            .any(|w| w.kind == kind && w.target.same_ref(target))
    }

    /// Drop every buffered write for `target`, returning how many were dropped
    pub(crate) fn discard_for(&mut self, target: &dyn Tracked) -> usize {
        let before = self.writes.len();
        self.writes.retain(|w| !w.target.same_ref(target));
        before - self.writes.len()
    }

    /// Drop every buffered write
    pub(crate) fn discard_all(&mut self) -> usize {
        let n = self.writes.len();
        self.writes.clear();
        n
    }

    /// Validate, apply, and finish the transaction
    ///
    /// On error the status is `RolledBack` and the remaining buffered
    /// writes are discarded.
    pub(crate) fn commit(
        &mut self,
        store: &dyn RecordStore,
        map: &mut IdentityMap,
    ) -> Result<ApplyResult> {
        self.ensure_active()?;
        let writes = std::mem::take(&mut self.writes);

        match Self::validate(&writes).and_then(|_| Self::apply(writes, store, map)) {
            Ok(result) => {
                self.status = TransactionStatus::Committed;
                info!(
                    target: "tether::txn",
                    txn_id = self.id,
                    inserts = result.inserts,
                    updates = result.updates,
                    deletes = result.deletes,
                    "Transaction committed"
                );
                Ok(result)
            }
            Err(e) => {
                self.status = TransactionStatus::RolledBack;
                warn!(target: "tether::txn", txn_id = self.id, error = %e, "Transaction aborted");
                Err(e)
            }
        }
    }

    /// Discard buffered writes without touching the store
    pub(crate) fn rollback(&mut self) -> Result<usize> {
        self.ensure_active()?;
        let discarded = self.discard_all();
        self.status = TransactionStatus::RolledBack;
        warn!(
            target: "tether::txn",
            txn_id = self.id,
            discarded,
            "Transaction rolled back"
        );
        Ok(discarded)
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::illegal_state(format!(
                "transaction {} is {}",
                self.id, self.status
            )))
        }
    }

    fn validate(writes: &[WriteOp]) -> Result<()> {
        for (i, w) in writes.iter().enumerate() {
            match w.kind {
                WriteKind::Insert | WriteKind::Update => {
                    let deleted_earlier = writes[..i]
                        .iter()
                        .any(|d| d.kind == WriteKind::Delete && d.target.same_ref(w.target.as_ref()));
                    if deleted_earlier {
                        return Err(Error::InvalidOperation(format!(
                            "{} {} is written after its delete",
                            w.target.table(),
                            w.target.identity()
                        )));
                    }
                    w.target.validate()?
                }
                WriteKind::Delete => {
                    if w.target.identity().is_transient() {
                        return Err(Error::illegal_state(format!(
                            "cannot delete a transient {}",
                            w.target.table()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn apply(
        writes: Vec<WriteOp>,
        store: &dyn RecordStore,
        map: &mut IdentityMap,
    ) -> Result<ApplyResult> {
        let mut result = ApplyResult::default();
        for w in writes {
            let target = w.target;
            match w.kind {
                WriteKind::Insert => {
                    let identity = store.insert(&target.record()?)?;
                    target.assign_identity(identity);
                    map.attach_tracked(target)?;
                    result.inserts += 1;
                }
                WriteKind::Update => {
                    store.update(target.identity(), &target.record()?)?;
                    result.updates += 1;
                }
                WriteKind::Delete => {
                    store.delete(target.table(), target.identity())?;
                    if map.contains_tracked(target.as_ref()) {
                        map.detach(EntityKey::for_tracked(target.as_ref()));
                    }
                    result.deletes += 1;
                }
            }
        }
        Ok(result)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("pending", &self.pending())
            .finish()
    }
}

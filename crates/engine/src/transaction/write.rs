//! Buffered writes and commit summaries

use crate::entity_ref::Tracked;

/// Kind of buffered write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteKind {
    Insert,
    Update,
    Delete,
}

/// A write scheduled for commit time
///
/// The target handle is captured, not its fields: the record is built when
/// the write is applied, so changes made after scheduling are persisted.
pub(crate) struct WriteOp {
    pub(crate) kind: WriteKind,
    pub(crate) target: Box<dyn Tracked>,
}

impl WriteOp {
    pub(crate) fn new(kind: WriteKind, target: Box<dyn Tracked>) -> Self {
        Self { kind, target }
    }
}

/// Summary of writes buffered in an active transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingWrites {
    /// Buffered inserts (from persist / merge of new entities)
    pub inserts: usize,
    /// Buffered updates
    pub updates: usize,
    /// Buffered deletes
    pub deletes: usize,
}

impl PendingWrites {
    pub(crate) fn count(writes: &[WriteOp]) -> Self {
        writes.iter().fold(Self::default(), |mut acc, w| {
            match w.kind {
                WriteKind::Insert => acc.inserts += 1,
                WriteKind::Update => acc.updates += 1,
                WriteKind::Delete => acc.deletes += 1,
            }
            acc
        })
    }

    /// Total number of buffered writes
    pub fn total(&self) -> usize {
        self.inserts + self.updates + self.deletes
    }

    /// True if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Result of applying a transaction's buffered writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyResult {
    /// Inserts applied
    pub inserts: usize,
    /// Updates applied
    pub updates: usize,
    /// Deletes applied
    pub deletes: usize,
}

impl ApplyResult {
    /// Total number of writes applied
    pub fn total(&self) -> usize {
        self.inserts + self.updates + self.deletes
    }
}

//! Fault-injecting record store wrapper

use std::sync::atomic::{AtomicUsize, Ordering};

use tether_core::{Error, Identity, Record, RecordStore, Result};

/// Operation at which a fault can be injected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// `RecordStore::insert`
    Insert,
    /// `RecordStore::read`
    Read,
    /// `RecordStore::update`
    Update,
    /// `RecordStore::delete`
    Delete,
}

impl FaultPoint {
    fn index(self) -> usize {
        match self {
            FaultPoint::Insert => 0,
            FaultPoint::Read => 1,
            FaultPoint::Update => 2,
            FaultPoint::Delete => 3,
        }
    }
}

/// Record store that fails the next N calls at a fault point
///
/// Calls that are not armed pass straight through to the inner store.
#[derive(Debug)]
pub struct FaultyStore<S> {
    inner: S,
    armed: [AtomicUsize; 4],
    calls: [AtomicUsize; 4],
}

impl<S: RecordStore> FaultyStore<S> {
    /// Wrap a store with no faults armed
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            armed: Default::default(),
            calls: Default::default(),
        }
    }

    /// Fail the next `count` calls at `point`
    pub fn fail_next(&self, point: FaultPoint, count: usize) {
        self.armed[point.index()].store(count, Ordering::SeqCst);
    }

    /// Disarm every fault point
    pub fn heal(&self) {
        for slot in &self.armed {
            slot.store(0, Ordering::SeqCst);
        }
    }

    /// Number of calls that reached `point` (including failed ones)
    pub fn calls(&self, point: FaultPoint) -> usize {
        self.calls[point.index()].load(Ordering::SeqCst)
    }

    /// The wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check(&self, point: FaultPoint) -> Result<()> {
        let i = point.index();
        self.calls[i].fetch_add(1, Ordering::SeqCst);
        let tripped = self.armed[i]
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            Err(Error::storage(format!("injected {:?} fault", point)))
        } else {
            Ok(())
        }
    }
}

impl<S: RecordStore> RecordStore for FaultyStore<S> {
    fn insert(&self, record: &Record) -> Result<Identity> {
        self.check(FaultPoint::Insert)?;
        self.inner.insert(record)
    }

    fn read(&self, table: &str, identity: Identity) -> Result<Record> {
        self.check(FaultPoint::Read)?;
        self.inner.read(table, identity)
    }

    fn update(&self, identity: Identity, record: &Record) -> Result<()> {
        self.check(FaultPoint::Update)?;
        self.inner.update(identity, record)
    }

    fn delete(&self, table: &str, identity: Identity) -> Result<()> {
        self.check(FaultPoint::Delete)?;
        self.inner.delete(table, identity)
    }

    fn len(&self, table: &str) -> Result<usize> {
        self.inner.len(table)
    }
}

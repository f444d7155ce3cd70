//! Shared test utilities for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::Arc;

use chrono::NaiveDate;
pub use tether::{
    Database, Entity, EntityRef, Error, Identity, Person, Record, RecordStore, Session,
    TetherConfig, TransactionStatus,
};
use tempfile::TempDir;

// ============================================================================
// TestDb - database plus the directory that backs it
// ============================================================================

/// Test database wrapper; keeps the temp directory alive for file stores.
pub struct TestDb {
    pub db: Database,
    pub dir: Option<TempDir>,
}

impl TestDb {
    /// In-memory database.
    pub fn ephemeral() -> Self {
        TestDb {
            db: Database::ephemeral(),
            dir: None,
        }
    }

    /// File-backed database in a fresh temp directory.
    pub fn persistent() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let db = Database::open(dir.path()).expect("open file db");
        TestDb { db, dir: Some(dir) }
    }

    /// Drop the current handle and reopen the same directory.
    pub fn reopen(&mut self) {
        let dir = self.dir.as_ref().expect("reopen needs a file db");
        self.db = Database::open(dir.path()).expect("reopen file db");
    }

    pub fn session(&self) -> Session {
        self.db.session()
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        self.db.store()
    }

    pub fn rows(&self) -> usize {
        self.store().len(Person::TABLE).expect("row count")
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn dob() -> NaiveDate {
    NaiveDate::from_ymd_opt(1990, 1, 15).expect("valid date")
}

pub fn person(name: &str) -> EntityRef<Person> {
    EntityRef::new(Person::new(name, Some(dob())))
}

pub fn name_of(p: &EntityRef<Person>) -> String {
    p.read(|p| p.name().to_string()).expect("resolvable person")
}

/// Run both backends through the same test body.
pub fn for_each_backend(f: impl Fn(TestDb)) {
    f(TestDb::ephemeral());
    f(TestDb::persistent());
}

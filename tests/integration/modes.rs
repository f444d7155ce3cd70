//! Backend Mode Tests
//!
//! Tests behavior across the in-memory and file-backed stores, and how a
//! `tether.toml` selects between them.

use crate::common::*;
use tempfile::TempDir;

// ============================================================================
// Both Backends
// ============================================================================

#[test]
fn save_then_get_on_every_backend() {
    for_each_backend(|t| {
        let mut s = t.session();
        let p = person("John Doe");
        let id = s.transaction(|s| s.save(&p)).unwrap();
        assert_eq!(id, Identity::new(1));

        let fetched = s.get::<Person>(id).unwrap().unwrap();
        assert!(fetched.ptr_eq(&p));
        assert_eq!(t.rows(), 1);
    });
}

#[test]
fn rolled_back_persist_leaves_no_row_on_every_backend() {
    for_each_backend(|t| {
        let mut s = t.session();
        let p = person("Jane Doe");
        s.begin().unwrap();
        s.persist(&p).unwrap();
        s.rollback().unwrap();
        assert!(p.identity().is_transient());
        assert_eq!(t.rows(), 0);
    });
}

// ============================================================================
// Persistent Mode
// ============================================================================

#[test]
fn committed_writes_survive_reopen() {
    let mut t = TestDb::persistent();
    let (kept, gone) = {
        let mut s = t.session();
        let kept = person("Kept");
        let gone = person("Gone");
        s.transaction(|s| {
            s.persist(&kept)?;
            s.save(&gone)?;
            Ok(())
        })
        .unwrap();
        s.transaction(|s| s.delete(&gone)).unwrap();
        (kept.identity(), gone.identity())
    };

    t.reopen();
    let mut s = t.session();
    assert_eq!(name_of(&s.get::<Person>(kept).unwrap().unwrap()), "Kept");
    assert!(s.get::<Person>(gone).unwrap().is_none());
}

#[test]
fn identities_are_not_reused_across_reopen() {
    let mut t = TestDb::persistent();
    let first = {
        let mut s = t.session();
        let p = person("a");
        s.transaction(|s| s.save(&p)).unwrap();
        s.transaction(|s| s.delete(&p)).unwrap();
        p.identity()
    };

    t.reopen();
    let mut s = t.session();
    let second = s.transaction(|s| s.save(&person("b"))).unwrap();
    assert!(second.as_u64() > first.as_u64());
}

// ============================================================================
// Config Selection
// ============================================================================

#[test]
fn config_file_selects_file_backend() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join(tether::CONFIG_FILE_NAME);
    TetherConfig::file(dir.path().join("data"))
        .write_to_file(&config_path)
        .unwrap();

    let config = TetherConfig::from_file(&config_path).unwrap();
    let db = Database::from_config(&config).unwrap();
    let mut s = db.session();
    s.transaction(|s| s.save(&person("a"))).unwrap();

    assert!(dir.path().join("data").exists());
    assert_eq!(db.data_dir(), Some(dir.path().join("data").as_path()));
}

#[test]
fn default_config_stores_records_beside_it() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(tether::CONFIG_FILE_NAME);
    TetherConfig::write_default_if_missing(&path).unwrap();

    let db = Database::from_config_file(&path).unwrap();
    assert_eq!(db.data_dir(), Some(dir.path()));
    db.session()
        .transaction(|s| s.save(&person("a")))
        .unwrap();
    assert!(dir.path().join("records.json").exists());
}

#[test]
fn memory_config_in_database_dir_is_ephemeral() {
    let dir = TempDir::new().unwrap();
    TetherConfig::memory()
        .write_to_file(&dir.path().join(tether::CONFIG_FILE_NAME))
        .unwrap();

    let db = Database::open(dir.path()).unwrap();
    assert!(db.data_dir().is_none());
    db.session()
        .transaction(|s| s.save(&person("a")))
        .unwrap();
    assert!(!dir.path().join("records.json").exists());
}

//! Session Operation Tests
//!
//! The persistence operations exercised through the `tether` facade, with
//! several sessions sharing one store.

use crate::common::*;

// ============================================================================
// Identity Map Scope
// ============================================================================

#[test]
fn identity_map_is_per_session() {
    let t = TestDb::ephemeral();
    let mut writer = t.session();
    let p = person("John Doe");
    let id = writer.transaction(|s| s.save(&p)).unwrap();

    let mut reader = t.session();
    let a = reader.get::<Person>(id).unwrap().unwrap();
    let b = reader.get::<Person>(id).unwrap().unwrap();
    assert!(a.ptr_eq(&b));
    assert!(!a.ptr_eq(&p));
}

#[test]
fn committed_update_is_visible_to_other_sessions() {
    let t = TestDb::ephemeral();
    let mut writer = t.session();
    let p = person("Jane Doe");
    writer.transaction(|s| s.persist(&p)).unwrap();

    writer.begin().unwrap();
    p.write(|p| p.set_name("Jane Smith")).unwrap();
    writer.update(&p).unwrap();
    writer.commit().unwrap();

    let mut reader = t.session();
    let seen = reader.get::<Person>(p.identity()).unwrap().unwrap();
    assert_eq!(name_of(&seen), "Jane Smith");
}

// ============================================================================
// Detach and Reattach
// ============================================================================

#[test]
fn cleared_handle_is_reattached_by_merge() {
    let t = TestDb::ephemeral();
    let mut s = t.session();
    let p = person("Michael Johnson");
    s.transaction(|s| s.save(&p)).unwrap();

    s.clear();
    assert_eq!(s.managed_count(), 0);
    s.begin().unwrap();
    assert!(matches!(s.update(&p), Err(Error::NotManaged { .. })));
    s.rollback().unwrap();

    p.write(|p| p.set_name("Mike Johnson")).unwrap();
    let managed = s.transaction(|s| s.merge(&p)).unwrap();
    assert!(!managed.ptr_eq(&p));
    assert!(!s.contains(&p));
    assert!(s.contains(&managed));
    assert_eq!(name_of(&managed), "Mike Johnson");

    let mut other = t.session();
    assert_eq!(
        name_of(&other.get::<Person>(p.identity()).unwrap().unwrap()),
        "Mike Johnson"
    );
}

#[test]
fn load_proxy_for_deleted_row_fails_on_access() {
    let t = TestDb::ephemeral();
    let mut writer = t.session();
    let p = person("Emily Davis");
    writer.transaction(|s| s.save(&p)).unwrap();

    let mut reader = t.session();
    let proxy = reader.load::<Person>(p.identity());
    writer.transaction(|s| s.delete(&p)).unwrap();

    let err = proxy.read(|p| p.name().to_string()).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(proxy.identity(), p.identity());
}

#[test]
fn save_survives_rollback_but_persist_does_not() {
    let t = TestDb::ephemeral();
    let mut s = t.session();
    let saved = person("saved");
    let persisted = person("persisted");

    s.begin().unwrap();
    s.save(&saved).unwrap();
    s.persist(&persisted).unwrap();
    assert_eq!(s.rollback().unwrap(), 1);

    assert_eq!(t.rows(), 1);
    assert!(t.store().contains(Person::TABLE, saved.identity()).unwrap());
    assert!(persisted.identity().is_transient());
    assert_eq!(s.transaction_status(), Some(TransactionStatus::RolledBack));
}

//! Session semantics tests
//!
//! Each section exercises one observable difference between the
//! persistence operations:
//!
//! 1. save / get identity-map uniqueness
//! 2. get vs load on missing records
//! 3. update on unmanaged entities
//! 4. save_or_update routing
//! 5. merge never attaching its argument
//! 6. evict forcing a re-read
//! 7. clear detaching everything
//! 8. rollback after persist vs after save
//! 9. failed commits

use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;
use tether_core::{Error, Identity, Person, RecordStore};
use tether_engine::{Database, EntityRef, Session, TransactionStatus};
use tether_storage::testing::{FaultPoint, FaultyStore};
use tether_storage::MemoryStore;

// ============================================================================
// Test Helpers
// ============================================================================

fn dob() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1990, 3, 14)
}

fn person(name: &str) -> EntityRef<Person> {
    EntityRef::new(Person::new(name, dob()))
}

fn name_of(p: &EntityRef<Person>) -> String {
    p.read(|p| p.name().to_string()).unwrap()
}

/// Persist a person through `session` and return the committed handle
fn saved(session: &mut Session, name: &str) -> EntityRef<Person> {
    let p = person(name);
    session.transaction(|s| s.save(&p)).unwrap();
    p
}

// ============================================================================
// SECTION 1: save / get
// ============================================================================

mod save_and_get {
    use super::*;

    #[test]
    fn save_assigns_identity_immediately() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let p = person("John Doe");

        s.begin().unwrap();
        let id = s.save(&p).unwrap();
        assert!(!id.is_transient());
        assert_eq!(p.identity(), id);
        // Visible in the store before commit
        assert!(db.store().contains("person", id).unwrap());
        s.commit().unwrap();
    }

    #[test]
    fn get_returns_the_saved_reference() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let p = saved(&mut s, "John Doe");

        let first = s.get::<Person>(p.identity()).unwrap().unwrap();
        let second = s.get::<Person>(p.identity()).unwrap().unwrap();
        assert!(first.ptr_eq(&p));
        assert!(second.ptr_eq(&first));
        assert_eq!(first.get().unwrap(), p.get().unwrap());
    }

    #[test]
    fn get_attaches_records_read_from_store() {
        let db = Database::ephemeral();
        let id = saved(&mut db.session(), "Ada").identity();

        let mut s = db.session();
        assert_eq!(s.managed_count(), 0);
        let p = s.get::<Person>(id).unwrap().unwrap();
        assert!(s.contains(&p));
        assert_eq!(name_of(&p), "Ada");
    }

    proptest! {
        #[test]
        fn saved_fields_read_back_unchanged(name in "[A-Za-z][A-Za-z ]{0,30}", days in 0i64..30_000) {
            let date = NaiveDate::from_ymd_opt(1920, 1, 1).unwrap() + chrono::Duration::days(days);
            let db = Database::ephemeral();
            let mut s = db.session();
            let p = EntityRef::new(Person::new(name.clone(), Some(date)));
            s.transaction(|s| s.save(&p)).unwrap();

            let got = s.get::<Person>(p.identity()).unwrap().unwrap();
            prop_assert!(got.ptr_eq(&p));
            let again = s.get::<Person>(p.identity()).unwrap().unwrap();
            prop_assert!(again.ptr_eq(&got));

            // A fresh session reads the same fields from the store
            let mut other = db.session();
            let fresh = other.get::<Person>(p.identity()).unwrap().unwrap();
            prop_assert_eq!(fresh.get().unwrap(), p.get().unwrap());
        }
    }
}

// ============================================================================
// SECTION 2: get vs load
// ============================================================================

mod get_vs_load {
    use super::*;

    #[test]
    fn load_of_missing_record_fails_on_access_not_on_load() {
        let db = Database::ephemeral();
        let mut s = db.session();

        let proxy = s.load::<Person>(Identity::new(77));
        assert_eq!(proxy.identity(), Identity::new(77));
        assert!(!proxy.is_resolved());

        let err = proxy.read(|p| p.name().to_string()).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn get_of_missing_record_is_none() {
        let db = Database::ephemeral();
        let mut s = db.session();
        assert!(s.get::<Person>(Identity::new(77)).unwrap().is_none());
        assert_eq!(s.managed_count(), 0);
    }

    #[test]
    fn get_after_failed_load_is_still_none() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let proxy = s.load::<Person>(Identity::new(5));
        assert!(proxy.get().unwrap_err().is_not_found());
        assert!(s.get::<Person>(Identity::new(5)).unwrap().is_none());
    }

    #[test]
    fn load_does_not_touch_the_store() {
        let store = Arc::new(FaultyStore::new(MemoryStore::new()));
        let id = store
            .insert(&tether_core::Entity::to_record(&Person::new("Ada", None)))
            .unwrap();
        let db = Database::with_store(store.clone());
        let mut s = db.session();

        let proxy = s.load::<Person>(id);
        assert_eq!(store.calls(FaultPoint::Read), 0);
        assert_eq!(name_of(&proxy), "Ada");
        assert_eq!(store.calls(FaultPoint::Read), 1);
        // Resolved once; further access is served from memory
        assert_eq!(name_of(&proxy), "Ada");
        assert_eq!(store.calls(FaultPoint::Read), 1);
    }

    #[test]
    fn load_returns_attached_instance() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let p = saved(&mut s, "Jane Doe");
        let loaded = s.load::<Person>(p.identity());
        assert!(loaded.ptr_eq(&p));
        assert!(loaded.is_resolved());
    }

    #[test]
    fn get_after_load_returns_the_proxy_resolved() {
        let db = Database::ephemeral();
        let id = saved(&mut db.session(), "Jane Doe").identity();

        let mut s = db.session();
        let proxy = s.load::<Person>(id);
        let got = s.get::<Person>(id).unwrap().unwrap();
        assert!(got.ptr_eq(&proxy));
        assert!(proxy.is_resolved());
    }
}

// ============================================================================
// SECTION 3: update
// ============================================================================

mod update {
    use super::*;

    #[test]
    fn update_of_unattached_entity_is_not_managed() {
        let db = Database::ephemeral();
        let id = saved(&mut db.session(), "Jane Doe").identity();

        // A record exists, but this handle was never attached to `s`
        let mut s = db.session();
        let stranger = EntityRef::new(Person::with_identity(id, "Jane Smith", None));
        s.begin().unwrap();
        assert!(s.update(&stranger).unwrap_err().is_not_managed());
    }

    #[test]
    fn update_of_unknown_identity_is_not_managed() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let ghost = EntityRef::new(Person::with_identity(Identity::new(999), "x", None));
        s.begin().unwrap();
        assert!(s.update(&ghost).unwrap_err().is_not_managed());
    }

    #[test]
    fn update_of_transient_is_not_managed() {
        let db = Database::ephemeral();
        let mut s = db.session();
        s.begin().unwrap();
        assert!(s.update(&person("x")).unwrap_err().is_not_managed());
    }

    #[test]
    fn update_persists_changes_at_commit() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let p = person("Jane Doe");
        s.transaction(|s| s.persist(&p)).unwrap();

        s.begin().unwrap();
        p.write(|p| p.set_name("Jane Smith")).unwrap();
        s.update(&p).unwrap();
        let before = db.store().read("person", p.identity()).unwrap();
        assert_eq!(before.text("name").unwrap(), "Jane Doe");
        s.commit().unwrap();

        let after = db.store().read("person", p.identity()).unwrap();
        assert_eq!(after.text("name").unwrap(), "Jane Smith");
    }

    #[test]
    fn update_captures_fields_at_commit_time() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let p = saved(&mut s, "a");

        s.begin().unwrap();
        s.update(&p).unwrap();
        p.write(|p| p.set_name("late change")).unwrap();
        s.commit().unwrap();

        let row = db.store().read("person", p.identity()).unwrap();
        assert_eq!(row.text("name").unwrap(), "late change");
    }
}

// ============================================================================
// SECTION 4: save_or_update
// ============================================================================

mod save_or_update {
    use super::*;

    #[test]
    fn transient_routes_to_save() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let p = person("Michael Johnson");
        s.begin().unwrap();
        s.save_or_update(&p).unwrap();
        // save path: identity assigned before commit
        assert!(!p.identity().is_transient());
        s.commit().unwrap();
        assert!(s.contains(&p));
    }

    #[test]
    fn identified_routes_to_update() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let p = saved(&mut s, "Michael Johnson");
        let id = p.identity();

        s.begin().unwrap();
        p.write(|p| p.set_name("Mike Johnson")).unwrap();
        s.save_or_update(&p).unwrap();
        assert_eq!(s.pending().updates, 1);
        s.commit().unwrap();

        assert_eq!(p.identity(), id);
        assert_eq!(db.store().len("person").unwrap(), 1);
        let row = db.store().read("person", id).unwrap();
        assert_eq!(row.text("name").unwrap(), "Mike Johnson");
    }

    #[test]
    fn identified_but_detached_is_not_managed() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let p = saved(&mut s, "a");
        s.evict(&p);
        s.begin().unwrap();
        assert!(s.save_or_update(&p).unwrap_err().is_not_managed());
    }
}

// ============================================================================
// SECTION 5: merge
// ============================================================================

mod merge {
    use super::*;

    #[test]
    fn merge_copies_onto_managed_instance_and_never_attaches_argument() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let managed = saved(&mut s, "Y");
        let id = managed.identity();

        let detached = EntityRef::new(Person::with_identity(id, "X", dob()));
        s.begin().unwrap();
        let merged = s.merge(&detached).unwrap();
        s.commit().unwrap();

        assert!(merged.ptr_eq(&managed));
        assert!(!merged.ptr_eq(&detached));
        assert_eq!(name_of(&managed), "X");
        assert!(!s.contains(&detached));
        assert!(s.contains(&managed));
        let row = db.store().read("person", id).unwrap();
        assert_eq!(row.text("name").unwrap(), "X");
    }

    #[test]
    fn merge_loads_managed_instance_when_not_attached() {
        let db = Database::ephemeral();
        let id = saved(&mut db.session(), "Y").identity();

        let mut s = db.session();
        let detached = EntityRef::new(Person::with_identity(id, "X", None));
        s.begin().unwrap();
        let merged = s.merge(&detached).unwrap();
        assert!(!merged.ptr_eq(&detached));
        assert!(s.contains(&merged));
        assert!(!s.contains(&detached));
        s.commit().unwrap();

        assert_eq!(db.store().read("person", id).unwrap().text("name").unwrap(), "X");
    }

    #[test]
    fn merge_of_new_entity_saves_and_returns_it() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let p = person("Emily Davis");
        s.begin().unwrap();
        let merged = s.merge(&p).unwrap();
        s.commit().unwrap();

        assert!(merged.ptr_eq(&p));
        assert!(!p.identity().is_transient());
        assert_eq!(merged.read(|p| p.dob()).unwrap(), dob());
    }

    #[test]
    fn merge_of_missing_identity_is_not_found() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let ghost = EntityRef::new(Person::with_identity(Identity::new(31), "x", None));
        s.begin().unwrap();
        assert!(s.merge(&ghost).unwrap_err().is_not_found());
    }

    #[test]
    fn merge_reattaches_after_clear() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let p = saved(&mut s, "a");
        s.clear();

        p.write(|p| p.set_name("b")).unwrap();
        s.begin().unwrap();
        let managed = s.merge(&p).unwrap();
        s.update(&managed).unwrap();
        s.commit().unwrap();
        assert_eq!(db.store().read("person", p.identity()).unwrap().text("name").unwrap(), "b");
    }
}

// ============================================================================
// SECTION 6: delete and evict
// ============================================================================

mod delete_and_evict {
    use super::*;

    #[test]
    fn delete_removes_record_and_detaches_on_commit() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let p = saved(&mut s, "John Doe");
        let id = p.identity();

        s.begin().unwrap();
        s.delete(&p).unwrap();
        // Buffered until commit
        assert!(db.store().contains("person", id).unwrap());
        assert!(s.contains(&p));
        s.commit().unwrap();

        assert!(!db.store().contains("person", id).unwrap());
        assert!(!s.contains(&p));
        assert!(s.get::<Person>(id).unwrap().is_none());
        // The handle still reports the identity it had
        assert_eq!(p.identity(), id);
    }

    #[test]
    fn delete_of_unmanaged_is_not_managed() {
        let db = Database::ephemeral();
        let mut s = db.session();
        s.begin().unwrap();
        let ghost = EntityRef::new(Person::with_identity(Identity::new(2), "x", None));
        assert!(s.delete(&ghost).unwrap_err().is_not_managed());
    }

    #[test]
    fn writes_after_delete_are_rejected_and_commit_is_whole() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let p = saved(&mut s, "John Doe");
        let id = p.identity();

        s.begin().unwrap();
        s.delete(&p).unwrap();
        p.write(|p| p.set_name("Johnny")).unwrap();
        assert!(matches!(s.update(&p), Err(Error::InvalidOperation(_))));
        assert!(matches!(s.save_or_update(&p), Err(Error::InvalidOperation(_))));

        let copy = EntityRef::new(Person::with_identity(id, "Copy", dob()));
        assert!(matches!(s.merge(&copy), Err(Error::InvalidOperation(_))));
        assert_eq!(s.pending().deletes, 1);
        assert_eq!(s.pending().updates, 0);

        s.commit().unwrap();
        assert_eq!(s.transaction_status(), Some(TransactionStatus::Committed));
        assert!(!db.store().contains("person", id).unwrap());
    }

    #[test]
    fn rolled_back_delete_keeps_record() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let p = saved(&mut s, "a");
        s.begin().unwrap();
        s.delete(&p).unwrap();
        s.rollback().unwrap();
        assert!(db.store().contains("person", p.identity()).unwrap());
        assert!(s.contains(&p));
    }

    #[test]
    fn evict_then_get_rereads_a_distinct_reference() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let p = saved(&mut s, "Jane Doe");

        s.evict(&p);
        assert!(!s.contains(&p));
        assert!(db.store().contains("person", p.identity()).unwrap());

        let fresh = s.get::<Person>(p.identity()).unwrap().unwrap();
        assert!(!fresh.ptr_eq(&p));
        assert_eq!(fresh.get().unwrap(), p.get().unwrap());
    }

    #[test]
    fn evict_then_load_is_a_new_proxy() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let p = saved(&mut s, "Jane Doe");
        s.evict(&p);
        let proxy = s.load::<Person>(p.identity());
        assert!(!proxy.ptr_eq(&p));
        assert!(!proxy.is_resolved());
        assert_eq!(name_of(&proxy), "Jane Doe");
    }

    #[test]
    fn evict_of_unattached_is_noop() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let p = saved(&mut s, "a");
        let copy = EntityRef::new(p.get().unwrap());
        s.evict(&copy);
        assert!(s.contains(&p));
    }
}

// ============================================================================
// SECTION 7: clear
// ============================================================================

mod clear {
    use super::*;

    #[test]
    fn clear_detaches_everything_without_touching_store() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let a = saved(&mut s, "a");
        let b = saved(&mut s, "b");
        assert_eq!(s.managed_count(), 2);

        s.clear();
        assert_eq!(s.managed_count(), 0);
        assert_eq!(db.store().len("person").unwrap(), 2);

        s.begin().unwrap();
        assert!(s.update(&a).unwrap_err().is_not_managed());
        assert!(s.delete(&b).unwrap_err().is_not_managed());
    }

    #[test]
    fn clear_drops_pending_writes() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let p = person("a");
        s.begin().unwrap();
        s.persist(&p).unwrap();
        s.clear();
        assert!(s.pending().is_empty());
        s.commit().unwrap();
        assert_eq!(db.store().len("person").unwrap(), 0);
    }
}

// ============================================================================
// SECTION 8: save vs persist under rollback
// ============================================================================

mod rollback_asymmetry {
    use super::*;

    #[test]
    fn rollback_after_persist_leaves_no_record() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let p = person("Jane Doe");

        s.begin().unwrap();
        s.persist(&p).unwrap();
        assert!(p.identity().is_transient());
        assert_eq!(s.rollback().unwrap(), 1);

        assert!(p.identity().is_transient());
        assert_eq!(db.store().len("person").unwrap(), 0);
        assert!(!s.contains(&p));
    }

    #[test]
    fn rollback_after_save_still_leaves_record() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let p = person("John Doe");

        s.begin().unwrap();
        let id = s.save(&p).unwrap();
        assert_eq!(s.rollback().unwrap(), 0);

        assert!(db.store().contains("person", id).unwrap());
        assert_eq!(db.store().len("person").unwrap(), 1);
    }

    #[test]
    fn persist_assigns_identity_only_at_commit() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let p = person("Jane Doe");
        s.begin().unwrap();
        s.persist(&p).unwrap();
        assert!(p.identity().is_transient());
        assert_eq!(db.store().len("person").unwrap(), 0);
        s.commit().unwrap();
        assert!(!p.identity().is_transient());
        assert!(s.contains(&p));
    }

    #[test]
    fn persist_outside_transaction_is_illegal_state() {
        let db = Database::ephemeral();
        let mut s = db.session();
        assert!(s.persist(&person("x")).unwrap_err().is_illegal_state());
    }
}

// ============================================================================
// SECTION 9: failed commits
// ============================================================================

mod failed_commit {
    use super::*;

    fn faulty() -> (Arc<FaultyStore<MemoryStore>>, Database) {
        let store = Arc::new(FaultyStore::new(MemoryStore::new()));
        let db = Database::with_store(store.clone());
        (store, db)
    }

    #[test]
    fn storage_fault_on_commit_rolls_back() {
        let (store, db) = faulty();
        let mut s = db.session();
        s.begin().unwrap();
        s.persist(&person("a")).unwrap();
        store.fail_next(FaultPoint::Insert, 1);

        assert!(s.commit().unwrap_err().is_storage());
        assert!(!s.in_transaction());
        assert_eq!(s.transaction_status(), Some(TransactionStatus::RolledBack));
        assert_eq!(s.stats().rolled_back, 1);

        // A new transaction can be started to retry
        let retry = person("a");
        s.transaction(|s| s.persist(&retry)).unwrap();
        assert_eq!(store.inner().len("person").unwrap(), 1);
    }

    #[test]
    fn storage_fault_mid_commit_keeps_applied_prefix() {
        let (store, db) = faulty();
        let mut s = db.session();
        let existing = saved(&mut s, "Jane Doe");
        let fresh = person("Michael Johnson");

        s.begin().unwrap();
        s.persist(&fresh).unwrap();
        existing.write(|p| p.set_name("Jane Smith")).unwrap();
        s.update(&existing).unwrap();
        store.fail_next(FaultPoint::Update, 1);

        assert!(s.commit().unwrap_err().is_storage());
        assert_eq!(s.transaction_status(), Some(TransactionStatus::RolledBack));
        assert!(!s.in_transaction());

        // The insert ran before the failing update and stays applied
        assert!(!fresh.identity().is_transient());
        assert!(s.contains(&fresh));
        assert_eq!(store.inner().len("person").unwrap(), 2);
        let stored = store.inner().read("person", existing.identity()).unwrap();
        assert_eq!(stored.text("name").unwrap(), "Jane Doe");
    }

    #[test]
    fn constraint_violation_applies_no_buffered_write() {
        let db = Database::ephemeral();
        let mut s = db.session();
        let good = person("good");
        let bad = person("");

        s.begin().unwrap();
        s.persist(&good).unwrap();
        s.persist(&bad).unwrap();
        assert!(matches!(s.commit(), Err(Error::InvalidInput(_))));
        assert_eq!(db.store().len("person").unwrap(), 0);
        assert!(good.identity().is_transient());
    }

    #[test]
    fn save_validates_before_inserting() {
        let db = Database::ephemeral();
        let mut s = db.session();
        s.begin().unwrap();
        assert!(matches!(s.save(&person("")), Err(Error::InvalidInput(_))));
        assert_eq!(db.store().len("person").unwrap(), 0);
    }

    #[test]
    fn save_surfaces_storage_error() {
        let (store, db) = faulty();
        let mut s = db.session();
        let p = person("a");
        s.begin().unwrap();
        store.fail_next(FaultPoint::Insert, 1);
        assert!(s.save(&p).unwrap_err().is_storage());
        assert!(p.identity().is_transient());
        assert_eq!(s.managed_count(), 0);
    }

    #[test]
    fn get_surfaces_read_fault_but_not_miss() {
        let (store, db) = faulty();
        let mut s = db.session();
        store.fail_next(FaultPoint::Read, 1);
        assert!(s.get::<Person>(Identity::new(1)).unwrap_err().is_storage());
        assert!(s.get::<Person>(Identity::new(1)).unwrap().is_none());
    }
}

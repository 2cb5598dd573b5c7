//! Account lifecycle tests: creation, idempotent ensure, owner scoping.

use chrono::{TimeZone, Utc};
use std::sync::Arc;
use vault_core::{BankError, BankService, BankStore, OwnerKey};

fn service() -> BankService {
    let store = BankStore::in_memory().unwrap();
    store.migrate().unwrap();
    BankService::new(Arc::new(store))
}

#[test]
fn new_owner_starts_with_default_balance_and_no_timestamps() {
    let service = service();
    let record = service.ensure_account(&OwnerKey::user("alice")).unwrap();

    assert_eq!(record.amount, 1000);
    assert_eq!(record.last_deposit, None);
    assert_eq!(record.last_withdrawal, None);
}

#[test]
fn ensure_account_is_idempotent() {
    let service = service();
    let owner = OwnerKey::user("alice");
    let now = Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap();

    let first = service.ensure_account(&owner).unwrap();
    service.deposit(&owner, 250, now).unwrap();
    let second = service.ensure_account(&owner).unwrap();

    assert_eq!(
        first.record_id, second.record_id,
        "ensure_account must return the same record identity"
    );
    assert_eq!(second.amount, 1250, "ensure_account must not reset the balance");
}

#[test]
fn duplicate_create_is_rejected() {
    let store = BankStore::in_memory().unwrap();
    store.migrate().unwrap();
    let owner = OwnerKey::user("alice");

    store.create(&owner).unwrap();
    let err = store.create(&owner).unwrap_err();

    assert!(matches!(err, BankError::DuplicateOwner(_)), "got {err:?}");
}

#[test]
fn lookup_of_unknown_owner_fails_not_found() {
    let store = BankStore::in_memory().unwrap();
    store.migrate().unwrap();

    let err = store.get_by_owner(&OwnerKey::user("nobody")).unwrap_err();

    assert!(matches!(err, BankError::NotFound(_)), "got {err:?}");
}

#[test]
fn scoped_records_for_the_same_user_are_independent() {
    let service = service();
    let now = Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap();
    let in_guild_a = OwnerKey::scoped("alice", "guild-a");
    let in_guild_b = OwnerKey::scoped("alice", "guild-b");

    let a = service.ensure_account(&in_guild_a).unwrap();
    let b = service.ensure_account(&in_guild_b).unwrap();
    assert_ne!(a.record_id, b.record_id);

    service.withdraw(&in_guild_a, 1000, now).unwrap();

    let a = service.ensure_account(&in_guild_a).unwrap();
    let b = service.ensure_account(&in_guild_b).unwrap();
    assert_eq!(a.amount, 0);
    assert_eq!(b.amount, 1000, "scope b must not see scope a's withdrawal");
}

#[test]
fn can_withdraw_probe() {
    let service = service();
    let owner = OwnerKey::user("alice");
    let now = Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap();

    // No record yet.
    assert!(!service.can_withdraw(&owner, 100, now).unwrap());

    service.ensure_account(&owner).unwrap();
    assert!(service.can_withdraw(&owner, 1000, now).unwrap());
    assert!(!service.can_withdraw(&owner, 1001, now).unwrap());
    assert!(!service.can_withdraw(&owner, 0, now).unwrap());

    // A committed withdrawal starts the cooldown.
    service.withdraw(&owner, 100, now).unwrap();
    assert!(!service.can_withdraw(&owner, 100, now).unwrap());
}

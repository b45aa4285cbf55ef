//! End-to-end reconciliation scenarios: edits that merge classes, destroy
//! duplicates, and drag account defaults along.

#![allow(clippy::unwrap_used)]

use mailroom_core::{AddressChanges, OrderStatus};
use mailroom_dedup::{AddressList, AddressStore, MemoryStore, reconcile};
use mailroom_integration_tests::{saved_for, saved_ownerless};

#[test]
fn editing_into_another_class_merges_and_destroys_the_old_group() {
    mailroom_integration_tests::init_tracing();
    let store = MemoryStore::new();
    let account = store.new_account("theo@example.com");

    // The edited record has a duplicate, and so does the target.
    let edited = saved_for(&store, account.id, "Theo Mba", "14 Willow Ct");
    let edited_dup = saved_for(&store, account.id, "theo mba", "14 willow ct");
    let target_dup = saved_for(&store, account.id, "Theo Mba", "90 Aspen Pl");
    let target = saved_for(&store, account.id, "THEO MBA", "90 ASPEN PL");

    let list = AddressList::build(&store, account.id).unwrap();
    assert_eq!(list.len(), 2);

    let changes = AddressChanges {
        street1: Some("90 Aspen Pl".to_owned()),
        ..Default::default()
    };
    let outcome = reconcile(&store, &edited, &changes, list).unwrap();

    assert!(outcome.is_clean());
    assert!(outcome.merged());
    // Resolution lands on the target class's primary.
    assert_eq!(outcome.address.id, target.id);
    // The target class absorbed the incoming field values.
    assert_eq!(outcome.address.street1, "90 Aspen Pl");

    // Duplicates on both sides are gone from a fresh listing. The old
    // class keeps only its primary (the more recent edited_dup).
    let rebuilt = AddressList::build(&store, account.id).unwrap();
    for doomed in [edited.id, target_dup.id] {
        assert!(
            !rebuilt.iter().any(|class| class.contains(doomed.unwrap())),
            "destroyed duplicate still listed"
        );
    }
    // What's left: the kept survivor of the old class and the target.
    assert_eq!(rebuilt.len(), 2);
    assert!(rebuilt.iter().any(|class| class.id() == target.id));
    assert!(rebuilt.iter().any(|class| class.id() == edited_dup.id));
}

#[test]
fn editing_a_duplicate_collapses_its_own_group() {
    let store = MemoryStore::new();
    let account = store.new_account("theo@example.com");
    let older = saved_for(&store, account.id, "Theo Mba", "14 Willow Ct");
    let newer = saved_for(&store, account.id, "theo mba", "14 WILLOW CT");

    let list = AddressList::build(&store, account.id).unwrap();
    let changes = AddressChanges {
        organization: Some("Mba Consulting".to_owned()),
        ..Default::default()
    };
    let outcome = reconcile(&store, &older, &changes, list).unwrap();

    assert!(outcome.is_clean());
    assert!(!outcome.merged());
    assert_eq!(outcome.address.id, newer.id);
    assert_eq!(
        outcome.address.organization.as_deref(),
        Some("Mba Consulting")
    );

    let rebuilt = AddressList::build(&store, account.id).unwrap();
    assert_eq!(rebuilt.len(), 1);
    assert_eq!(rebuilt.first().unwrap().len(), 1);
}

#[test]
fn completed_order_addresses_are_immutable() {
    let store = MemoryStore::new();
    let account = store.new_account("theo@example.com");
    let rec = saved_for(&store, account.id, "Theo Mba", "14 Willow Ct");

    let mut order = store.new_order(Some(account.id), OrderStatus::Complete);
    order.billing_address = rec.id;
    store.save_order(&mut order).unwrap();

    let list = AddressList::build(&store, (account.id, order.id)).unwrap();
    let changes = AddressChanges {
        street1: Some("1 Somewhere Else".to_owned()),
        ..Default::default()
    };
    let outcome = reconcile(&store, &rec, &changes, list).unwrap();

    assert!(!outcome.is_clean());
    assert!(outcome.errors.iter().any(|e| e.field.is_none()));
    // Nothing moved: record and order are untouched.
    assert_eq!(store.load(rec.id.unwrap()).unwrap().street1, "14 Willow Ct");
    assert_eq!(
        store.load_order(order.id).unwrap().billing_address,
        rec.id
    );
}

#[test]
fn merge_repoints_the_accounts_defaults_at_the_survivor() {
    let store = MemoryStore::new();
    let mut account = store.new_account("theo@example.com");
    let edited = saved_for(&store, account.id, "Theo Mba", "14 Willow Ct");
    let target = saved_for(&store, account.id, "Theo Mba", "90 Aspen Pl");

    account.default_billing = edited.id;
    account.default_shipping = edited.id;
    store.save_account(&mut account).unwrap();

    let list = AddressList::build(&store, account.id).unwrap();
    let changes = AddressChanges {
        street1: Some("90 aspen pl".to_owned()),
        ..Default::default()
    };
    let outcome = reconcile(&store, &edited, &changes, list).unwrap();

    assert!(outcome.is_clean());
    assert_eq!(outcome.address.id, target.id);

    let reloaded = store.load_account(account.id).unwrap();
    assert_eq!(reloaded.default_billing, target.id);
    assert_eq!(reloaded.default_shipping, target.id);
}

#[test]
fn order_scope_edit_folds_ownerless_duplicate_into_saved_address() {
    let store = MemoryStore::new();
    let account = store.new_account("theo@example.com");
    let saved = saved_for(&store, account.id, "Theo Mba", "14 Willow Ct");
    let order_only = saved_ownerless(&store, "Theo Mba", "2 Checkout Ln");

    let mut order = store.new_order(Some(account.id), OrderStatus::Cart);
    order.shipping_address = order_only.id;
    store.save_order(&mut order).unwrap();

    let list = AddressList::build(&store, (order.id, account.id)).unwrap();
    assert_eq!(list.len(), 2);

    // The customer edits the checkout address to match their saved one.
    let changes = AddressChanges {
        street1: Some("14 Willow Ct".to_owned()),
        ..Default::default()
    };
    let outcome = reconcile(&store, &order_only, &changes, list).unwrap();

    assert!(outcome.merged());
    assert_eq!(outcome.address.id, saved.id);
    // The order-only record survives as its class's sole member; the saved
    // record is the canonical result the caller should assign to the order.
    assert_eq!(outcome.new_match.unwrap().id(), saved.id);
}

#[test]
fn reconciliation_is_visible_in_subsequent_listings() {
    let store = MemoryStore::new();
    let account = store.new_account("theo@example.com");
    for _ in 0..4 {
        saved_for(&store, account.id, "Theo Mba", "14 Willow Ct");
    }
    let last = saved_for(&store, account.id, "Theo Mba", "14 Willow Ct");

    let list = AddressList::build(&store, account.id).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list.first().unwrap().len(), 5);

    let outcome = reconcile(&store, &last, &AddressChanges::default(), list).unwrap();
    assert!(outcome.is_clean());

    let rebuilt = AddressList::build(&store, account.id).unwrap();
    assert_eq!(rebuilt.len(), 1);
    assert_eq!(rebuilt.first().unwrap().len(), 1);
    assert_eq!(store.address_rows(), 1);
}

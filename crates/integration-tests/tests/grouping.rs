//! End-to-end grouping scenarios: building lists over accounts and orders
//! and checking the equivalence classes that come out.

#![allow(clippy::unwrap_used)]

use mailroom_core::OrderStatus;
use mailroom_dedup::{AddressList, AddressStore, ListScope, MemoryStore, same_as};
use mailroom_integration_tests::{saved_for, saved_ownerless};

#[test]
fn casing_variants_collapse_into_one_group() {
    mailroom_integration_tests::init_tracing();
    let store = MemoryStore::new();
    let account = store.new_account("uma@example.com");
    let a1 = saved_for(&store, account.id, "Uma Patel", "77 Birch Way");
    let a2 = saved_for(&store, account.id, "UMA PATEL", "77 BIRCH WAY");

    let list = AddressList::build(&store, account.id).unwrap();
    assert_eq!(list.len(), 1);

    let class = list.first().unwrap();
    assert_eq!(class.len(), 2);
    assert!(class.contains(a1.id.unwrap()));
    assert!(class.contains(a2.id.unwrap()));
    // a2 was saved later, so it is the more recently modified member.
    assert_eq!(class.primary().unwrap().id, a2.id);
}

#[test]
fn order_with_identical_bill_and_ship_lists_the_record_once() {
    let store = MemoryStore::new();
    let b = saved_ownerless(&store, "Omar Sy", "5 Quai Conti");

    let mut order = store.new_order(None, OrderStatus::Cart);
    order.billing_address = b.id;
    order.shipping_address = b.id;
    store.save_order(&mut order).unwrap();

    let list = AddressList::build(&store, order.id).unwrap();
    assert_eq!(list.len(), 1);

    let class = list.first().unwrap();
    assert_eq!(class.len(), 1);
    assert_eq!(class.roles().order_billing, b.id);
    assert_eq!(class.roles().order_shipping, b.id);
    assert_eq!(class.primary().unwrap().id, b.id);
}

#[test]
fn five_identical_addresses_form_a_single_class() {
    let store = MemoryStore::new();
    let account = store.new_account("uma@example.com");
    for _ in 0..5 {
        saved_for(&store, account.id, "Uma Patel", "77 Birch Way");
    }

    let list = AddressList::build(&store, account.id).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list.first().unwrap().len(), 5);
}

#[test]
fn groups_are_refound_by_their_own_members() {
    let store = MemoryStore::new();
    let account = store.new_account("uma@example.com");
    saved_for(&store, account.id, "Uma Patel", "77 Birch Way");
    saved_for(&store, account.id, "uma patel", "77 birch way");
    saved_for(&store, account.id, "Uma Patel", "3 Other Road");

    let list = AddressList::build(&store, account.id).unwrap();
    assert_eq!(list.len(), 2);

    for class in &list {
        let primary = class.primary().unwrap().clone();
        assert_eq!(list.find(&primary).unwrap().id(), class.id());

        // Every member of a group leads back to the same class.
        if let Some(group) = class.as_group() {
            for member in group.members() {
                assert_eq!(list.find(member).unwrap().id(), class.id());
            }
        }
    }
}

#[test]
fn primary_has_the_greatest_last_modified_of_its_partition() {
    let store = MemoryStore::new();
    let account = store.new_account("uma@example.com");
    saved_for(&store, account.id, "Uma Patel", "77 Birch Way");
    saved_for(&store, account.id, "Uma Patel", "77 birch way");
    let latest = saved_for(&store, account.id, "UMA PATEL", "77 Birch Way");

    let list = AddressList::build(&store, account.id).unwrap();
    let class = list.first().unwrap();

    let max = class
        .as_group()
        .unwrap()
        .members()
        .map(|m| m.updated_at)
        .max()
        .unwrap();
    assert_eq!(class.last_modified(), Some(max));
    assert_eq!(class.id(), latest.id);
}

#[test]
fn ownerless_records_match_owned_records() {
    let store = MemoryStore::new();
    let account = store.new_account("uma@example.com");
    let owned = saved_for(&store, account.id, "Uma Patel", "77 Birch Way");
    let stray = saved_ownerless(&store, "Uma Patel", "77 Birch Way");
    assert!(same_as(&owned, &stray));

    let mut order = store.new_order(Some(account.id), OrderStatus::Cart);
    order.billing_address = stray.id;
    store.save_order(&mut order).unwrap();

    let list = AddressList::build(&store, (account.id, order.id)).unwrap();
    assert_eq!(list.len(), 1);
    let class = list.first().unwrap();
    assert_eq!(class.len(), 2);
    // The account-owned record is canonical.
    assert_eq!(class.id(), owned.id);
    assert_eq!(class.roles().order_billing, stray.id);
}

#[test]
fn empty_scope_yields_empty_list() {
    let store = MemoryStore::new();
    let list = AddressList::build(&store, ListScope::empty()).unwrap();
    assert!(list.is_empty());
    assert!(list.iter().next().is_none());
}

//! Shared fixtures for the integration tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

use mailroom_core::{AccountId, AddressRecord};
use mailroom_dedup::{AddressStore, MemoryStore};

/// Route engine traces to the test output when `RUST_LOG` is set.
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A valid base address.
#[must_use]
pub fn address(name: &str, street1: &str) -> AddressRecord {
    let mut rec = AddressRecord::new(name, street1, "Boise", "83702");
    rec.region_name = Some("Idaho".to_owned());
    rec
}

/// Persist an address owned by `account`.
///
/// # Panics
///
/// Panics if the store rejects the record; fixtures are expected valid.
#[allow(clippy::unwrap_used)]
pub fn saved_for(store: &MemoryStore, account: AccountId, name: &str, street1: &str) -> AddressRecord {
    let mut rec = address(name, street1);
    rec.account = Some(account);
    store.save(&mut rec).unwrap();
    rec
}

/// Persist an ownerless (order-only) address.
///
/// # Panics
///
/// Panics if the store rejects the record; fixtures are expected valid.
#[allow(clippy::unwrap_used)]
pub fn saved_ownerless(store: &MemoryStore, name: &str, street1: &str) -> AddressRecord {
    let mut rec = address(name, street1);
    store.save(&mut rec).unwrap();
    rec
}

//! In-memory store for tests and examples.
//!
//! Single-threaded by design, matching the request-scoped execution model:
//! one edit or lookup is fully resolved on one thread, so the tables live in
//! a `RefCell`. Timestamps come from a logical clock that advances on every
//! write, which keeps last-modified ordering deterministic under test.

use std::cell::RefCell;
use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use mailroom_core::{
    Account, AccountId, AddressId, AddressRecord, FieldError, Order, OrderId, OrderStatus,
};

use super::{AddressStore, DeleteOutcome, StoreError};

#[derive(Debug, Default, Clone)]
struct Tables {
    addresses: BTreeMap<AddressId, AddressRecord>,
    accounts: BTreeMap<AccountId, Account>,
    orders: BTreeMap<OrderId, Order>,
    next_id: i64,
    tick: i64,
}

impl Tables {
    fn now(&mut self) -> DateTime<Utc> {
        self.tick += 1;
        DateTime::UNIX_EPOCH + Duration::seconds(self.tick)
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// A single-threaded in-memory [`AddressStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RefCell<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and persist a new account.
    pub fn new_account(&self, email: impl Into<String>) -> Account {
        let mut tables = self.inner.borrow_mut();
        let now = tables.now();
        let account = Account {
            id: AccountId::new(tables.next_id()),
            email: email.into(),
            default_billing: None,
            default_shipping: None,
            created_at: now,
            updated_at: now,
        };
        tables.accounts.insert(account.id, account.clone());
        account
    }

    /// Create and persist a new order.
    pub fn new_order(&self, account: Option<AccountId>, status: OrderStatus) -> Order {
        let mut tables = self.inner.borrow_mut();
        let now = tables.now();
        let order = Order {
            id: OrderId::new(tables.next_id()),
            account,
            billing_address: None,
            shipping_address: None,
            status,
            created_at: now,
            updated_at: now,
        };
        tables.orders.insert(order.id, order.clone());
        order
    }

    /// Number of address rows, soft-deleted included. Test helper.
    #[must_use]
    pub fn address_rows(&self) -> usize {
        self.inner.borrow().addresses.len()
    }

    fn referenced_elsewhere(tables: &Tables, id: AddressId) -> bool {
        tables.orders.values().any(|order| order.references(id))
            || tables.accounts.values().any(|account| account.has_default(id))
    }
}

impl AddressStore for MemoryStore {
    fn load(&self, id: AddressId) -> Result<AddressRecord, StoreError> {
        self.inner
            .borrow()
            .addresses
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn save(&self, record: &mut AddressRecord) -> Result<(), StoreError> {
        let errors = record.validate();
        if !errors.is_empty() {
            return Err(StoreError::Validation(errors));
        }

        let mut tables = self.inner.borrow_mut();
        let now = tables.now();
        match record.id {
            None => {
                record.id = Some(AddressId::new(tables.next_id()));
                record.created_at = now;
                record.updated_at = now;
            }
            Some(id) => {
                if !tables.addresses.contains_key(&id) {
                    return Err(StoreError::NotFound(id));
                }
                record.updated_at = now;
            }
        }
        if let Some(id) = record.id {
            tables.addresses.insert(id, record.clone());
        }
        Ok(())
    }

    fn delete(&self, record: &AddressRecord) -> Result<DeleteOutcome, StoreError> {
        let Some(id) = record.id else {
            return Err(StoreError::Integrity(
                "cannot delete an unsaved address".to_owned(),
            ));
        };

        let mut tables = self.inner.borrow_mut();
        if !tables.addresses.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }

        if Self::referenced_elsewhere(&tables, id) {
            let now = tables.now();
            if let Some(row) = tables.addresses.get_mut(&id) {
                row.deleted_at = Some(now);
                row.updated_at = now;
            }
            Ok(DeleteOutcome::SoftDeleted)
        } else {
            tables.addresses.remove(&id);
            Ok(DeleteOutcome::Deleted)
        }
    }

    fn saved_addresses(&self, account: AccountId) -> Result<Vec<AddressRecord>, StoreError> {
        let tables = self.inner.borrow();
        if !tables.accounts.contains_key(&account) {
            return Err(StoreError::AccountNotFound(account));
        }
        Ok(tables
            .addresses
            .values()
            .filter(|rec| rec.account == Some(account) && !rec.is_deleted())
            .cloned()
            .collect())
    }

    fn load_account(&self, id: AccountId) -> Result<Account, StoreError> {
        self.inner
            .borrow()
            .accounts
            .get(&id)
            .cloned()
            .ok_or(StoreError::AccountNotFound(id))
    }

    fn save_account(&self, account: &mut Account) -> Result<(), StoreError> {
        if account.email.trim().is_empty() {
            return Err(StoreError::Validation(vec![FieldError::new(
                "email",
                "can't be blank",
            )]));
        }

        let mut tables = self.inner.borrow_mut();
        if !tables.accounts.contains_key(&account.id) {
            return Err(StoreError::AccountNotFound(account.id));
        }
        account.updated_at = tables.now();
        tables.accounts.insert(account.id, account.clone());
        Ok(())
    }

    fn load_order(&self, id: OrderId) -> Result<Order, StoreError> {
        self.inner
            .borrow()
            .orders
            .get(&id)
            .cloned()
            .ok_or(StoreError::OrderNotFound(id))
    }

    fn save_order(&self, order: &mut Order) -> Result<(), StoreError> {
        let mut tables = self.inner.borrow_mut();
        if !tables.orders.contains_key(&order.id) {
            return Err(StoreError::OrderNotFound(order.id));
        }
        order.updated_at = tables.now();
        tables.orders.insert(order.id, order.clone());
        Ok(())
    }

    fn referenced_by_completed_order(&self, id: AddressId) -> Result<bool, StoreError> {
        Ok(self
            .inner
            .borrow()
            .orders
            .values()
            .any(|order| order.is_complete() && order.references(id)))
    }

    fn transaction<T, E>(&self, f: impl FnOnce(&Self) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let snapshot = self.inner.borrow().clone();
        let result = f(self);
        if result.is_err() {
            *self.inner.borrow_mut() = snapshot;
        }
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn saved(store: &MemoryStore, name: &str, account: Option<AccountId>) -> AddressRecord {
        let mut rec = AddressRecord::new(name, "1 Main St", "Springfield", "62701");
        rec.account = account;
        store.save(&mut rec).unwrap();
        rec
    }

    #[test]
    fn test_save_assigns_id_and_advances_clock() {
        let store = MemoryStore::new();
        let mut first = saved(&store, "First", None);
        let second = saved(&store, "Second", None);

        assert!(first.id.is_some());
        assert_ne!(first.id, second.id);
        assert!(second.updated_at > first.updated_at);

        let created = first.created_at;
        store.save(&mut first).unwrap();
        assert!(first.updated_at > second.updated_at);
        assert_eq!(first.created_at, created);
    }

    #[test]
    fn test_save_rejects_invalid_record() {
        let store = MemoryStore::new();
        let mut rec = AddressRecord::new("", "1 Main St", "Springfield", "62701");
        match store.save(&mut rec) {
            Err(StoreError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field.as_deref(), Some("name"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(rec.id.is_none());
    }

    #[test]
    fn test_delete_hard_when_unreferenced() {
        let store = MemoryStore::new();
        let rec = saved(&store, "Gone", None);
        assert_eq!(store.delete(&rec).unwrap(), DeleteOutcome::Deleted);
        assert!(matches!(
            store.load(rec.id.unwrap()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_soft_when_order_references() {
        let store = MemoryStore::new();
        let rec = saved(&store, "Kept", None);
        let mut order = store.new_order(None, OrderStatus::Cart);
        order.billing_address = rec.id;
        store.save_order(&mut order).unwrap();

        assert_eq!(store.delete(&rec).unwrap(), DeleteOutcome::SoftDeleted);
        let reloaded = store.load(rec.id.unwrap()).unwrap();
        assert!(reloaded.is_deleted());
    }

    #[test]
    fn test_saved_addresses_excludes_deleted_and_foreign() {
        let store = MemoryStore::new();
        let account = store.new_account("ada@example.com");
        let other = store.new_account("grace@example.com");

        let mine = saved(&store, "Mine", Some(account.id));
        saved(&store, "Theirs", Some(other.id));
        let doomed = saved(&store, "Doomed", Some(account.id));

        // Reference it so the delete soft-marks instead of removing.
        let mut order = store.new_order(Some(account.id), OrderStatus::Cart);
        order.shipping_address = doomed.id;
        store.save_order(&mut order).unwrap();
        store.delete(&doomed).unwrap();

        let listed = store.saved_addresses(account.id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id);
    }

    #[test]
    fn test_referenced_by_completed_order() {
        let store = MemoryStore::new();
        let rec = saved(&store, "Billing", None);

        let mut open = store.new_order(None, OrderStatus::Cart);
        open.billing_address = rec.id;
        store.save_order(&mut open).unwrap();
        assert!(!store.referenced_by_completed_order(rec.id.unwrap()).unwrap());

        open.status = OrderStatus::Complete;
        store.save_order(&mut open).unwrap();
        assert!(store.referenced_by_completed_order(rec.id.unwrap()).unwrap());
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let store = MemoryStore::new();
        let rec = saved(&store, "Survivor", None);

        let result: Result<(), StoreError> = store.transaction(|store| {
            store.delete(&rec)?;
            Err(StoreError::Integrity("boom".to_owned()))
        });

        assert!(result.is_err());
        assert!(store.load(rec.id.unwrap()).is_ok());
    }

    #[test]
    fn test_transaction_commits_on_ok() {
        let store = MemoryStore::new();
        let rec = saved(&store, "Doomed", None);

        let result: Result<(), StoreError> = store.transaction(|store| {
            store.delete(&rec)?;
            Ok(())
        });

        assert!(result.is_ok());
        assert!(store.load(rec.id.unwrap()).is_err());
    }
}

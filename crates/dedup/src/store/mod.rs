//! The persistence contract the engine drives.
//!
//! The core never talks to a database directly; it goes through
//! [`AddressStore`], which a deployment backs with its real repository layer
//! (Postgres in production). [`MemoryStore`] is the bundled single-threaded
//! implementation used by tests and examples.
//!
//! Every call is treated as a synchronous, atomic-per-record operation.
//! Multi-step mutations are wrapped in [`AddressStore::transaction`] so a
//! mid-sequence failure cannot leave a half-merged state.

mod memory;

pub use memory::MemoryStore;

use thiserror::Error;

use mailroom_core::{
    Account, AccountId, AddressId, AddressRecord, FieldError, Order, OrderId,
};

/// Errors from the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No address record with the given id.
    #[error("address {0} not found")]
    NotFound(AddressId),

    /// No account with the given id.
    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    /// No order with the given id.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// The record failed validation and was not persisted. Recoverable:
    /// callers fold the field errors into the operation outcome.
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// The underlying store reported an integrity failure.
    #[error("data integrity error: {0}")]
    Integrity(String),
}

/// How a delete request was honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The record was removed outright.
    Deleted,
    /// Other collaborators still reference the record, so it was soft-marked
    /// deleted instead. It must be treated as gone from future listings.
    SoftDeleted,
}

/// Persistence and ownership collaborator for the dedup engine.
///
/// Implementations are expected to be request-scoped: the engine performs one
/// edit or lookup fully within one transaction, so methods take `&self` and
/// interior mutability (or a connection handle) supplies the write path.
pub trait AddressStore {
    /// Load an address record by id, including soft-deleted records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no record exists.
    fn load(&self, id: AddressId) -> Result<AddressRecord, StoreError>;

    /// Validate and persist a record.
    ///
    /// Assigns an identifier on first save and bumps the last-modified
    /// timestamp on every save.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] with the field errors if the
    /// record is invalid, [`StoreError::NotFound`] if the record carries an
    /// id the store has never seen.
    fn save(&self, record: &mut AddressRecord) -> Result<(), StoreError>;

    /// Delete a record, falling back to a soft delete when other
    /// collaborators (orders, account defaults) still reference it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the record was never persisted.
    fn delete(&self, record: &AddressRecord) -> Result<DeleteOutcome, StoreError>;

    /// All of an account's saved, non-deleted addresses.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AccountNotFound`] for an unknown account.
    fn saved_addresses(&self, account: AccountId) -> Result<Vec<AddressRecord>, StoreError>;

    /// Load an account.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AccountNotFound`] for an unknown account.
    fn load_account(&self, id: AccountId) -> Result<Account, StoreError>;

    /// Persist an account (default address pointers included) and bump its
    /// last-modified timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] if the account is invalid,
    /// [`StoreError::AccountNotFound`] for an unknown account.
    fn save_account(&self, account: &mut Account) -> Result<(), StoreError>;

    /// Load an order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OrderNotFound`] for an unknown order.
    fn load_order(&self, id: OrderId) -> Result<Order, StoreError>;

    /// Persist an order's address references and bump its last-modified
    /// timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OrderNotFound`] for an unknown order.
    fn save_order(&self, order: &mut Order) -> Result<(), StoreError>;

    /// Whether any *completed* order references this address as its billing
    /// or shipping address. Such records are immutable history.
    ///
    /// # Errors
    ///
    /// Returns a store error if the reference scan fails.
    fn referenced_by_completed_order(&self, id: AddressId) -> Result<bool, StoreError>;

    /// Run `f` inside a transaction boundary.
    ///
    /// If `f` returns an error, every store mutation it made is rolled back
    /// and the error is returned unchanged. Recoverable validation problems
    /// are *not* errors here - callers collect them into their outcome and
    /// return `Ok`, so partial progress past a validation failure commits.
    ///
    /// # Errors
    ///
    /// Whatever `f` returns.
    fn transaction<T, E>(&self, f: impl FnOnce(&Self) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
        Self: Sized;
}

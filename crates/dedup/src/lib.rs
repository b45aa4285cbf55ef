//! Mailroom Dedup - address equivalence and reconciliation.
//!
//! A customer accumulates postal addresses across orders and a saved address
//! book. This crate decides when two stored records are logically the same
//! address, presents one canonical record per equivalence class, and
//! reconciles every reference (account defaults, order billing/shipping)
//! when an edit moves a record between classes.
//!
//! # Architecture
//!
//! Leaf-first:
//!
//! - [`compare`] - pure normalized comparison of two address records
//! - [`group`] - a cluster of mutually equivalent records with a canonical
//!   primary and tracked role assignments
//! - [`list`] - the full set of equivalence classes for an account and/or
//!   order scope, with lookup
//! - [`reconcile`] - what happens when an address is edited: merge, destroy
//!   duplicates, re-point references
//! - [`store`] - the persistence contract the engine drives, plus an
//!   in-memory implementation
//!
//! Groups and lists are ephemeral: they are computed per request from a
//! consistent snapshot and never persisted.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod compare;
pub mod error;
pub mod group;
pub mod list;
pub mod reconcile;
pub mod store;

pub use compare::{ComparisonKey, same_as};
pub use error::{DedupError, InvariantViolation};
pub use group::{AddressGroup, RoleAssignments};
pub use list::{AddressList, EquivalenceClass, ListScope};
pub use reconcile::{Reconciliation, reconcile};
pub use store::{AddressStore, DeleteOutcome, MemoryStore, StoreError};

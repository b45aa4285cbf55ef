//! Core types for Mailroom.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod account;
pub mod address;
pub mod id;
pub mod order;

pub use account::Account;
pub use address::{AddressChanges, AddressRecord, FieldError};
pub use id::*;
pub use order::{Order, OrderStatus, ParseOrderStatusError};

//! Mailroom Core - Shared types library.
//!
//! This crate provides the domain types used across all Mailroom components:
//! - `dedup` - Address equivalence, grouping, and reconciliation engine
//! - `integration-tests` - End-to-end scenario tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, the address record and its edit patch, accounts,
//!   and orders

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

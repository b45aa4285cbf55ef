//! Error types for the dedup engine.
//!
//! Two tiers: [`InvariantViolation`] and [`DedupError`] are fatal and abort
//! the operation (they signal data corruption or a caller bug). Recoverable
//! conditions - validation failures, edits to locked records - travel as
//! `FieldError` values on the operation outcome instead (see
//! [`crate::reconcile::Reconciliation`]).

use thiserror::Error;

use mailroom_core::{AccountId, AddressId};

use crate::store::StoreError;

/// A group was constructed from records that cannot legally share a group.
///
/// Never downgraded: any of these means some other code path has corrupted
/// the data this engine reads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A role assignment names a record that is not a group member.
    #[error("{role} address {id} is not a member of the group")]
    RoleOutsideGroup {
        /// Which role slot pointed outside the group.
        role: &'static str,
        /// The offending address id.
        id: AddressId,
    },

    /// Two account-owned members belong to different accounts.
    #[error("group members belong to different accounts ({first} and {second})")]
    MixedOwners {
        /// Owner of the first account-owned member.
        first: AccountId,
        /// The conflicting owner.
        second: AccountId,
    },

    /// A member is not equivalent to the first member.
    #[error("group member at position {position} is not equivalent to the first member")]
    NotEquivalent {
        /// Zero-based position of the offending member in the input.
        position: usize,
    },

    /// More than two ownerless members. An order only ever contributes a
    /// billing and a shipping address.
    #[error("group has {count} ownerless members, at most 2 are allowed")]
    TooManyOwnerless {
        /// Number of ownerless members supplied.
        count: usize,
    },
}

/// Fatal errors from list construction and reconciliation.
#[derive(Debug, Error)]
pub enum DedupError {
    /// A computed group failed its invariants.
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    /// A caller tried to resolve an address owned by a different account
    /// than the one in scope. Never silently reassigned.
    #[error("address belongs to account {owner}, not account {scope}")]
    OwnershipMismatch {
        /// Who actually owns the address.
        owner: AccountId,
        /// The account the operation was scoped to.
        scope: AccountId,
    },

    /// The persistence collaborator failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type alias for [`DedupError`].
pub type Result<T> = std::result::Result<T, DedupError>;

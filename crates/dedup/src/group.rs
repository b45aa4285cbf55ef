//! A cluster of mutually equivalent address records.
//!
//! Groups are ephemeral: computed per request from a consistent snapshot,
//! never persisted, discarded when the operation ends. Construction enforces
//! the invariants that make the rest of the engine safe - mutual
//! equivalence, a single owning account, at most two ownerless members (an
//! order only ever contributes a billing and a shipping address).

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use mailroom_core::{AccountId, AddressChanges, AddressId, AddressRecord, FieldError};

use crate::compare::same_as;
use crate::error::InvariantViolation;
use crate::store::{AddressStore, DeleteOutcome, StoreError};

/// The four role slots an address can fill within one scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleAssignments {
    /// The account's default billing address.
    pub account_billing: Option<AddressId>,
    /// The account's default shipping address.
    pub account_shipping: Option<AddressId>,
    /// The order's billing address.
    pub order_billing: Option<AddressId>,
    /// The order's shipping address.
    pub order_shipping: Option<AddressId>,
}

impl RoleAssignments {
    /// Merge two assignment sets; slots already filled in `self` win.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self {
            account_billing: match self.account_billing {
                Some(id) => Some(id),
                None => other.account_billing,
            },
            account_shipping: match self.account_shipping {
                Some(id) => Some(id),
                None => other.account_shipping,
            },
            order_billing: match self.order_billing {
                Some(id) => Some(id),
                None => other.order_billing,
            },
            order_shipping: match self.order_shipping {
                Some(id) => Some(id),
                None => other.order_shipping,
            },
        }
    }

    /// The assignments whose address ids appear in `ids`.
    #[must_use]
    pub fn restricted_to(&self, ids: &HashSet<AddressId>) -> Self {
        let keep = |slot: Option<AddressId>| slot.filter(|id| ids.contains(id));
        Self {
            account_billing: keep(self.account_billing),
            account_shipping: keep(self.account_shipping),
            order_billing: keep(self.order_billing),
            order_shipping: keep(self.order_shipping),
        }
    }

    /// Whether either account default role is assigned.
    #[must_use]
    pub const fn has_account_role(&self) -> bool {
        self.account_billing.is_some() || self.account_shipping.is_some()
    }

    /// Whether no role is assigned.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.account_billing.is_none()
            && self.account_shipping.is_none()
            && self.order_billing.is_none()
            && self.order_shipping.is_none()
    }

    fn named(&self) -> [(&'static str, Option<AddressId>); 4] {
        [
            ("account billing", self.account_billing),
            ("account shipping", self.account_shipping),
            ("order billing", self.order_billing),
            ("order shipping", self.order_shipping),
        ]
    }
}

/// A group of mutually equivalent address records.
///
/// Members are partitioned into account-owned and ownerless (order-only)
/// subsets, each ordered most-recently-modified first.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressGroup {
    owned: Vec<AddressRecord>,
    ownerless: Vec<AddressRecord>,
    roles: RoleAssignments,
}

impl AddressGroup {
    /// Build a group from records and role assignments.
    ///
    /// # Errors
    ///
    /// Returns an [`InvariantViolation`] if a role names a non-member, two
    /// account-owned members have different owners, a member is not
    /// equivalent to the first, or more than two ownerless members exist.
    /// Any of these means the snapshot this group was computed from is
    /// corrupt.
    pub fn new(
        members: Vec<AddressRecord>,
        roles: RoleAssignments,
    ) -> Result<Self, InvariantViolation> {
        let member_ids: HashSet<AddressId> = members.iter().filter_map(|m| m.id).collect();
        for (role, slot) in roles.named() {
            if let Some(id) = slot
                && !member_ids.contains(&id)
            {
                return Err(InvariantViolation::RoleOutsideGroup { role, id });
            }
        }

        let mut first_owner: Option<AccountId> = None;
        for member in &members {
            if let Some(owner) = member.account {
                match first_owner {
                    None => first_owner = Some(owner),
                    Some(first) if first != owner => {
                        return Err(InvariantViolation::MixedOwners {
                            first,
                            second: owner,
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        if let Some(first) = members.first() {
            for (position, member) in members.iter().enumerate().skip(1) {
                if !same_as(first, member) {
                    return Err(InvariantViolation::NotEquivalent { position });
                }
            }
        }

        let (owned, ownerless) = partition(members);
        if ownerless.len() > 2 {
            return Err(InvariantViolation::TooManyOwnerless {
                count: ownerless.len(),
            });
        }

        Ok(Self {
            owned,
            ownerless,
            roles,
        })
    }

    /// The canonical member: the most-recently-modified account-owned
    /// record, or the most-recently-modified record overall if none is
    /// account-owned. `None` for an empty group.
    #[must_use]
    pub fn primary(&self) -> Option<&AddressRecord> {
        self.owned.first().or_else(|| self.ownerless.first())
    }

    /// The primary member's identifier.
    #[must_use]
    pub fn id(&self) -> Option<AddressId> {
        self.primary().and_then(|p| p.id)
    }

    /// The primary member's last-modified timestamp.
    #[must_use]
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.primary().map(|p| p.updated_at)
    }

    /// The primary member's single-line display form; empty for an empty
    /// group.
    #[must_use]
    pub fn single_line(&self) -> String {
        self.primary().map(AddressRecord::single_line).unwrap_or_default()
    }

    /// The role assignments this group was built with.
    #[must_use]
    pub const fn roles(&self) -> &RoleAssignments {
        &self.roles
    }

    /// The member filling the account default billing role.
    #[must_use]
    pub fn account_billing(&self) -> Option<&AddressRecord> {
        self.member(self.roles.account_billing?)
    }

    /// The member filling the account default shipping role.
    #[must_use]
    pub fn account_shipping(&self) -> Option<&AddressRecord> {
        self.member(self.roles.account_shipping?)
    }

    /// The member filling the order billing role.
    #[must_use]
    pub fn order_billing(&self) -> Option<&AddressRecord> {
        self.member(self.roles.order_billing?)
    }

    /// The member filling the order shipping role.
    #[must_use]
    pub fn order_shipping(&self) -> Option<&AddressRecord> {
        self.member(self.roles.order_shipping?)
    }

    /// The account-owned members, most recent first.
    #[must_use]
    pub fn account_owned(&self) -> &[AddressRecord] {
        &self.owned
    }

    /// The ownerless (order-only) members, most recent first.
    #[must_use]
    pub fn ownerless(&self) -> &[AddressRecord] {
        &self.ownerless
    }

    /// All members: account-owned first, then ownerless.
    pub fn members(&self) -> impl Iterator<Item = &AddressRecord> {
        self.owned.iter().chain(self.ownerless.iter())
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.owned.len() + self.ownerless.len()
    }

    /// Whether the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owned.is_empty() && self.ownerless.is_empty()
    }

    /// Whether a record with this id is a member.
    #[must_use]
    pub fn contains(&self, id: AddressId) -> bool {
        self.members().any(|m| m.id == Some(id))
    }

    fn member(&self, id: AddressId) -> Option<&AddressRecord> {
        self.members().find(|m| m.id == Some(id))
    }

    /// Delete every member except the one that will be kept (the eventual
    /// primary). No-op on a group with zero or one member.
    ///
    /// Records the store cannot hard-delete are soft-deleted by contract and
    /// treated as gone. Returns how many members were removed.
    ///
    /// # Errors
    ///
    /// Propagates store failures; deletion carries no recoverable
    /// validation path.
    pub fn destroy_duplicates<S: AddressStore>(&mut self, store: &S) -> Result<usize, StoreError> {
        let Some(keep) = self.primary().and_then(|p| p.id) else {
            return Ok(0);
        };

        let doomed: Vec<AddressRecord> = self
            .members()
            .filter(|m| m.id != Some(keep))
            .cloned()
            .collect();

        for record in &doomed {
            if store.delete(record)? == DeleteOutcome::SoftDeleted {
                tracing::warn!(
                    address = ?record.id,
                    "duplicate still referenced, soft-deleted instead of removed"
                );
            }
        }

        self.owned.retain(|m| m.id == Some(keep));
        self.ownerless.retain(|m| m.id == Some(keep));
        Ok(doomed.len())
    }

    /// Apply the same field changes to every remaining, editable member.
    ///
    /// A member referenced by a completed order is immutable history and is
    /// skipped. Saves continue past per-member validation failures; the
    /// accumulated field errors are returned.
    ///
    /// # Errors
    ///
    /// Propagates store failures other than validation.
    pub fn update_all_attributes<S: AddressStore>(
        &mut self,
        changes: &AddressChanges,
        store: &S,
    ) -> Result<Vec<FieldError>, StoreError> {
        let mut errors = Vec::new();

        for partition in [&mut self.owned, &mut self.ownerless] {
            for member in partition.iter_mut() {
                if let Some(id) = member.id
                    && store.referenced_by_completed_order(id)?
                {
                    tracing::debug!(address = %id, "skipping update of completed-order address");
                    continue;
                }

                let mut updated = member.clone();
                changes.apply_to(&mut updated);
                match store.save(&mut updated) {
                    Ok(()) => *member = updated,
                    Err(StoreError::Validation(mut field_errors)) => {
                        errors.append(&mut field_errors);
                    }
                    Err(other) => return Err(other),
                }
            }
            partition.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        }

        Ok(errors)
    }
}

/// Split into (account-owned, ownerless), deduplicate each partition by id,
/// order each most-recently-modified first.
fn partition(members: Vec<AddressRecord>) -> (Vec<AddressRecord>, Vec<AddressRecord>) {
    let mut owned = Vec::new();
    let mut ownerless = Vec::new();
    let mut seen: HashSet<AddressId> = HashSet::new();

    for member in members {
        if let Some(id) = member.id
            && !seen.insert(id)
        {
            continue;
        }
        if member.account.is_some() {
            owned.push(member);
        } else {
            ownerless.push(member);
        }
    }

    owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    ownerless.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    (owned, ownerless)
}

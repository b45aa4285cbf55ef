//! The full set of equivalence classes for an account and/or order scope.
//!
//! An [`AddressList`] is an ephemeral aggregate: built once per request from
//! the account's saved addresses, its default role addresses, and the
//! order's role addresses; discarded when the request ends. Each logically
//! distinct address appears exactly once, as either a bare record or a
//! group.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use mailroom_core::{
    Account, AccountId, AddressChanges, AddressId, AddressRecord, FieldError, Order, OrderId,
};

use crate::compare::ComparisonKey;
use crate::error::DedupError;
use crate::group::{AddressGroup, RoleAssignments};
use crate::store::{AddressStore, StoreError};

/// One equivalence class: a bare record, or a group of duplicates.
///
/// Both variants expose the same capability surface (`primary`, `id`,
/// `last_modified`, `single_line`, `roles`), so callers can render or merge
/// without caring which they hold.
#[derive(Debug, Clone, PartialEq)]
pub enum EquivalenceClass {
    /// A class with exactly one member.
    Single {
        /// The sole member.
        record: AddressRecord,
        /// Role slots this record fills within the scope.
        roles: RoleAssignments,
    },
    /// A class with two or more mutually equivalent members.
    Grouped(AddressGroup),
}

impl EquivalenceClass {
    /// The canonical record of the class.
    #[must_use]
    pub fn primary(&self) -> Option<&AddressRecord> {
        match self {
            Self::Single { record, .. } => Some(record),
            Self::Grouped(group) => group.primary(),
        }
    }

    /// The canonical record's identifier.
    #[must_use]
    pub fn id(&self) -> Option<AddressId> {
        self.primary().and_then(|p| p.id)
    }

    /// The canonical record's last-modified timestamp.
    #[must_use]
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.primary().map(|p| p.updated_at)
    }

    /// The canonical record's single-line display form.
    #[must_use]
    pub fn single_line(&self) -> String {
        self.primary()
            .map(AddressRecord::single_line)
            .unwrap_or_default()
    }

    /// The role slots assigned within this class.
    #[must_use]
    pub const fn roles(&self) -> &RoleAssignments {
        match self {
            Self::Single { roles, .. } => roles,
            Self::Grouped(group) => group.roles(),
        }
    }

    /// Number of member records.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single { .. } => 1,
            Self::Grouped(group) => group.len(),
        }
    }

    /// Whether the class has no members (only possible for an empty group).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single { .. } => false,
            Self::Grouped(group) => group.is_empty(),
        }
    }

    /// Whether a record with this id is a member.
    #[must_use]
    pub fn contains(&self, id: AddressId) -> bool {
        match self {
            Self::Single { record, .. } => record.id == Some(id),
            Self::Grouped(group) => group.contains(id),
        }
    }

    /// The group, when the class holds more than one record.
    #[must_use]
    pub const fn as_group(&self) -> Option<&AddressGroup> {
        match self {
            Self::Single { .. } => None,
            Self::Grouped(group) => Some(group),
        }
    }

    /// Delete every member except the eventual primary. No-op for a single.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn destroy_duplicates<S: AddressStore>(&mut self, store: &S) -> Result<usize, StoreError> {
        match self {
            Self::Single { .. } => Ok(0),
            Self::Grouped(group) => group.destroy_duplicates(store),
        }
    }

    /// Apply the same field changes to every remaining, editable member.
    ///
    /// # Errors
    ///
    /// Propagates store failures other than validation; validation problems
    /// come back as field errors.
    pub fn update_all_attributes<S: AddressStore>(
        &mut self,
        changes: &AddressChanges,
        store: &S,
    ) -> Result<Vec<FieldError>, StoreError> {
        match self {
            Self::Single { record, .. } => {
                if let Some(id) = record.id
                    && store.referenced_by_completed_order(id)?
                {
                    tracing::debug!(address = %id, "skipping update of completed-order address");
                    return Ok(Vec::new());
                }
                let mut updated = record.clone();
                changes.apply_to(&mut updated);
                match store.save(&mut updated) {
                    Ok(()) => {
                        *record = updated;
                        Ok(Vec::new())
                    }
                    Err(StoreError::Validation(errors)) => Ok(errors),
                    Err(other) => Err(other),
                }
            }
            Self::Grouped(group) => group.update_all_attributes(changes, store),
        }
    }
}

/// What an [`AddressList`] is built over: at most one account and one order.
///
/// The conversions accept the account and order in either position, so call
/// sites don't have to remember an argument order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListScope {
    account: Option<AccountId>,
    order: Option<OrderId>,
}

impl ListScope {
    /// A scope covering nothing; builds an empty list.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            account: None,
            order: None,
        }
    }

    /// Scope over one account.
    #[must_use]
    pub const fn account(id: AccountId) -> Self {
        Self {
            account: Some(id),
            order: None,
        }
    }

    /// Scope over one order.
    #[must_use]
    pub const fn order(id: OrderId) -> Self {
        Self {
            account: None,
            order: Some(id),
        }
    }

    /// Scope over an account and an order together.
    #[must_use]
    pub const fn both(account: AccountId, order: OrderId) -> Self {
        Self {
            account: Some(account),
            order: Some(order),
        }
    }

    /// The scoped account, if any.
    #[must_use]
    pub const fn account_id(&self) -> Option<AccountId> {
        self.account
    }

    /// The scoped order, if any.
    #[must_use]
    pub const fn order_id(&self) -> Option<OrderId> {
        self.order
    }
}

impl From<AccountId> for ListScope {
    fn from(id: AccountId) -> Self {
        Self::account(id)
    }
}

impl From<OrderId> for ListScope {
    fn from(id: OrderId) -> Self {
        Self::order(id)
    }
}

impl From<(AccountId, OrderId)> for ListScope {
    fn from((account, order): (AccountId, OrderId)) -> Self {
        Self::both(account, order)
    }
}

impl From<(OrderId, AccountId)> for ListScope {
    fn from((order, account): (OrderId, AccountId)) -> Self {
        Self::both(account, order)
    }
}

/// Every equivalence class within a scope, most recently modified first.
#[derive(Debug)]
pub struct AddressList {
    scope: ListScope,
    account: Option<Account>,
    order: Option<Order>,
    classes: Vec<EquivalenceClass>,
}

impl AddressList {
    /// Build the list for a scope.
    ///
    /// Collects the account's saved addresses plus its default role
    /// addresses and the order's role addresses, deduplicates by id,
    /// partitions into equivalence classes by owner-ignoring comparison key,
    /// and sorts by last-modified descending.
    ///
    /// A default address found to be owned by a *different* account (a
    /// data-integrity bug from some other code path) is defensively cloned
    /// and re-owned rather than crashing the read path; if the clone cannot
    /// be saved the default pointer is cleared instead.
    ///
    /// # Errors
    ///
    /// Returns a [`DedupError`] on store failures or when a computed class
    /// violates the group invariants.
    pub fn build<S: AddressStore>(
        store: &S,
        scope: impl Into<ListScope>,
    ) -> Result<Self, DedupError> {
        let scope = scope.into();
        let mut account = scope
            .account_id()
            .map(|id| store.load_account(id))
            .transpose()?;
        let order = scope
            .order_id()
            .map(|id| store.load_order(id))
            .transpose()?;

        let mut pool: Vec<AddressRecord> = Vec::new();

        if let Some(acct) = account.as_mut() {
            pool.extend(store.saved_addresses(acct.id)?);

            let mut healed = false;
            let account_id = acct.id;
            let mut slots = [&mut acct.default_billing, &mut acct.default_shipping];
            for slot in &mut slots {
                if let Some(record) = resolve_default(store, account_id, slot, &mut healed)? {
                    pool.push(record);
                }
            }

            if healed {
                match store.save_account(acct) {
                    Ok(()) => {
                        tracing::warn!(account = %acct.id, "healed foreign-owned default address");
                    }
                    Err(StoreError::Validation(errors)) => {
                        tracing::warn!(
                            account = %acct.id,
                            ?errors,
                            "could not persist healed default pointers"
                        );
                    }
                    Err(other) => return Err(other.into()),
                }
            }
        }

        if let Some(ord) = order.as_ref() {
            for slot in [ord.billing_address, ord.shipping_address] {
                let Some(id) = slot else { continue };
                match store.load(id) {
                    Ok(record) if record.is_deleted() => {}
                    Ok(record) => pool.push(record),
                    Err(StoreError::NotFound(_)) => {
                        tracing::warn!(order = %ord.id, address = %id, "order references a missing address");
                    }
                    Err(other) => return Err(other.into()),
                }
            }
        }

        // Deduplicate by identifier: the same record can arrive as both a
        // saved address and a role address.
        let mut seen: HashSet<AddressId> = HashSet::new();
        pool.retain(|record| record.id.is_none_or(|id| seen.insert(id)));

        let roles = RoleAssignments {
            account_billing: account.as_ref().and_then(|a| a.default_billing),
            account_shipping: account.as_ref().and_then(|a| a.default_shipping),
            order_billing: order.as_ref().and_then(|o| o.billing_address),
            order_shipping: order.as_ref().and_then(|o| o.shipping_address),
        };

        let mut partitions: Vec<(ComparisonKey, Vec<AddressRecord>)> = Vec::new();
        for record in pool {
            let key = ComparisonKey::of(&record).ignoring_owner();
            match partitions.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push(record),
                None => partitions.push((key, vec![record])),
            }
        }

        let mut classes = Vec::with_capacity(partitions.len());
        for (_, mut members) in partitions {
            let ids: HashSet<AddressId> = members.iter().filter_map(|m| m.id).collect();
            let class_roles = roles.restricted_to(&ids);
            if members.len() == 1 {
                let Some(record) = members.pop() else { continue };
                classes.push(EquivalenceClass::Single {
                    record,
                    roles: class_roles,
                });
            } else {
                classes.push(EquivalenceClass::Grouped(AddressGroup::new(
                    members,
                    class_roles,
                )?));
            }
        }

        classes.sort_by(|a, b| b.last_modified().cmp(&a.last_modified()));

        Ok(Self {
            scope,
            account,
            order,
            classes,
        })
    }

    /// The class whose owner-ignoring comparison key matches the candidate.
    ///
    /// Idempotent under its own output: looking up a class's primary finds
    /// the same class again.
    #[must_use]
    pub fn find(&self, candidate: &AddressRecord) -> Option<&EquivalenceClass> {
        self.position(candidate).and_then(|i| self.classes.get(i))
    }

    /// Index of the matching class, for callers that need identity.
    #[must_use]
    pub fn position(&self, candidate: &AddressRecord) -> Option<usize> {
        let key = ComparisonKey::of(candidate).ignoring_owner();
        self.classes.iter().position(|class| {
            class
                .primary()
                .is_some_and(|p| ComparisonKey::of(p).ignoring_owner() == key)
        })
    }

    /// Number of equivalence classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the list has no classes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// The class at `index`, in last-modified-descending order.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&EquivalenceClass> {
        self.classes.get(index)
    }

    /// The most recently modified class.
    #[must_use]
    pub fn first(&self) -> Option<&EquivalenceClass> {
        self.classes.first()
    }

    /// The least recently modified class.
    #[must_use]
    pub fn last(&self) -> Option<&EquivalenceClass> {
        self.classes.last()
    }

    /// Iterate the classes in order.
    pub fn iter(&self) -> std::slice::Iter<'_, EquivalenceClass> {
        self.classes.iter()
    }

    /// The scope this list was built over.
    #[must_use]
    pub const fn scope(&self) -> ListScope {
        self.scope
    }

    /// The scoped account snapshot, if any.
    #[must_use]
    pub const fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    /// The scoped order snapshot, if any.
    #[must_use]
    pub const fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    pub(crate) fn class_mut(&mut self, index: usize) -> Option<&mut EquivalenceClass> {
        self.classes.get_mut(index)
    }

    pub(crate) fn account_mut(&mut self) -> Option<&mut Account> {
        self.account.as_mut()
    }
}

impl<'a> IntoIterator for &'a AddressList {
    type Item = &'a EquivalenceClass;
    type IntoIter = std::slice::Iter<'a, EquivalenceClass>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Resolve one default-address slot, healing foreign ownership.
fn resolve_default<S: AddressStore>(
    store: &S,
    account: AccountId,
    slot: &mut Option<AddressId>,
    healed: &mut bool,
) -> Result<Option<AddressRecord>, DedupError> {
    let Some(id) = *slot else {
        return Ok(None);
    };

    let record = match store.load(id) {
        Ok(record) => record,
        Err(StoreError::NotFound(_)) => {
            tracing::warn!(account = %account, address = %id, "default points at a missing address");
            return Ok(None);
        }
        Err(other) => return Err(other.into()),
    };

    if record.is_deleted() {
        return Ok(None);
    }

    match record.account {
        Some(owner) if owner != account => {
            tracing::warn!(
                account = %account,
                address = %id,
                actual_owner = %owner,
                "default address owned by another account, re-owning a clone"
            );
            let mut clone = record.detach();
            clone.account = Some(account);
            match store.save(&mut clone) {
                Ok(()) => {
                    *slot = clone.id;
                    *healed = true;
                    Ok(Some(clone))
                }
                Err(StoreError::Validation(_)) => {
                    *slot = None;
                    *healed = true;
                    Ok(None)
                }
                Err(other) => Err(other.into()),
            }
        }
        _ => Ok(Some(record)),
    }
}

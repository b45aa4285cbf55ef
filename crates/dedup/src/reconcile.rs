//! What happens when an address is edited.
//!
//! One edit can do much more than change a record's fields: the new values
//! may land the record in an existing equivalence class (the edit becomes a
//! merge), the old values may have been part of a class whose duplicates
//! should collapse, and the account's default pointers may need to follow
//! the surviving record. This module runs that whole sequence inside one
//! store transaction.

use mailroom_core::{AddressChanges, AddressRecord, FieldError};

use crate::error::DedupError;
use crate::list::{AddressList, EquivalenceClass};
use crate::store::{AddressStore, StoreError};

/// The outcome of reconciling one edit.
///
/// Recoverable problems (validation failures, an edit to a locked record)
/// arrive as [`FieldError`]s on `errors` rather than as an `Err`; only
/// integrity violations abort.
#[derive(Debug)]
pub struct Reconciliation {
    /// The record the edit resolved to. Not necessarily the record that was
    /// edited: a merge resolves to the surviving class's primary.
    pub address: AddressRecord,
    /// Accumulated recoverable errors. Empty on full success.
    pub errors: Vec<FieldError>,
    /// Snapshot of the class the *old* field values matched, taken before
    /// any destruction.
    pub old_match: Option<EquivalenceClass>,
    /// Snapshot of the class the *new* field values matched, taken before
    /// any destruction.
    pub new_match: Option<EquivalenceClass>,
}

impl Reconciliation {
    /// Whether every step succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether the edit was absorbed into a different existing class.
    #[must_use]
    pub fn merged(&self) -> bool {
        match (&self.new_match, &self.old_match) {
            (Some(new), Some(old)) => new.id() != old.id(),
            (Some(_), None) => true,
            _ => false,
        }
    }
}

/// Apply `changes` to `address` within the scope `list` was built over.
///
/// The sequence:
///
/// 1. Reject edits to addresses a completed order references (immutable
///    history) - surfaced as a base error, nothing mutated.
/// 2. Match the current and the patched field values against the list.
/// 3. If the new values match a *different* class, the edit is a merge:
///    collapse the old class, collapse the target class, fold the new
///    values into its survivors, and resolve to its primary.
/// 4. Otherwise, if the old values matched a class, collapse it and fold
///    the new values into its survivors.
/// 5. Otherwise apply the changes to the record directly.
/// 6. Re-point the account's default billing/shipping at the surviving
///    record when a default was involved (the previous default may just
///    have been destroyed).
///
/// Steps 2-6 run inside the store's transaction boundary: a fatal error
/// rolls everything back, while recoverable validation failures are
/// collected onto the outcome and do not undo completed sub-steps.
///
/// # Errors
///
/// Returns [`DedupError::OwnershipMismatch`] when the record belongs to a
/// different account than the scope, [`DedupError::Invariant`] and store
/// integrity failures as-is.
pub fn reconcile<S: AddressStore>(
    store: &S,
    address: &AddressRecord,
    changes: &AddressChanges,
    list: AddressList,
) -> Result<Reconciliation, DedupError> {
    if let (Some(scope), Some(owner)) = (list.scope().account_id(), address.account)
        && owner != scope
    {
        return Err(DedupError::OwnershipMismatch { owner, scope });
    }

    if let Some(id) = address.id
        && store.referenced_by_completed_order(id)?
    {
        tracing::debug!(address = %id, "edit rejected, address is completed-order history");
        return Ok(Reconciliation {
            address: address.clone(),
            errors: vec![FieldError::base(
                "address is attached to a completed order and cannot be changed",
            )],
            old_match: None,
            new_match: None,
        });
    }

    store.transaction(|store| {
        let mut list = list;
        let old_position = list.position(address);
        let mut scratch = address.clone();
        changes.apply_to(&mut scratch);
        let new_position = list.position(&scratch);

        let old_match = old_position.and_then(|i| list.get(i).cloned());
        let new_match = new_position.and_then(|i| list.get(i).cloned());

        let mut errors = Vec::new();
        let resolved = match (new_position, old_position) {
            (Some(target), old) if old != Some(target) => {
                tracing::debug!("new values match another existing class, merging into it");
                if let Some(old) = old
                    && let Some(class) = list.class_mut(old)
                {
                    class.destroy_duplicates(store)?;
                }
                collapse_into(&mut list, target, changes, store, &mut errors)?
                    .unwrap_or(scratch)
            }
            (_, Some(position)) => {
                collapse_into(&mut list, position, changes, store, &mut errors)?
                    .unwrap_or(scratch)
            }
            _ => {
                let mut record = scratch;
                match store.save(&mut record) {
                    Ok(()) => {}
                    Err(StoreError::Validation(mut failed)) => errors.append(&mut failed),
                    Err(other) => return Err(other.into()),
                }
                record
            }
        };

        repoint_defaults(
            &mut list,
            address,
            &resolved,
            [old_match.as_ref(), new_match.as_ref()],
            store,
            &mut errors,
        )?;

        Ok(Reconciliation {
            address: resolved,
            errors,
            old_match,
            new_match,
        })
    })
}

/// Collapse a class to its primary and fold the changes into the survivors.
/// Returns the surviving primary.
fn collapse_into<S: AddressStore>(
    list: &mut AddressList,
    position: usize,
    changes: &AddressChanges,
    store: &S,
    errors: &mut Vec<FieldError>,
) -> Result<Option<AddressRecord>, DedupError> {
    let Some(class) = list.class_mut(position) else {
        return Ok(None);
    };
    class.destroy_duplicates(store)?;
    errors.extend(class.update_all_attributes(changes, store)?);
    Ok(class.primary().cloned())
}

/// Step 6: follow the surviving record with the account's default pointers.
fn repoint_defaults<S: AddressStore>(
    list: &mut AddressList,
    edited: &AddressRecord,
    resolved: &AddressRecord,
    matches: [Option<&EquivalenceClass>; 2],
    store: &S,
    errors: &mut Vec<FieldError>,
) -> Result<(), DedupError> {
    let Some(account) = list.account_mut() else {
        return Ok(());
    };
    if resolved.account != Some(account.id) || edited.account != Some(account.id) {
        return Ok(());
    }

    let had_billing = matches
        .iter()
        .flatten()
        .any(|class| class.roles().account_billing.is_some());
    let had_shipping = matches
        .iter()
        .flatten()
        .any(|class| class.roles().account_shipping.is_some());

    let mut changed = false;
    if had_billing && account.default_billing != resolved.id {
        account.default_billing = resolved.id;
        changed = true;
    }
    if had_shipping && account.default_shipping != resolved.id {
        account.default_shipping = resolved.id;
        changed = true;
    }

    if changed {
        tracing::debug!(account = %account.id, address = ?resolved.id, "re-pointing default addresses");
        match store.save_account(account) {
            Ok(()) => {}
            Err(StoreError::Validation(mut failed)) => errors.append(&mut failed),
            Err(other) => return Err(other.into()),
        }
    }
    Ok(())
}

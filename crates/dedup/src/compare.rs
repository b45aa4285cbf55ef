//! Normalized address comparison.
//!
//! Equivalence is a deterministic, exact comparison of normalized field
//! values - not fuzzy matching. Two records are the same address when every
//! string field matches after lower-casing and whitespace-collapsing, the
//! reference fields match by id, and the owner rule holds.

use mailroom_core::{AccountId, AddressRecord, CountryId, RegionId};

/// The normalized comparison key of an address record.
///
/// Derived, never stored. Identifier, timestamps, and the deletion marker
/// are excluded; the owner is carried separately so the owner rule can
/// consult it without mixing it into the field comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComparisonKey {
    owner: Option<AccountId>,
    fields: NormalizedFields,
}

/// Every compared field, lower-cased and whitespace-collapsed. Blank
/// optional fields normalize to absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NormalizedFields {
    name: String,
    organization: Option<String>,
    street1: String,
    street2: Option<String>,
    city: String,
    region: Option<RegionId>,
    region_name: Option<String>,
    postal_code: String,
    country: Option<CountryId>,
    phone: Option<String>,
    alt_phone: Option<String>,
}

impl ComparisonKey {
    /// Compute the key for a record. Deterministic, no side effects.
    #[must_use]
    pub fn of(record: &AddressRecord) -> Self {
        Self {
            owner: record.account,
            fields: NormalizedFields {
                name: normalize(&record.name),
                organization: normalize_opt(record.organization.as_deref()),
                street1: normalize(&record.street1),
                street2: normalize_opt(record.street2.as_deref()),
                city: normalize(&record.city),
                region: record.region,
                region_name: normalize_opt(record.region_name.as_deref()),
                postal_code: normalize(&record.postal_code),
                country: record.country,
                phone: normalize_opt(record.phone.as_deref()),
                alt_phone: normalize_opt(record.alt_phone.as_deref()),
            },
        }
    }

    /// The key with the owner component removed.
    ///
    /// This is the partition/lookup key: listing and `find` group records
    /// across ownership, and the owner rule is enforced separately at group
    /// construction.
    #[must_use]
    pub fn ignoring_owner(mut self) -> Self {
        self.owner = None;
        self
    }

    /// The owner component, if any.
    #[must_use]
    pub const fn owner(&self) -> Option<AccountId> {
        self.owner
    }

    /// Whether two keys identify the same address under the owner rule:
    ///
    /// - both owners present and different: never the same, whatever the
    ///   other fields say
    /// - at most one owner present: owner is excluded from the comparison
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        match (self.owner, other.owner) {
            (Some(a), Some(b)) if a != b => false,
            _ => self.fields == other.fields,
        }
    }
}

/// Whether two records represent the same physical address.
///
/// An ownerless (order-only) record may equal any account's record; records
/// owned by two different accounts are never equivalent; two ownerless
/// records compare on fields alone, so order-only addresses from different
/// orders can still deduplicate against each other.
#[must_use]
pub fn same_as(a: &AddressRecord, b: &AddressRecord) -> bool {
    ComparisonKey::of(a).matches(&ComparisonKey::of(b))
}

/// Lower-case and collapse every whitespace run to a single space.
fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalize an optional field; blank values become absent.
fn normalize_opt(s: Option<&str>) -> Option<String> {
    let normalized = normalize(s?);
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

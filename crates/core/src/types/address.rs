//! The address record and its edit patch.
//!
//! An [`AddressRecord`] is one postal address, optionally owned by an
//! account. Records that belong to no account exist only because an order
//! referenced them at checkout. Deleted records are soft-marked rather than
//! destroyed so historical orders keep their addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::id::{AccountId, AddressId, CountryId, RegionId};

/// A structured, recoverable error attached to a record or an operation
/// outcome.
///
/// `field` is `None` for base errors that concern the record as a whole
/// (for example "address is attached to a completed order").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the offending field, or `None` for a base error.
    pub field: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl FieldError {
    /// Create an error attached to a named field.
    #[must_use]
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.to_owned()),
            message: message.into(),
        }
    }

    /// Create a base error that concerns the whole record.
    #[must_use]
    pub fn base(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{field} {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// A single postal address, optionally owned by an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    /// Surrogate identifier. `None` until the record is first persisted;
    /// stable afterwards.
    pub id: Option<AddressId>,
    /// Owning account, or `None` for an order-only address.
    pub account: Option<AccountId>,
    /// Recipient name.
    pub name: String,
    /// Company or organization line.
    pub organization: Option<String>,
    /// First street line.
    pub street1: String,
    /// Second street line.
    pub street2: Option<String>,
    /// City.
    pub city: String,
    /// Region (state/province) reference, when the country has structured
    /// subdivisions.
    pub region: Option<RegionId>,
    /// Free-text region name, used where no [`RegionId`] applies.
    pub region_name: Option<String>,
    /// Postal/ZIP code.
    pub postal_code: String,
    /// Country reference.
    pub country: Option<CountryId>,
    /// Phone number.
    pub phone: Option<String>,
    /// Alternate phone number.
    pub alt_phone: Option<String>,
    /// Soft-deletion marker. A deleted record is hidden from listings but
    /// kept for history.
    pub deleted_at: Option<DateTime<Utc>>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
}

impl AddressRecord {
    /// Create a fresh, unsaved record with the required fields set.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        street1: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            account: None,
            name: name.into(),
            organization: None,
            street1: street1.into(),
            street2: None,
            city: city.into(),
            region: None,
            region_name: None,
            postal_code: postal_code.into(),
            country: None,
            phone: None,
            alt_phone: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the record has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether the record has been persisted yet.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// A detached copy of the field values: no identifier, no owner, fresh
    /// timestamps.
    ///
    /// Used when a record must not be mutated in place (for example one held
    /// by a completed order) and the edit has to fork it instead.
    #[must_use]
    pub fn detach(&self) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            account: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    /// Format the address as a single line, skipping blank parts.
    #[must_use]
    pub fn single_line(&self) -> String {
        let mut parts = Vec::new();

        for part in [
            Some(self.street1.as_str()),
            self.street2.as_deref(),
            Some(self.city.as_str()),
            self.region_name.as_deref(),
            Some(self.postal_code.as_str()),
        ]
        .into_iter()
        .flatten()
        {
            if !part.trim().is_empty() {
                parts.push(part.trim().to_owned());
            }
        }

        parts.join(", ")
    }

    /// Validate the required fields.
    ///
    /// Returns one [`FieldError`] per blank required field; empty when the
    /// record is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("name", self.name.as_str()),
            ("street1", self.street1.as_str()),
            ("city", self.city.as_str()),
            ("postal_code", self.postal_code.as_str()),
        ] {
            if value.trim().is_empty() {
                errors.push(FieldError::new(field, "can't be blank"));
            }
        }

        errors
    }
}

/// A pending edit to an [`AddressRecord`].
///
/// Every field is optional: `None` leaves the record's value untouched. For
/// the optional string fields, a blank `Some` clears the value. The reference
/// fields use a nested `Option` so `Some(None)` can clear them explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressChanges {
    /// Recipient name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Company or organization line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// First street line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street1: Option<String>,
    /// Second street line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street2: Option<String>,
    /// City.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Region reference; `Some(None)` clears it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<Option<RegionId>>,
    /// Free-text region name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
    /// Postal/ZIP code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// Country reference; `Some(None)` clears it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<Option<CountryId>>,
    /// Phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Alternate phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_phone: Option<String>,
}

impl AddressChanges {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.organization.is_none()
            && self.street1.is_none()
            && self.street2.is_none()
            && self.city.is_none()
            && self.region.is_none()
            && self.region_name.is_none()
            && self.postal_code.is_none()
            && self.country.is_none()
            && self.phone.is_none()
            && self.alt_phone.is_none()
    }

    /// Apply the patch to a record in place.
    ///
    /// Does not touch the identifier, owner, timestamps, or deletion marker.
    pub fn apply_to(&self, record: &mut AddressRecord) {
        if let Some(v) = &self.name {
            record.name = v.clone();
        }
        if let Some(v) = &self.organization {
            record.organization = non_blank(v);
        }
        if let Some(v) = &self.street1 {
            record.street1 = v.clone();
        }
        if let Some(v) = &self.street2 {
            record.street2 = non_blank(v);
        }
        if let Some(v) = &self.city {
            record.city = v.clone();
        }
        if let Some(v) = self.region {
            record.region = v;
        }
        if let Some(v) = &self.region_name {
            record.region_name = non_blank(v);
        }
        if let Some(v) = &self.postal_code {
            record.postal_code = v.clone();
        }
        if let Some(v) = self.country {
            record.country = v;
        }
        if let Some(v) = &self.phone {
            record.phone = non_blank(v);
        }
        if let Some(v) = &self.alt_phone {
            record.alt_phone = non_blank(v);
        }
    }
}

/// `None` for a blank string, `Some` of the original otherwise.
fn non_blank(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_owned())
    }
}

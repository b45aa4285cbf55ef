//! Account domain type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::id::{AccountId, AddressId};

/// A customer account.
///
/// Accounts own saved addresses and carry at most one default billing and
/// one default shipping address pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account ID.
    pub id: AccountId,
    /// The account's email address.
    pub email: String,
    /// Default billing address, if one has been chosen.
    pub default_billing: Option<AddressId>,
    /// Default shipping address, if one has been chosen.
    pub default_shipping: Option<AddressId>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Whether the given address is one of this account's defaults.
    #[must_use]
    pub fn has_default(&self, id: AddressId) -> bool {
        self.default_billing == Some(id) || self.default_shipping == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_default() {
        let now = Utc::now();
        let account = Account {
            id: AccountId::new(1),
            email: "ada@example.com".to_owned(),
            default_billing: Some(AddressId::new(10)),
            default_shipping: None,
            created_at: now,
            updated_at: now,
        };
        assert!(account.has_default(AddressId::new(10)));
        assert!(!account.has_default(AddressId::new(11)));
    }
}

//! Order domain type and status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::id::{AccountId, AddressId, OrderId};

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Still being assembled; addresses may change freely.
    #[default]
    Cart,
    /// Placed but not finalized.
    Submitted,
    /// Finalized. A complete order's addresses are immutable history.
    Complete,
    /// Canceled before completion.
    Canceled,
}

/// A customer order.
///
/// An order references at most one billing and one shipping address at a
/// time. Once the order is complete those references must never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// The account that placed the order, if any (guest checkouts have none).
    pub account: Option<AccountId>,
    /// Billing address reference.
    pub billing_address: Option<AddressId>,
    /// Shipping address reference.
    pub shipping_address: Option<AddressId>,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
    /// When the order was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Error parsing an [`OrderStatus`] from a string.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("invalid order status: {0}")]
pub struct ParseOrderStatusError(pub String);

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cart => write!(f, "cart"),
            Self::Submitted => write!(f, "submitted"),
            Self::Complete => write!(f, "complete"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ParseOrderStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cart" => Ok(Self::Cart),
            "submitted" => Ok(Self::Submitted),
            "complete" => Ok(Self::Complete),
            "canceled" => Ok(Self::Canceled),
            _ => Err(ParseOrderStatusError(s.to_owned())),
        }
    }
}

impl Order {
    /// Whether the order has been finalized.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == OrderStatus::Complete
    }

    /// Whether the given address fills this order's billing or shipping role.
    #[must_use]
    pub fn references(&self, id: AddressId) -> bool {
        self.billing_address == Some(id) || self.shipping_address == Some(id)
    }
}

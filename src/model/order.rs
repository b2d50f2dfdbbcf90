//! Represents a customer order submitted for intake.
//!
//! An order is an identifier, an ordered list of [`Item`]s and a
//! [`PaymentMethod`] reference. The core never mutates an order after it has
//! been submitted.

use crate::model::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Type-safe identifier for Orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl From<u64> for OrderId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order_{}", self.0)
    }
}

/// A single line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub description: String,
    pub price: f64,
}

impl Item {
    /// Creates a new Item, rejecting negative or non-finite prices.
    ///
    /// A price of zero is accepted.
    pub fn new(description: impl Into<String>, price: f64) -> Result<Self, ModelError> {
        let description = description.into();
        if !price.is_finite() || price < 0.0 {
            return Err(ModelError::InvalidPrice { description, price });
        }
        Ok(Self { description, price })
    }
}

/// Opaque reference to a payment instrument.
///
/// Only the token is kept; the core never stores raw card data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentMethod(pub String);

impl PaymentMethod {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub items: Vec<Item>,
    pub payment: PaymentMethod,
}

impl Order {
    /// Creates a new Order instance.
    ///
    /// # Arguments
    /// * `id` - Unique identifier (assigned by the caller or generated by the client)
    /// * `items` - Ordered list of items; may be empty
    /// * `payment` - Payment method used for pre-authorization
    pub fn new(id: impl Into<OrderId>, items: Vec<Item>, payment: PaymentMethod) -> Self {
        Self {
            id: id.into(),
            items,
            payment,
        }
    }

    /// Sum of all item prices.
    pub fn total(&self) -> f64 {
        order_total(&self.items)
    }
}

/// Calculates the total order amount. An empty slice totals `0.0`.
pub fn order_total(items: &[Item]) -> f64 {
    items.iter().map(|item| item.price).sum()
}

//! Errors raised while building model values.

use thiserror::Error;

/// Errors that can occur when constructing order data.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    /// Item prices must be finite and non-negative.
    #[error("Invalid price for item '{description}': {price}")]
    InvalidPrice { description: String, price: f64 },
}

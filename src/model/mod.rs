//! Pure data structures for the order-intake core.
//!
//! Orders are immutable once handed to the dispatcher; the validator and the
//! dispatcher only ever read them.

pub mod error;
pub mod order;

pub use error::*;
pub use order::*;

//! The inbound surface of the core: validate, then dispatch.

pub mod error;
pub mod order_client;

pub use error::*;
pub use order_client::*;

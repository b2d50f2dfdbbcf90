//! Runtime orchestration and lifecycle management.
//!
//! - [`OrderSystem`] - wires validator, dispatcher and client together and
//!   owns the drain-on-shutdown sequence
//! - [`IntakeConfig`] - TOML configuration with defaults
//! - [`setup_tracing`] - initializes the tracing/logging infrastructure

pub mod config;
pub mod order_system;
pub mod tracing;

pub use config::*;
pub use order_system::*;
pub use self::tracing::setup_tracing;

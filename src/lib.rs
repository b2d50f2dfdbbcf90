#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # Order Intake
//!
//! > **The concurrency core of an order-intake service.**
//!
//! This crate admits orders for asynchronous fulfillment under a bounded
//! worker pool, and validates each order by running independent checks in
//! parallel with fail-fast cancellation and a shared deadline. Transports
//! (gRPC, REST) sit outside and call into [`clients::OrderClient`].
//!
//! ## 🏗️ Design
//!
//! ### Validation: fan-out, fail fast
//! [`validator::OrderValidator`] spawns the payment pre-authorization and the
//! inventory lookup as independent tasks under one cancellation token. The
//! first failure cancels the token and is returned immediately; success is
//! returned only once both checks pass.
//!
//! ### Dispatch: bounded queue, bounded pool
//! [`dispatcher::OrderDispatcher`] owns a FIFO intake queue of fixed capacity
//! and `N` concurrency permits. A worker holds one permit for the whole
//! fulfillment and releases it on every exit path, so a failing or panicking
//! callback never shrinks the pool.
//!
//! ### Explicit wiring
//! [`lifecycle::OrderSystem`] builds every component once at startup and
//! hands them out. There is no process-wide mutable state.
//!
//! ## 🗺️ Module Tour
//!
//! - [`model`] - `Order`, `Item`, `PaymentMethod`, `OrderId`.
//! - [`validator`] - `OrderValidator`, `TimedCheck`, the payment and
//!   inventory ports, `ValidationFailure`.
//! - [`dispatcher`] - `OrderDispatcher`, the `FulfillOrder` port,
//!   `DispatchError`.
//! - [`clients`] - `OrderClient`: validate, then submit.
//! - [`lifecycle`] - `OrderSystem`, `IntakeConfig`, `setup_tracing`.
//! - [`simulated`] - sleep-based stand-ins for the external services.
//! - [`mock`] - scripted test doubles.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run the demo with info logs
//! RUST_LOG=info cargo run -- --orders 6
//!
//! # With a config file
//! RUST_LOG=debug cargo run -- --config intake.toml
//! ```

pub mod clients;
pub mod dispatcher;
pub mod lifecycle;
pub mod mock;
pub mod model;
pub mod simulated;
pub mod validator;

mod panic;

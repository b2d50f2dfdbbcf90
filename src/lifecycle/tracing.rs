//! # Observability & Tracing
//!
//! [`setup_tracing`] initializes structured logging with the `tracing` crate.
//! Verbosity comes from `RUST_LOG`:
//!
//! ```bash
//! # Verdicts, dispatcher lifecycle, fulfillments
//! RUST_LOG=info cargo run
//!
//! # Per-check outcomes and per-order queue activity
//! RUST_LOG=debug cargo run
//!
//! # Only the dispatcher
//! RUST_LOG=order_intake::dispatcher=debug cargo run
//! ```
//!
//! ## What Gets Traced
//!
//! - **Validation**: one span per `validate` call carrying `order_id`; each
//!   check logs its outcome at `debug`, the verdict is logged at `info`.
//! - **Dispatch**: start/drain/close at `info`, queueing and dequeueing at
//!   `debug`, fulfillment faults at `warn`.
//! - **Fulfillment**: every worker runs inside a `fulfillment` span with the
//!   order id, so callback logs are attributable.
//!
//! With `RUST_LOG=info` a single accepted order reads:
//!
//! ```text
//! INFO create_order:validate: Order accepted order_id=order_1
//! INFO fulfillment: Order fulfilled order_id=order_1 total=42.0
//! ```

pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}

//! Demo process for the order-intake core.
//!
//! Wires the [`OrderSystem`] with the simulated collaborators, pushes a batch
//! of orders through validation and dispatch, and drains on completion or on
//! Ctrl-C.

use anyhow::Context;
use clap::Parser;
use order_intake::lifecycle::{setup_tracing, IntakeConfig, OrderSystem};
use order_intake::model::{Item, ModelError, PaymentMethod};
use order_intake::simulated::{LoggingFulfillment, SimulatedInventory, SimulatedPaymentGateway};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn, Instrument};

#[derive(Debug, Parser)]
#[command(name = "order-intake", about = "Order intake demo: validate, then dispatch")]
struct Args {
    /// Path to a TOML config file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of demo orders to submit.
    #[arg(short, long, default_value_t = 6)]
    orders: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => IntakeConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => IntakeConfig::default(),
    };

    let system = OrderSystem::new(
        &config,
        Arc::new(SimulatedPaymentGateway::default().blocking("tok_stolen")),
        Arc::new(SimulatedInventory::default().sold_out("Rare Vinyl")),
        Arc::new(LoggingFulfillment::default()),
    )?;

    if let Some(mut faults) = system.take_faults() {
        tokio::spawn(async move {
            while let Some(fault) = faults.recv().await {
                warn!(error = %fault, "Fulfillment fault");
            }
        });
    }

    // Producers: one task per incoming request, the way a transport would.
    let mut requests = JoinSet::new();
    for n in 0..args.orders {
        let client = system.order_client.clone();
        let (items, token) = demo_order(n)?;
        let order = client.new_order(items, PaymentMethod::new(token));
        let span = tracing::info_span!("create_order", order_id = %order.id);
        requests.spawn(async move { client.create_order(order).await }.instrument(span));
    }

    let drained = async {
        while let Some(joined) = requests.join_next().await {
            match joined {
                Ok(Ok(order_id)) => info!(%order_id, "Accepted"),
                Ok(Err(e)) => warn!(error = %e, "Not accepted"),
                Err(e) => error!(error = %e, "Request task failed"),
            }
        }
    };

    tokio::select! {
        _ = drained => info!("All requests handled"),
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for shutdown signal")?;
            info!("Shutdown signal received, refusing new requests");
        }
    }
    // Dropping the set aborts requests still in validation before the drain.
    drop(requests);

    let report = system.shutdown().await?;
    info!(
        fulfilled = report.fulfilled,
        failed = report.failed,
        "Application completed successfully"
    );
    Ok(())
}

/// Mostly good orders, with the occasional sold-out item or blocked card.
fn demo_order(n: u64) -> Result<(Vec<Item>, &'static str), ModelError> {
    let mut items = vec![Item::new("Notebook", 4.5)?, Item::new("Pen", 1.25)?];
    let token = match n % 5 {
        3 => {
            items.push(Item::new("Rare Vinyl", 80.0)?);
            "tok_visa"
        }
        4 => "tok_stolen",
        _ => "tok_visa",
    };
    Ok((items, token))
}

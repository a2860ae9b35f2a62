//! Gasketscan - terminal client for the gasket measurement workflow.
//!
//! An operator signs in, attaches a photo of a part, lets the live
//! detection confirm the calibration card is in view, runs the analysis
//! and submits the dossier. Administrators manage operator accounts from
//! the same client.

mod api;
mod app;
mod auth;
mod capture;
mod config;
mod detect;
mod models;
mod router;
mod scan;
mod ui;
mod utils;

use std::io;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    info!("Gasketscan starting");

    let mut app = App::new()?;

    let result = ui::run(&mut app).await;

    info!("Gasketscan shutting down");
    result
}

//! Product catalog service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http (request id, trace, timeout, limits, rate limit)
//!                  │
//!                  ▼
//!              handlers ──▶ dispatch (one circuit breaker per operation)
//!                                │
//!                                ▼
//!                          catalog service ──▶ cache-aside ──▶ cache
//!                                                   │
//!                                                   └──▶ product store
//! ```

use std::path::PathBuf;

use clap::Parser;

use product_catalog::config::{default_config, load_config};
use product_catalog::lifecycle::startup;
use product_catalog::observability::logging;

#[derive(Parser)]
#[command(name = "product-catalog")]
#[command(about = "Product catalog HTTP service", version)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => default_config()?,
    };

    logging::init_logging(&config.observability)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "product-catalog starting");
    tracing::info!(
        config_file = ?cli.config,
        bind_address = %config.listener.bind_address,
        rate_limit_enabled = config.rate_limit.enabled,
        breaker_threshold = config.breaker.failure_threshold,
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

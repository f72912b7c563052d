use std::path::PathBuf;

use clap::{Parser, Subcommand};
use product_catalog::admin::handlers::{CleanupRequest, SeedRequest, SystemStatus};
use product_catalog::catalog::maintenance::{CleanupSummary, SeedSummary, DEFAULT_CLEANUP_DAYS};
use product_catalog::catalog::{InventoryReport, NewProduct};
use product_catalog::resilience::BreakerSnapshot;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

#[derive(Parser)]
#[command(name = "catalog-cli")]
#[command(about = "Admin CLI for the product catalog service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:4001")]
    url: String,

    #[arg(short, long, env = "CATALOG_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    /// Print raw JSON instead of a table
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service status
    Status,
    /// List circuit breakers and their state
    Breakers,
    /// Insert products (the built-in samples unless a file is given)
    Seed {
        /// JSON array of products: [{"name": ..., "price": ..., "activate": ...}]
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Delete inactive products not updated for a number of days
    Cleanup {
        #[arg(long, default_value_t = DEFAULT_CLEANUP_DAYS)]
        older_than_days: u32,
    },
    /// Print an inventory report, optionally saving it to a directory
    Report {
        /// Write inventory_<timestamp>.json into this directory
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );
    let client = reqwest::Client::builder().default_headers(headers).build()?;

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{}/admin/status", cli.url)).send().await?;
            let Some(res) = check(res).await else { return Ok(()) };
            let status: SystemStatus = res.json().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("version:       {}", status.version);
                println!("status:        {}", status.status);
                println!("open breakers: {}", status.open_breakers);
            }
        }
        Commands::Breakers => {
            let res = client.get(format!("{}/admin/breakers", cli.url)).send().await?;
            let Some(res) = check(res).await else { return Ok(()) };
            let breakers: Vec<BreakerSnapshot> = res.json().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&breakers)?);
            } else {
                print_breakers(&breakers);
            }
        }
        Commands::Seed { file } => {
            let products: Vec<NewProduct> = match file {
                Some(path) => serde_json::from_str(&tokio::fs::read_to_string(&path).await?)?,
                None => Vec::new(),
            };
            let res = client
                .post(format!("{}/admin/seed", cli.url))
                .json(&SeedRequest { products })
                .send()
                .await?;
            let Some(res) = check(res).await else { return Ok(()) };
            let summary: SeedSummary = res.json().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("seeded {} products (ids {:?})", summary.seeded, summary.ids);
            }
        }
        Commands::Cleanup { older_than_days } => {
            let res = client
                .post(format!("{}/admin/cleanup", cli.url))
                .json(&CleanupRequest { older_than_days })
                .send()
                .await?;
            let Some(res) = check(res).await else { return Ok(()) };
            let summary: CleanupSummary = res.json().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "removed {} inactive products last updated before {}",
                    summary.removed, summary.cutoff
                );
            }
        }
        Commands::Report { output_dir } => {
            let res = client.get(format!("{}/admin/report", cli.url)).send().await?;
            let Some(res) = check(res).await else { return Ok(()) };
            let report: InventoryReport = res.json().await?;
            let pretty = serde_json::to_string_pretty(&report)?;

            if let Some(dir) = output_dir {
                tokio::fs::create_dir_all(&dir).await?;
                let path = dir.join(format!("inventory_{}.json", report.timestamp.timestamp_millis()));
                tokio::fs::write(&path, &pretty).await?;
                eprintln!("report written to {}", path.display());
            }
            if cli.json {
                println!("{}", pretty);
            } else {
                println!("total products:  {}", report.total_products);
                println!("active products: {}", report.active_products);
                println!("total value:     {:.2}", report.total_value);
                println!("generated at:    {}", report.timestamp);
            }
        }
    }

    Ok(())
}

async fn check(res: reqwest::Response) -> Option<reqwest::Response> {
    let status = res.status();
    if status.is_success() {
        return Some(res);
    }
    eprintln!("Error: Admin API returned status {}", status);
    if let Ok(text) = res.text().await {
        eprintln!("Response: {}", text);
    }
    None
}

fn print_breakers(breakers: &[BreakerSnapshot]) {
    if breakers.is_empty() {
        println!("no breakers created yet");
        return;
    }
    println!("{:<20} {:<10} {:>9} {:>10}", "OPERATION", "STATE", "FAILURES", "RETRY IN");
    for b in breakers {
        let retry = b
            .retry_in_secs
            .map(|secs| format!("{secs}s"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<20} {:<10} {:>4}/{:<4} {:>10}",
            b.operation,
            b.state.to_string(),
            b.failure_count,
            b.failure_threshold,
            retry
        );
    }
}

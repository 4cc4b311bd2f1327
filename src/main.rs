use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vpc_inventory::cloud::{Connector, Ec2Connector};
use vpc_inventory::credentials::{CredentialSource, EnvCredentials, SettingsFileSource};
use vpc_inventory::report;
use vpc_inventory::scanner::{self, ScanOptions, DEFAULT_BASE_REGION, DEFAULT_CONCURRENCY};
use vpc_inventory::server::{self, AppState};
use vpc_inventory::types::ScanResult;

/// vpc-inventory — Inventory VPCs and subnets across every AWS region.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "vpc-inventory",
    version,
    about = "Inventory VPCs and subnets across every AWS region, with a JSON API and CSV export.",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Credential settings file (TOML with an [aws] section). Created from the CSV export if missing.
    #[arg(long, global = true, env = "VPC_INVENTORY_SETTINGS", default_value = "config.toml")]
    settings: PathBuf,

    /// AWS console credential export used to initialize the settings file.
    #[arg(
        long = "credentials-csv",
        global = true,
        env = "VPC_INVENTORY_CREDENTIALS_CSV",
        default_value = "Key/credentials.csv"
    )]
    credentials_csv: PathBuf,

    /// Read AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY instead of the settings file.
    #[arg(long = "from-env", global = true, default_value_t = false)]
    from_env: bool,

    /// Region queried for the list of enabled regions.
    #[arg(
        long = "base-region",
        global = true,
        env = "VPC_INVENTORY_BASE_REGION",
        default_value = DEFAULT_BASE_REGION
    )]
    base_region: String,

    /// Regions scanned concurrently.
    #[arg(long, global = true, env = "VPC_INVENTORY_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Timeout for each provider call, in seconds.
    #[arg(long = "timeout-secs", global = true, env = "VPC_INVENTORY_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Serve the JSON API and static UI.
    Serve {
        #[arg(long, env = "VPC_INVENTORY_BIND", default_value = "127.0.0.1:5002")]
        bind: String,

        /// Directory of static files served outside /api.
        #[arg(long = "ui-dir", default_value = "ui")]
        ui_dir: PathBuf,
    },
    /// Run one scan, print a summary and optionally write reports.
    Scan {
        /// Write the CSV report to this path.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the full scan result as pretty JSON to this path.
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = ScanOptions {
        base_region: cli.base_region.clone(),
        concurrency: cli.concurrency,
        call_timeout: Duration::from_secs(cli.timeout_secs.max(1)),
    };
    let credentials: Arc<dyn CredentialSource> = if cli.from_env {
        Arc::new(EnvCredentials)
    } else {
        Arc::new(SettingsFileSource::new(&cli.settings, &cli.credentials_csv))
    };
    let connector: Arc<dyn Connector> = Arc::new(Ec2Connector::new(credentials));

    info!(
        base_region = %options.base_region,
        concurrency = options.concurrency,
        timeout_secs = options.call_timeout.as_secs(),
        "vpc-inventory configuration"
    );

    match cli.command {
        Command::Serve { bind, ui_dir } => {
            let state = AppState::new(connector, options);
            tokio::select! {
                res = server::spawn_server(&bind, state, &ui_dir) => res?,
                _ = tokio::signal::ctrl_c() => info!("shutting down"),
            }
        }
        Command::Scan { output, json } => {
            let api = connector.connect().context("failed to load AWS credentials")?;

            // Ctrl-C stops regions that have not started yet.
            let cancel = CancellationToken::new();
            let cancel_ctrlc = cancel.clone();
            tokio::spawn(async move {
                let _ = tokio::signal::ctrl_c().await;
                cancel_ctrlc.cancel();
            });

            let result = scanner::scan_all_with_cancel(api, &options, cancel).await;
            if !result.success {
                bail!(result.error.unwrap_or_else(|| "scan failed".to_string()));
            }
            print_results_table(&result);

            if let Some(path) = output.as_deref() {
                write_report_csv(path, &result)?;
            }
            if let Some(path) = json.as_deref() {
                write_results_json(path, &result)?;
                println!("Wrote JSON results to {}", path.display());
            }
        }
    }

    Ok(())
}

fn print_results_table(result: &ScanResult) {
    let headers = report::HEADERS;
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    let rows: Vec<[&str; 7]> = result
        .records
        .iter()
        .map(|r| {
            [
                r.region.as_str(),
                r.vpc_id.as_str(),
                r.vpc_name.as_str(),
                r.vpc_cidr.as_str(),
                r.subnet_id.as_str(),
                r.subnet_name.as_str(),
                r.subnet_cidr.as_str(),
            ]
        })
        .collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count().min(40));
        }
    }

    println!(
        "\nEntries: {} (regions scanned: {}, skipped: {})",
        result.total_entries(),
        result.regions_scanned,
        result.skipped_regions.len()
    );
    let line = |cells: &[&str]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| {
                let cell: String = c.chars().take(*w).collect();
                format!("{:<w$}", cell, w = *w)
            })
            .collect::<Vec<_>>()
            .join("  ")
    };
    println!("{}", line(&headers));
    println!(
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  ")
    );
    for row in &rows {
        println!("{}", line(row));
    }
    for skipped in &result.skipped_regions {
        println!("skipped {}: {}", skipped.region, skipped.reason);
    }
}

fn write_report_csv(path: &Path, result: &ScanResult) -> Result<()> {
    if result.records.is_empty() {
        warn!("no VPCs found; CSV report not written");
        return Ok(());
    }
    let report = report::export(&result.records)?;
    let target = if path.is_dir() {
        path.join(&report.filename)
    } else {
        path.to_path_buf()
    };
    fs::write(&target, &report.bytes)
        .with_context(|| format!("failed to write CSV to {}", target.display()))?;
    println!("Wrote CSV report to {}", target.display());
    Ok(())
}

fn write_results_json(path: &Path, result: &ScanResult) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, result)?;
    Ok(())
}

//! Sugamya command-line shell.
//!
//! Thin adapter over the scan pipeline: submit scans, wait for them (or for
//! Ctrl+C/SIGTERM and a bounded drain), and render reports.

mod app;

use anyhow::{bail, Result};
use app::App;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use sugamya_core::{AppConfig, ScanId, ScanStatus};
use sugamya_db::ScanStore;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "sugamya", version, about = "Accessibility (WCAG/GIGW) scanner")]
struct Cli {
    /// Config file (TOML). Defaults to ~/.config/sugamya/config.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scan a single page
    Scan {
        url: String,
        /// Website the scan is filed under
        #[arg(long, default_value = "default")]
        website_id: String,
        /// Write the JSON report once the scan completes
        #[arg(long)]
        report: bool,
    },
    /// Scan every page listed in a site's sitemap
    Batch {
        site_url: String,
        #[arg(long, default_value = "default")]
        website_id: String,
        #[arg(long)]
        report: bool,
    },
    /// Build and write the report for a finished scan
    Report { scan_id: String },
    /// Print a scan record as JSON
    Status { scan_id: String },
}

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sugamya=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    config.apply_env();
    config.validate()?;
    Ok(config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}

async fn summarize(app: &App, scan_id: &ScanId, render: bool) -> Result<ScanStatus> {
    let scan = app.db().get_scan(scan_id).await?;
    match &scan.diagnostics.failure {
        Some(failure) => println!(
            "{} {} ({}: {})",
            scan.id, scan.status, failure.reason, failure.message
        ),
        None => match scan.score {
            Some(score) => println!(
                "{} {} score={} issues={}",
                scan.id,
                scan.status,
                score,
                scan.findings.len()
            ),
            None => println!("{} {} issues={}", scan.id, scan.status, scan.findings.len()),
        },
    }

    if render && scan.status == ScanStatus::Completed {
        let path = app.render_report(scan_id).await?;
        println!("report: {}", path.display());
    }
    Ok(scan.status)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    info!("Starting Sugamya v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan {
            url,
            website_id,
            report,
        } => {
            let app = App::start(config).await?;
            let scan_id = app.queue().submit(&website_id, &url).await?;
            let drain = app.run_until_idle(shutdown_signal()).await;

            let status = summarize(&app, &scan_id, report).await?;
            if !drain.is_clean() || status != ScanStatus::Completed {
                std::process::exit(1);
            }
        }
        Commands::Batch {
            site_url,
            website_id,
            report,
        } => {
            let app = App::start(config).await?;
            let batch = app.queue().submit_batch(&website_id, &site_url).await?;
            info!(pages = batch.child_ids.len(), "Batch submitted");
            let drain = app.run_until_idle(shutdown_signal()).await;

            for child in &batch.child_ids {
                summarize(&app, child, false).await?;
            }
            let status = summarize(&app, &batch.parent_id, report).await?;
            if !drain.is_clean() || status != ScanStatus::Completed {
                std::process::exit(1);
            }
        }
        Commands::Report { scan_id } => {
            let scan_id = ScanId::new(scan_id)?;
            let db = app::open_database(&config).await?;
            let scan = db.get_scan(&scan_id).await?;
            if !scan.status.is_terminal() {
                bail!("scan {scan_id} is still {}", scan.status);
            }
            let path = app::report_service(&config, &db)?.render(&scan_id).await?;
            println!("{}", path.display());
            db.close().await;
        }
        Commands::Status { scan_id } => {
            let scan_id = ScanId::new(scan_id)?;
            let db = app::open_database(&config).await?;
            let scan = db.get_scan(&scan_id).await?;
            println!("{}", serde_json::to_string_pretty(&scan)?);
            db.close().await;
        }
    }

    Ok(())
}

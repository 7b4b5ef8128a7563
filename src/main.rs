//! Site Monitor Binary

use actix_web::{web, App, HttpServer};
use clap::{Parser, Subcommand};
use site_monitor::controllers;
use site_monitor::state::AppState;
use site_monitor::{Config, MonitorError, Result, SiteMonitor};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "site_monitor", version, about = "HTTP uptime monitor")]
struct Cli {
    /// Site list, overrides SITES_CONFIG
    #[arg(long, global = true)]
    sites: Option<PathBuf>,

    /// History log, overrides HISTORY_PATH
    #[arg(long, global = true)]
    history: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the read API (default)
    Serve {
        /// Listen address, overrides BIND_ADDRESS
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run one sweep and print the results
    Check,
    /// Run a cron sweep, compacting history at the daily trigger minute
    Cron,
    /// Print uptime statistics for one url
    Stats {
        #[arg(long)]
        url: String,
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    initialize_tracing();

    let cli = Cli::parse();
    info!("Starting site monitor v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::from_env();
    if let Some(sites) = cli.sites {
        config.sites_path = sites;
    }
    if let Some(history) = cli.history {
        config.history_path = history;
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    let monitor = match SiteMonitor::from_config(&config) {
        Ok(monitor) => Arc::new(monitor),
        Err(e) => {
            error!("Monitor initialization failed: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.bind_address.clone());
            serve(monitor, &config, &bind).await
        }
        Command::Check => {
            let report = monitor.run_sweep().await;
            println!("{}", serde_json::to_string_pretty(&report.results)?);
            Ok(())
        }
        Command::Cron => {
            let summary = monitor.run_cron().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Command::Stats { url, hours } => {
            let stats = monitor.stats(&url, hours).await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
    }
}

async fn serve(monitor: Arc<SiteMonitor>, config: &Config, bind: &str) -> Result<()> {
    if !config.check_interval.is_zero() {
        let periodic = Arc::clone(&monitor);
        let every = config.check_interval;
        tokio::spawn(async move {
            periodic.run_periodic(every).await;
        });
    }

    info!(
        "Serving {} endpoints at http://{}",
        monitor.endpoints().len(),
        bind
    );

    let state = AppState::new(monitor);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(controllers::configure)
    })
    .bind(bind)
    .map_err(|e| MonitorError::Config(format!("cannot bind {}: {}", bind, e)))?
    .run()
    .await?;

    info!("Site monitor shut down");
    Ok(())
}

/// Initialize structured logging
fn initialize_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

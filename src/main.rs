//! rdp-apps — remote application connection directory
//!
//! Discovers the RemoteApp programs published on a Windows host, writes
//! the gateway's connection document for every (user, application) pair,
//! and serves the apps API over HTTP.
//!
//! Usage:
//!   rdp-apps --config apps.json                  # Default port 8080
//!   rdp-apps --config apps.json --port 9000      # Custom port
//!   rdp-apps --config apps.json --log-file       # Log to ~/.rdp-apps/logs/rdp-apps.log

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use apps_directory::{DirectoryConfig, DirectoryEngine, ScriptApplicationSource, StaticUserDirectory};
use apps_server::apps_router;
use apps_transport::{TransportConfig, TransportServer};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rdp-apps", about = "RemoteApp connection directory for the RDP gateway")]
struct Cli {
    /// Directory configuration (JSON)
    #[arg(long, default_value = "apps.json")]
    config: PathBuf,

    /// Port to listen on (0 for OS-assigned)
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Hostname to bind to
    #[arg(long, default_value = "127.0.0.1")]
    hostname: String,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Skip rebuilding the connection document at startup
    #[arg(long)]
    no_initial_regenerate: bool,

    /// Write logs to a file (defaults to ~/.rdp-apps/logs/rdp-apps.log if no path given)
    #[arg(long, default_missing_value = "DEFAULT", num_args = 0..=1)]
    log_file: Option<String>,
}

fn init_tracing(cli: &Cli) -> anyhow::Result<()> {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let Some(log_file_arg) = cli.log_file.as_deref() else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(());
    };

    let log_path = if log_file_arg == "DEFAULT" {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join(".rdp-apps/logs/rdp-apps.log")
    } else {
        PathBuf::from(log_file_arg)
    };

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();

    eprintln!("Logging to {}", log_path.display());
    Ok(())
}

/// Read and validate the directory configuration.
fn load_config(path: &Path) -> anyhow::Result<DirectoryConfig> {
    DirectoryConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Arc::new(load_config(&cli.config)?);
    info!(
        "Directory for {} ({} execution servers, {} users)",
        config.server,
        config.execution_servers.len(),
        config.users.len()
    );

    let source = ScriptApplicationSource::new(config.clone());
    let users = StaticUserDirectory::new(config.users.clone());
    let engine = Arc::new(DirectoryEngine::new(config.clone(), source, users));

    if !cli.no_initial_regenerate {
        // Per-user queries read the last document; a failure here only delays it
        if let Err(e) = engine.regenerate().await {
            warn!("Initial regeneration failed: {e}");
        }
    }

    let router = apps_router(engine).context("Failed to build route table")?;

    let transport_config = TransportConfig {
        port: cli.port,
        hostname: cli.hostname.clone(),
        connections_file: Some(config.xml_configuration_file.clone()),
        verbose_logging: cli.verbose,
        ..Default::default()
    };

    let mut transport = TransportServer::start(transport_config, router)
        .await
        .context("Failed to start transport")?;

    info!(
        "Serving /api/apps on http://{}:{} (connections in {})",
        cli.hostname,
        transport.port(),
        config.xml_configuration_file.display()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutting down...");
    transport.stop().await;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

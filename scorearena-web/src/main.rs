//! scorearena-web - blind model arena for rendered scores
//!
//! Serves the arena, rating and upload UI plus its JSON API. All state lives
//! in the root folder: `uploads/` for artifacts and three append-only CSV logs.

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use scorearena_common::config::{
    default_config_path, ConfigOverrides, ServiceConfig, TomlConfig, ROOT_FOLDER_ENV,
};
use scorearena_web::{build_router, AppState};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for scorearena-web
#[derive(Parser, Debug)]
#[command(name = "scorearena-web")]
#[command(about = "Blind A/B arena for comparing rendered scores")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "SCOREARENA_PORT")]
    port: Option<u16>,

    /// Address to listen on
    #[arg(long, env = "SCOREARENA_HOST")]
    host: Option<IpAddr>,

    /// Root folder holding uploads and CSV logs
    #[arg(short, long, env = ROOT_FOLDER_ENV)]
    root_folder: Option<PathBuf>,

    /// Notation converter executable
    #[arg(long, env = "MUSESCORE_BIN")]
    converter_bin: Option<String>,

    /// Maximum upload size in bytes
    #[arg(long, env = "SCOREARENA_MAX_UPLOAD_BYTES")]
    max_upload_bytes: Option<usize>,

    /// Log level used when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The config file may carry the log level, so it is read before tracing
    // is up; a missing file is reported once logging works.
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let config_exists = config_path.exists();
    let toml_config = if config_exists {
        TomlConfig::load(&config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?
    } else {
        TomlConfig::default()
    };

    let config = ServiceConfig::resolve(
        ConfigOverrides {
            root_folder: args.root_folder,
            host: args.host,
            port: args.port,
            converter_bin: args.converter_bin,
            max_upload_bytes: args.max_upload_bytes,
            log_level: args.log_level,
        },
        toml_config,
    );

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("scorearena_web={0},scorearena_common={0},tower_http=info", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting scorearena-web v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if config_exists {
        info!("Config file: {}", config_path.display());
    } else {
        info!(
            "Config file {} not found, using built-in defaults",
            config_path.display()
        );
    }

    info!("Root folder: {}", config.root_folder.display());
    info!("Converter: {}", config.converter_bin);
    config
        .ensure_directories()
        .context("Failed to prepare root folder")?;

    let state = AppState::new(&config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("scorearena-web listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use netcaster::{
    config::Config,
    database::Database,
    job_scheduling::BroadcastJobs,
    services::{
        BroadcastSupervisor, ScheduleGenerator,
        broadcast::{HttpControlPlane, LeaseRegistry, UpstreamResolver, build_probe},
    },
    utils::UrlUtils,
    web::{AppState, WebServer},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "netcaster")]
#[command(version)]
#[command(about = "Virtual linear broadcast networks served as live HLS")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Database URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.log_level == "trace" {
        format!("netcaster={},tower_http=trace", cli.log_level)
    } else {
        format!("netcaster={}", cli.log_level)
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| log_filter.into());
    let registry = tracing_subscriber::registry().with(env_filter);
    match cli.log_format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }

    info!("Starting netcaster v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }

    info!(
        "Using database: {}",
        UrlUtils::obfuscate_credentials(&config.database.url)
    );
    let database = Database::new(&config.database).await?;
    database.migrate().await?;
    info!("Database connection established and migrations applied");

    let control_plane = Arc::new(HttpControlPlane::new(&config.broadcast)?);
    info!(
        "Transcoding control plane: {} (probe: {:?})",
        UrlUtils::obfuscate_credentials(&config.broadcast.control_plane_url),
        config.broadcast.probe
    );
    let probe = build_probe(config.broadcast.probe, control_plane.clone());

    let generator = Arc::new(ScheduleGenerator::new(&database, config.schedule.clone()));
    let supervisor = Arc::new(BroadcastSupervisor::new(
        &database,
        control_plane,
        probe,
        generator.clone(),
        UpstreamResolver::new(),
        LeaseRegistry::new(config.broadcast.lease_ttl),
    ));

    let cancellation_token = CancellationToken::new();

    let jobs = BroadcastJobs::new(
        supervisor.clone(),
        generator.clone(),
        config.broadcast.clone(),
        config.schedule.clone(),
    );
    let job_handles = jobs.start(cancellation_token.clone()).await;
    info!("Started {} background job(s)", job_handles.len());

    let state = AppState::new(database, supervisor, generator, config.web.base_url.clone());
    let server = WebServer::new(&config, state)?;
    info!("Starting web server on {}", server.addr());

    let shutdown_token = cancellation_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down gracefully"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
        shutdown_token.cancel();
    });

    let result = server.serve_with_cancellation(cancellation_token.clone()).await;
    cancellation_token.cancel();
    for handle in job_handles {
        if let Err(e) = handle.await {
            error!("Background job terminated abnormally: {}", e);
        }
    }

    info!("netcaster stopped");
    result
}

//! Web layer
//!
//! Public viewer endpoints (HLS playlist and segments, XMLTV), the operator
//! API under `/api/v1` and health probes. Handlers stay thin and delegate to
//! the services.

use anyhow::Result;
use axum::{
    Router,
    routing::{delete, get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::config::Config;
use crate::database::Database;
use crate::database::repositories::NetworkSeaOrmRepository;
use crate::services::{BroadcastSupervisor, EpgExporter, ScheduleGenerator};

pub mod handlers;
pub mod responses;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub networks: NetworkSeaOrmRepository,
    pub supervisor: Arc<BroadcastSupervisor>,
    pub generator: Arc<ScheduleGenerator>,
    pub exporter: Arc<EpgExporter>,
    /// Public base URL used to rewrite manifest segment references
    pub base_url: String,
}

impl AppState {
    pub fn new(
        database: Database,
        supervisor: Arc<BroadcastSupervisor>,
        generator: Arc<ScheduleGenerator>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            networks: NetworkSeaOrmRepository::new(database.connection()),
            exporter: Arc::new(EpgExporter::new(&database)),
            database,
            supervisor,
            generator,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/live", get(handlers::health::liveness_check))
        // Viewer endpoints
        .route("/network/{token}/playlist", get(handlers::hls::serve_playlist))
        .route(
            "/network/{token}/segment/{segment}",
            get(handlers::hls::serve_segment),
        )
        .route("/network/{token}/epg.xml", get(handlers::epg::serve_network_epg))
        .route("/epg.xml", get(handlers::epg::serve_epg))
        .nest("/api/v1", api_v1_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/networks/{id}", delete(handlers::networks::delete_network))
        .route(
            "/networks/{id}/broadcast",
            get(handlers::networks::get_broadcast_status),
        )
        .route(
            "/networks/{id}/broadcast/start",
            post(handlers::networks::start_broadcast),
        )
        .route(
            "/networks/{id}/broadcast/stop",
            post(handlers::networks::stop_broadcast),
        )
        .route(
            "/networks/{id}/broadcast/restart",
            post(handlers::networks::restart_broadcast),
        )
        .route(
            "/networks/{id}/schedule",
            get(handlers::networks::get_schedule),
        )
        .route(
            "/networks/{id}/schedule/regenerate",
            post(handlers::networks::regenerate_schedule),
        )
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: &Config, state: AppState) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;
        Ok(Self {
            app: create_router(state),
            addr,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until the cancellation token fires, then drain in-flight requests
    pub async fn serve_with_cancellation(self, cancellation_token: CancellationToken) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.addr, e))?;
        info!("Web server listening on {}", self.addr);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                cancellation_token.cancelled().await;
                info!("Web server received cancellation signal, shutting down gracefully");
            })
            .await?;
        Ok(())
    }
}

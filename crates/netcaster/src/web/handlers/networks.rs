//! Operator API for network broadcasts and schedules

use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, AppResult, WebError};
use crate::models::{BroadcastStatus, Network, StartOutcome, TickOutcome};
use crate::web::{AppState, responses::handle_result};

const DEFAULT_SCHEDULE_LIMIT: u64 = 24;
const MAX_SCHEDULE_LIMIT: u64 = 500;

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub from: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
}

/// Result of an operator start request
#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub outcome: TickOutcome,
    pub status: BroadcastStatus,
}

/// Result of an operator restart request
#[derive(Debug, Serialize)]
pub struct RestartResponse {
    #[serde(flatten)]
    pub outcome: StartOutcome,
    pub status: BroadcastStatus,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// `GET /api/v1/networks/{id}/broadcast`
pub async fn get_broadcast_status(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    handle_result(
        async {
            let network = load_network(&state, &id).await?;
            state.supervisor.status(&network).await
        }
        .await,
    )
}

/// `POST /api/v1/networks/{id}/broadcast/start`
pub async fn start_broadcast(Path(id): Path<String>, State(state): State<AppState>) -> Response {
    handle_result(
        async {
            let network = load_network(&state, &id).await?;
            let outcome = state.supervisor.request(&network).await?;
            let network = load_network(&state, &id).await?;
            let status = state.supervisor.status(&network).await?;
            Ok::<_, AppError>(StartResponse { outcome, status })
        }
        .await,
    )
}

/// `POST /api/v1/networks/{id}/broadcast/stop`
pub async fn stop_broadcast(Path(id): Path<String>, State(state): State<AppState>) -> Response {
    handle_result(
        async {
            let network = load_network(&state, &id).await?;
            state.supervisor.stop(&network).await
        }
        .await,
    )
}

/// `POST /api/v1/networks/{id}/broadcast/restart`
pub async fn restart_broadcast(Path(id): Path<String>, State(state): State<AppState>) -> Response {
    handle_result(
        async {
            let network = load_network(&state, &id).await?;
            let outcome = state.supervisor.restart(&network).await?;
            let network = load_network(&state, &id).await?;
            let status = state.supervisor.status(&network).await?;
            Ok::<_, AppError>(RestartResponse { outcome, status })
        }
        .await,
    )
}

/// `GET /api/v1/networks/{id}/schedule`
pub async fn get_schedule(
    Path(id): Path<String>,
    Query(query): Query<ScheduleQuery>,
    State(state): State<AppState>,
) -> Response {
    handle_result(
        async {
            let network = load_network(&state, &id).await?;
            let limit = query
                .limit
                .unwrap_or(DEFAULT_SCHEDULE_LIMIT)
                .clamp(1, MAX_SCHEDULE_LIMIT);
            let from = query.from.unwrap_or_else(Utc::now);
            state.generator.upcoming(&network.id, from, limit).await
        }
        .await,
    )
}

/// `POST /api/v1/networks/{id}/schedule/regenerate`
pub async fn regenerate_schedule(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    handle_result(
        async {
            let network = load_network(&state, &id).await?;
            state.generator.generate_schedule(&network).await
        }
        .await,
    )
}

/// `DELETE /api/v1/networks/{id}`
pub async fn delete_network(Path(id): Path<String>, State(state): State<AppState>) -> Response {
    handle_result(
        async {
            let network = load_network(&state, &id).await?;
            let deleted = state.supervisor.delete_network(&network).await?;
            Ok::<_, AppError>(DeleteResponse { deleted })
        }
        .await,
    )
}

async fn load_network(state: &AppState, id: &str) -> AppResult<Network> {
    let uuid = Uuid::parse_str(id).map_err(|e| WebError::InvalidRequest {
        field: "id".to_string(),
        message: e.to_string(),
    })?;

    state
        .networks
        .find_by_id(&uuid)
        .await?
        .ok_or_else(|| AppError::not_found("network", uuid))
}

//! HLS delivery gateway
//!
//! Proxies a network's live manifest and segments from the transcoding control
//! plane. Segment URIs in the manifest are rewritten to this server so viewers
//! only ever see the network's public token. Nothing is cached: segment
//! numbers are reused across broadcast generations.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{debug, error, warn};

use crate::config::defaults::PLAYLIST_RETRY_AFTER_SECS;
use crate::models::Network;
use crate::web::AppState;

const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
const SEGMENT_CONTENT_TYPE: &str = "video/MP2T";
const NO_CACHE: &str = "no-cache, no-store";
const MAX_SEGMENT_NAME_LEN: usize = 64;

/// `GET /network/{token}/playlist`
pub async fn serve_playlist(
    Path(token): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let network = match lookup_broadcastable(&state, &token).await {
        Ok(Some(network)) => network,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(response) => return response,
    };

    if network.broadcast_started_at.is_none() {
        debug!(
            "Network '{}' ({}): playlist requested before broadcast started",
            network.name, network.id
        );
        return warming_up();
    }

    let control_plane = state.supervisor.control_plane();
    match control_plane.fetch_playlist(&network.token).await {
        Ok(manifest) => {
            let body = rewrite_playlist(&manifest, &state.base_url, &network.token);
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, PLAYLIST_CONTENT_TYPE)
                .header(header::CACHE_CONTROL, NO_CACHE)
                .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
                .body(Body::from(body))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
        Err(e) if e.is_not_found() => {
            debug!(
                "Network '{}' ({}): manifest not ready yet",
                network.name, network.id
            );
            warming_up()
        }
        Err(e) => {
            warn!(
                "Network '{}' ({}): failed to fetch manifest: {}",
                network.name, network.id, e
            );
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

/// `GET /network/{token}/segment/{segment}`
pub async fn serve_segment(
    Path((token, segment)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Response {
    if !is_valid_segment_name(&segment) {
        return (StatusCode::BAD_REQUEST, "Invalid segment name").into_response();
    }

    let network = match lookup_broadcastable(&state, &token).await {
        Ok(Some(network)) if network.broadcast_started_at.is_some() => network,
        Ok(_) => return StatusCode::NOT_FOUND.into_response(),
        Err(response) => return response,
    };

    let name = segment.strip_suffix(".ts").unwrap_or(&segment);
    let control_plane = state.supervisor.control_plane();
    match control_plane.fetch_segment(&network.token, name).await {
        Ok(bytes) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, SEGMENT_CONTENT_TYPE)
            .header(header::CACHE_CONTROL, NO_CACHE)
            .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
            .body(Body::from(bytes))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(e) if e.is_not_found() => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!(
                "Network '{}' ({}): failed to fetch segment {}: {}",
                network.name, network.id, name, e
            );
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

/// Network by token, `None` when missing or not broadcastable
async fn lookup_broadcastable(state: &AppState, token: &str) -> Result<Option<Network>, Response> {
    match state.networks.find_by_token(token).await {
        Ok(network) => Ok(network.filter(Network::is_broadcastable)),
        Err(e) => {
            error!("Failed to look up network by token: {}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE.into_response())
        }
    }
}

fn warming_up() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(header::RETRY_AFTER, PLAYLIST_RETRY_AFTER_SECS.to_string())],
        "Broadcast is starting",
    )
        .into_response()
}

/// `^[A-Za-z0-9_-]{1,64}(\.ts)?$`
pub fn is_valid_segment_name(segment: &str) -> bool {
    let stem = segment.strip_suffix(".ts").unwrap_or(segment);
    !stem.is_empty()
        && stem.len() <= MAX_SEGMENT_NAME_LEN
        && stem
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Point every media URI of a manifest at this server's segment endpoint
pub fn rewrite_playlist(manifest: &str, base_url: &str, token: &str) -> String {
    let mut rewritten = String::with_capacity(manifest.len());
    for line in manifest.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            rewritten.push_str(line);
        } else {
            let without_query = trimmed.split(['?', '#']).next().unwrap_or(trimmed);
            let name = without_query.rsplit('/').next().unwrap_or(without_query);
            rewritten.push_str(&format!("{base_url}/network/{token}/segment/{name}"));
        }
        rewritten.push('\n');
    }
    rewritten
}

//! XMLTV endpoints

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{error, warn};

use crate::errors::AppResult;
use crate::web::AppState;

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// `GET /network/{token}/epg.xml`
pub async fn serve_network_epg(
    Path(token): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let network = match state.networks.find_by_token(&token).await {
        Ok(Some(network)) if network.enabled => network,
        Ok(_) => {
            warn!("EPG requested for unknown or disabled network token");
            return xml_response(
                StatusCode::NOT_FOUND,
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<tv><!-- Network not found --></tv>\n"
                    .to_string(),
            );
        }
        Err(e) => {
            error!("Failed to look up network for EPG: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    render(state.exporter.export_network(&network, Utc::now()).await)
}

/// `GET /epg.xml`, every enabled network
pub async fn serve_epg(State(state): State<AppState>) -> Response {
    render(state.exporter.export_all(Utc::now()).await)
}

fn render(result: AppResult<String>) -> Response {
    match result {
        Ok(xmltv) => xml_response(StatusCode::OK, xmltv),
        Err(e) => {
            error!("Failed to export XMLTV: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn xml_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, XML_CONTENT_TYPE)], body).into_response()
}

//! Client for the out-of-process transcoding control plane
//!
//! Every endpoint is keyed by the network's public token:
//!
//! | call                                   | meaning                                 |
//! |----------------------------------------|-----------------------------------------|
//! | `GET /broadcast/{t}/status`            | 200 running, 404 not running            |
//! | `POST /broadcast/{t}/start`            | start a transcoder, returns its pid     |
//! | `POST /broadcast/{t}/stop`             | stop, returns the final segment number  |
//! | `DELETE /broadcast/{t}`                | stop and remove output, best effort     |
//! | `GET /broadcast/{t}/live.m3u8`         | current manifest                        |
//! | `GET /broadcast/{t}/segment/{name}.ts` | segment bytes                           |

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::config::BroadcastConfig;
use crate::errors::{ControlPlaneError, ControlPlaneResult};
use crate::utils::UrlUtils;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    pub source_url: String,
    pub seek_seconds: i64,
    pub remaining_seconds: i64,
    pub programme_id: Uuid,
    /// First HLS media sequence number for this transcoder
    pub segment_start_number: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartResponse {
    pub status: String,
    pub pid: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopResponse {
    pub status: String,
    #[serde(default)]
    pub final_segment_number: Option<i64>,
}

#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Whether a transcoder is running for the token
    async fn status(&self, token: &str) -> ControlPlaneResult<bool>;
    async fn start(&self, token: &str, request: &StartRequest) -> ControlPlaneResult<StartResponse>;
    async fn stop(&self, token: &str) -> ControlPlaneResult<StopResponse>;
    async fn delete(&self, token: &str) -> ControlPlaneResult<()>;
    async fn fetch_playlist(&self, token: &str) -> ControlPlaneResult<String>;
    async fn fetch_segment(&self, token: &str, segment: &str) -> ControlPlaneResult<Bytes>;
}

/// reqwest implementation of [`ControlPlane`]
pub struct HttpControlPlane {
    client: Client,
    base_url: String,
}

impl HttpControlPlane {
    pub fn new(config: &BroadcastConfig) -> ControlPlaneResult<Self> {
        Self::with_timeouts(
            &config.control_plane_url,
            config.request_timeout,
            config.connect_timeout,
        )
    }

    pub fn with_timeouts(
        base_url: &str,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> ControlPlaneResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ControlPlaneError::Unreachable {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, token: &str, path: &str) -> String {
        if path.is_empty() {
            UrlUtils::join(&self.base_url, &format!("broadcast/{token}"))
        } else {
            UrlUtils::join(&self.base_url, &format!("broadcast/{token}/{path}"))
        }
    }

    /// Turn a non-success status into [`ControlPlaneError::Rejected`]
    async fn check(response: Response) -> ControlPlaneResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .or_else(|| v.get("message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| {
                if body.is_empty() {
                    status.canonical_reason().unwrap_or("Unknown").to_string()
                } else {
                    body
                }
            });

        Err(ControlPlaneError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn status(&self, token: &str) -> ControlPlaneResult<bool> {
        let response = self.client.get(self.url(token, "status")).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::check(response).await?;
        Ok(true)
    }

    async fn start(&self, token: &str, request: &StartRequest) -> ControlPlaneResult<StartResponse> {
        debug!(
            "Control plane start for {}: source={} seek={}s remaining={}s",
            token,
            UrlUtils::obfuscate_credentials(&request.source_url),
            request.seek_seconds,
            request.remaining_seconds
        );
        let response = self
            .client
            .post(self.url(token, "start"))
            .json(request)
            .send()
            .await?;
        Ok(Self::check(response).await?.json::<StartResponse>().await?)
    }

    async fn stop(&self, token: &str) -> ControlPlaneResult<StopResponse> {
        let response = self.client.post(self.url(token, "stop")).send().await?;
        Ok(Self::check(response).await?.json::<StopResponse>().await?)
    }

    async fn delete(&self, token: &str) -> ControlPlaneResult<()> {
        let response = self.client.delete(self.url(token, "")).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response).await?;
        Ok(())
    }

    async fn fetch_playlist(&self, token: &str) -> ControlPlaneResult<String> {
        let response = self.client.get(self.url(token, "live.m3u8")).send().await?;
        Ok(Self::check(response).await?.text().await?)
    }

    async fn fetch_segment(&self, token: &str, segment: &str) -> ControlPlaneResult<Bytes> {
        let response = self
            .client
            .get(self.url(token, &format!("segment/{segment}.ts")))
            .send()
            .await?;
        Ok(Self::check(response).await?.bytes().await?)
    }
}

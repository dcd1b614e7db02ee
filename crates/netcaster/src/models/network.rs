use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use super::content::ContentRef;

/// How the transcoder reaches the programme's playback position
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TranscodeMode {
    /// Upstream bytes are pulled as-is, seeking happens in the transcoder
    #[default]
    Direct,
    /// The media server trims the stream when the URL carries a start offset
    Server,
    /// Content is read locally and seeked by the transcoder
    Local,
}

/// A virtual linear channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: Uuid,
    pub name: String,
    /// Public opaque token used in viewer URLs and control-plane paths
    pub token: String,
    pub logo: Option<String>,
    pub enabled: bool,
    pub broadcast_enabled: bool,
    /// Desired running state; actual state is the pid plus the liveness probe
    pub broadcast_requested: bool,
    pub broadcast_pid: Option<i64>,
    pub broadcast_started_at: Option<DateTime<Utc>>,
    pub broadcast_segment_sequence: i64,
    pub broadcast_programme_id: Option<Uuid>,
    pub broadcast_initial_offset_seconds: Option<i64>,
    pub broadcast_error: Option<String>,
    pub transcode_mode: TranscodeMode,
    pub loop_content: bool,
    pub auto_regenerate_schedule: bool,
    pub schedule_generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Network {
    /// Neither the network nor its broadcast feature is switched off
    pub fn is_broadcastable(&self) -> bool {
        self.enabled && self.broadcast_enabled
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkCreateRequest {
    pub name: String,
    pub logo: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub broadcast_enabled: bool,
    #[serde(default)]
    pub transcode_mode: TranscodeMode,
    #[serde(default = "default_true")]
    pub loop_content: bool,
    #[serde(default = "default_true")]
    pub auto_regenerate_schedule: bool,
}

fn default_true() -> bool {
    true
}

impl NetworkCreateRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            logo: None,
            enabled: true,
            broadcast_enabled: false,
            transcode_mode: TranscodeMode::default(),
            loop_content: true,
            auto_regenerate_schedule: true,
        }
    }
}

/// Partial update of the broadcast columns of a network
///
/// `None` leaves a column untouched; `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastUpdate {
    pub requested: Option<bool>,
    pub pid: Option<Option<i64>>,
    pub started_at: Option<Option<DateTime<Utc>>>,
    pub segment_sequence: Option<i64>,
    pub programme_id: Option<Option<Uuid>>,
    pub initial_offset_seconds: Option<Option<i64>>,
    pub error: Option<Option<String>>,
}

impl BroadcastUpdate {
    /// Transcoder started for a programme at the given offset
    pub fn started(pid: i64, started_at: DateTime<Utc>, programme_id: Uuid, offset: i64) -> Self {
        Self {
            pid: Some(Some(pid)),
            started_at: Some(Some(started_at)),
            programme_id: Some(Some(programme_id)),
            initial_offset_seconds: Some(Some(offset)),
            error: Some(None),
            ..Default::default()
        }
    }

    /// Local state after a stop: not requested, nothing running, numbering reset
    pub fn stopped() -> Self {
        Self {
            requested: Some(false),
            pid: Some(None),
            started_at: Some(None),
            segment_sequence: Some(0),
            ..Default::default()
        }
    }

    /// A permanent start failure: stop retrying and keep the reason for operators
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            requested: Some(false),
            pid: Some(None),
            started_at: Some(None),
            error: Some(Some(message.into())),
            ..Default::default()
        }
    }

    /// Process identity from a previous application run is not trusted
    pub fn recovered() -> Self {
        Self {
            requested: Some(true),
            pid: Some(None),
            started_at: Some(None),
            error: Some(None),
            ..Default::default()
        }
    }

    /// Operator re-request after a stop or permanent failure
    pub fn requested() -> Self {
        Self {
            requested: Some(true),
            error: Some(None),
            ..Default::default()
        }
    }
}

/// Ordered membership of a content reference in a network's rotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub network_id: Uuid,
    pub content: ContentRef,
    pub sort_order: i32,
    /// Persisted for future weighted rotation; rotation is currently uniform
    pub weight: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItemCreateRequest {
    pub content: ContentRef,
    pub sort_order: i32,
    #[serde(default = "default_weight")]
    pub weight: i32,
}

fn default_weight() -> i32 {
    1
}

impl ContentItemCreateRequest {
    pub fn new(content: ContentRef, sort_order: i32) -> Self {
        Self {
            content,
            sort_order,
            weight: default_weight(),
        }
    }
}

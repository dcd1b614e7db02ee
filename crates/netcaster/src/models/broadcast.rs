use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// Observed broadcast state of a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BroadcastState {
    /// Network or its broadcast feature is switched off
    Idle,
    /// Wanted but not running; the next tick will try to start it
    AwaitingStart,
    /// The liveness probe reports a running transcoder
    Active,
    /// Not wanted and not running; stays this way until re-requested
    Stopped,
}

impl BroadcastState {
    pub fn derive(enabled: bool, broadcast_enabled: bool, requested: bool, probe: bool) -> Self {
        if !enabled || !broadcast_enabled {
            Self::Idle
        } else if probe {
            Self::Active
        } else if requested {
            Self::AwaitingStart
        } else {
            Self::Stopped
        }
    }
}

/// Operator-facing snapshot of a network's broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastStatus {
    pub network_id: Uuid,
    pub state: BroadcastState,
    pub requested: bool,
    pub pid: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub programme_id: Option<Uuid>,
    pub initial_offset_seconds: Option<i64>,
    pub segment_sequence: i64,
    pub error: Option<String>,
}

/// Result of asking the control plane to start a transcoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StartOutcome {
    Started { pid: i64, programme_id: Uuid, seek_seconds: i64 },
    /// Nothing to do right now: broadcast off, nothing airing, or another start in flight
    Deferred { reason: String },
    /// Transient failure; desired state untouched so the next tick retries
    Unavailable { reason: String },
    /// Permanent failure; desired state cleared until re-requested
    Rejected { reason: String },
}

/// Result of one reconciliation pass for a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TickOutcome {
    Idle,
    Started,
    Failed,
}

impl From<&StartOutcome> for TickOutcome {
    fn from(outcome: &StartOutcome) -> Self {
        match outcome {
            StartOutcome::Started { .. } => Self::Started,
            StartOutcome::Rejected { .. } | StartOutcome::Unavailable { .. } => Self::Failed,
            StartOutcome::Deferred { .. } => Self::Idle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopOutcome {
    /// Whether the remote cleanup call succeeded
    pub cleaned_up: bool,
}

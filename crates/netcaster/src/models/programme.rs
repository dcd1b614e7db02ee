use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::content::ContentRef;

/// One scheduled occurrence of content on a network's timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Programme {
    pub id: Uuid,
    pub network_id: Uuid,
    pub network_content_id: Option<Uuid>,
    pub content: ContentRef,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: i64,
    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl Programme {
    /// Whether the programme is airing at `at`, compared at whole-second precision
    pub fn is_airing_at(&self, at: DateTime<Utc>) -> bool {
        let at = at.timestamp();
        self.start_time.timestamp() <= at && at < self.end_time.timestamp()
    }

    /// Whole seconds elapsed since the programme started (negative before it starts)
    pub fn elapsed_seconds(&self, at: DateTime<Utc>) -> i64 {
        at.timestamp() - self.start_time.timestamp()
    }
}

/// Summary of a schedule generation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleGenerationResult {
    pub network_id: Uuid,
    /// Where new programmes were appended from
    pub boundary: Option<DateTime<Utc>>,
    pub removed: u64,
    pub created: u64,
    pub pruned: u64,
    /// End of the last programme after generation
    pub scheduled_until: Option<DateTime<Utc>>,
    /// The planned future matched the stored one, nothing was written
    pub unchanged: bool,
}

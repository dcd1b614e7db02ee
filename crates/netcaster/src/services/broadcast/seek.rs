//! Playback position math shared by start, restart and heal

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Programme, TranscodeMode};

use super::upstream::recognized_server_offset;

/// Where playback of a programme should begin and how much of it is left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeekWindow {
    pub seek_seconds: i64,
    pub remaining_seconds: i64,
}

impl SeekWindow {
    /// Position within `programme` at `now`, clamped to the programme's length
    pub fn at(programme: &Programme, now: DateTime<Utc>) -> Self {
        let duration = programme.duration_seconds.max(0);
        let seek_seconds = programme.elapsed_seconds(now).clamp(0, duration);
        Self {
            seek_seconds,
            remaining_seconds: duration - seek_seconds,
        }
    }
}

/// Seek the transcoder itself should apply for a source URL
///
/// Direct and Local always seek in the transcoder. Server mode trusts a
/// server-side start offset already encoded in the URL and seeks nothing.
pub fn transcoder_seek(mode: TranscodeMode, seek_seconds: i64, source_url: &str) -> i64 {
    if seek_seconds <= 0 {
        return 0;
    }

    match mode {
        TranscodeMode::Direct | TranscodeMode::Local => seek_seconds,
        TranscodeMode::Server => match recognized_server_offset(source_url) {
            Some(_) => 0,
            None => seek_seconds,
        },
    }
}

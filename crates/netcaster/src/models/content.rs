use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Discriminator for the polymorphic content reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentKind {
    Episode,
    Channel,
}

/// Reference to a playable piece of content: an on-demand episode or a live/VOD channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ContentRef {
    Episode(Uuid),
    Channel(Uuid),
}

impl ContentRef {
    pub fn new(kind: ContentKind, id: Uuid) -> Self {
        match kind {
            ContentKind::Episode => Self::Episode(id),
            ContentKind::Channel => Self::Channel(id),
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Episode(_) => ContentKind::Episode,
            Self::Channel(_) => ContentKind::Channel,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::Episode(id) | Self::Channel(id) => *id,
        }
    }
}

/// Upstream media source convention, used to pick a server-side seek parameter
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Provider {
    #[default]
    Generic,
    Xtream,
    Emby,
    Jellyfin,
    Plex,
}

/// Content looked up by reference, flattened for scheduling and playback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedContent {
    pub content: ContentRef,
    pub title: String,
    pub description: Option<String>,
    /// Episode cover or channel logo
    pub cover: Option<String>,
    pub series_cover: Option<String>,
    pub stream_url: String,
    pub provider: Provider,
    /// None for live channels and episodes without a known runtime
    pub duration_seconds: Option<i64>,
}

impl ResolvedContent {
    /// Slot length on the timeline, falling back for live or unknown-length content
    pub fn slot_seconds(&self, default_seconds: i64) -> i64 {
        match self.duration_seconds {
            Some(seconds) if seconds > 0 => seconds,
            _ => default_seconds,
        }
    }

    /// Artwork for a programme of this content: own cover, else the series cover
    pub fn artwork(&self) -> Option<&str> {
        self.cover.as_deref().or(self.series_cover.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesCreateRequest {
    pub title: String,
    pub cover: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeCreateRequest {
    pub series_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub cover: Option<String>,
    pub duration_seconds: Option<i64>,
    pub stream_url: String,
    #[serde(default)]
    pub provider: Provider,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelCreateRequest {
    pub name: String,
    pub logo: Option<String>,
    pub stream_url: String,
    #[serde(default)]
    pub provider: Provider,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_content_ref_round_trips_through_kind() {
        let id = Uuid::new_v4();
        let reference = ContentRef::new(ContentKind::Channel, id);
        assert_eq!(reference, ContentRef::Channel(id));
        assert_eq!(reference.kind().to_string(), "channel");
        assert_eq!(ContentKind::from_str("episode").unwrap(), ContentKind::Episode);
    }

    #[test]
    fn test_slot_seconds_falls_back_for_missing_or_zero_duration() {
        let mut content = ResolvedContent {
            content: ContentRef::Episode(Uuid::new_v4()),
            title: "Pilot".into(),
            description: None,
            cover: None,
            series_cover: None,
            stream_url: "http://media/1".into(),
            provider: Provider::Generic,
            duration_seconds: Some(1500),
        };
        assert_eq!(content.slot_seconds(3600), 1500);

        content.duration_seconds = Some(0);
        assert_eq!(content.slot_seconds(3600), 3600);

        content.duration_seconds = None;
        assert_eq!(content.slot_seconds(3600), 3600);
    }

    #[test]
    fn test_provider_parses_lowercase() {
        assert_eq!(Provider::from_str("jellyfin").unwrap(), Provider::Jellyfin);
        assert!(Provider::from_str("vimeo").is_err());
    }
}

//! Upstream source URL resolution
//!
//! In `Server` mode, media servers that understand a start-offset query
//! parameter are asked to trim the stream themselves:
//! Emby and Jellyfin take `StartTimeTicks` (100ns ticks), Plex takes `offset`
//! (seconds).

use tracing::warn;

use crate::models::{Provider, ResolvedContent, TranscodeMode};
use crate::utils::UrlUtils;

const TICKS_PER_SECOND: i64 = 10_000_000;
const START_TIME_TICKS_PARAM: &str = "StartTimeTicks";
const OFFSET_PARAM: &str = "offset";

#[derive(Debug, Clone, Copy, Default)]
pub struct UpstreamResolver;

impl UpstreamResolver {
    pub fn new() -> Self {
        Self
    }

    /// Source URL the transcoder should read for `content`
    pub fn resolve(&self, content: &ResolvedContent, mode: TranscodeMode, seek_seconds: i64) -> String {
        if mode != TranscodeMode::Server || seek_seconds <= 0 {
            return content.stream_url.clone();
        }

        let (param, value) = match content.provider {
            Provider::Emby | Provider::Jellyfin => (
                START_TIME_TICKS_PARAM,
                (seek_seconds * TICKS_PER_SECOND).to_string(),
            ),
            Provider::Plex => (OFFSET_PARAM, seek_seconds.to_string()),
            Provider::Generic | Provider::Xtream => return content.stream_url.clone(),
        };

        match UrlUtils::with_query_param(&content.stream_url, param, &value) {
            Ok(url) => url,
            Err(e) => {
                warn!(
                    "Cannot add server-side offset to {}: {}",
                    UrlUtils::obfuscate_credentials(&content.stream_url),
                    e
                );
                content.stream_url.clone()
            }
        }
    }
}

/// Server-side start offset, in seconds, encoded in a source URL
pub fn recognized_server_offset(url: &str) -> Option<i64> {
    if let Some(ticks) = UrlUtils::query_param(url, START_TIME_TICKS_PARAM)
        && let Ok(ticks) = ticks.parse::<i64>()
    {
        return Some(ticks / TICKS_PER_SECOND);
    }

    UrlUtils::query_param(url, OFFSET_PARAM)?.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentRef;
    use uuid::Uuid;

    fn content(provider: Provider, url: &str) -> ResolvedContent {
        ResolvedContent {
            content: ContentRef::Episode(Uuid::new_v4()),
            title: "Film".into(),
            description: None,
            cover: None,
            series_cover: None,
            stream_url: url.into(),
            provider,
            duration_seconds: Some(5400),
        }
    }

    #[test]
    fn test_server_mode_embeds_provider_offsets() {
        let resolver = UpstreamResolver::new();

        let jellyfin = resolver.resolve(
            &content(Provider::Jellyfin, "http://jf:8096/Videos/1/stream?Static=true"),
            TranscodeMode::Server,
            90,
        );
        assert_eq!(
            jellyfin,
            "http://jf:8096/Videos/1/stream?Static=true&StartTimeTicks=900000000"
        );
        assert_eq!(recognized_server_offset(&jellyfin), Some(90));

        let plex = resolver.resolve(
            &content(Provider::Plex, "http://plex:32400/library/parts/7/file.mkv"),
            TranscodeMode::Server,
            45,
        );
        assert_eq!(plex, "http://plex:32400/library/parts/7/file.mkv?offset=45");
        assert_eq!(recognized_server_offset(&plex), Some(45));
    }

    #[test]
    fn test_other_modes_and_providers_keep_plain_url() {
        let resolver = UpstreamResolver::new();
        let url = "http://emby:8096/Videos/2/stream";

        assert_eq!(
            resolver.resolve(&content(Provider::Emby, url), TranscodeMode::Direct, 90),
            url
        );
        assert_eq!(
            resolver.resolve(&content(Provider::Emby, url), TranscodeMode::Server, 0),
            url
        );
        assert_eq!(
            resolver.resolve(&content(Provider::Xtream, url), TranscodeMode::Server, 90),
            url
        );
        assert_eq!(recognized_server_offset(url), None);
    }
}

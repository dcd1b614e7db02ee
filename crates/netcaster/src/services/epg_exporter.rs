//! XMLTV export of network timelines
//!
//! One `<channel>` per network (id = public token) and one `<programme>` per
//! scheduled programme. Programme icons fall back from the programme image to
//! the content cover to the series cover.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::config::defaults::{EPG_FUTURE_WINDOW_SECS, EPG_PAST_WINDOW_SECS};
use crate::database::Database;
use crate::database::repositories::{
    ContentSeaOrmRepository, NetworkSeaOrmRepository, ProgrammeSeaOrmRepository,
};
use crate::errors::AppResult;
use crate::models::{ContentRef, Network, Programme, ResolvedContent};
use crate::utils::time::format_xmltv_time;

pub const GENERATOR_NAME: &str = "netcaster";

#[derive(Clone)]
pub struct EpgExporter {
    networks: NetworkSeaOrmRepository,
    programmes: ProgrammeSeaOrmRepository,
    content: ContentSeaOrmRepository,
}

impl EpgExporter {
    pub fn new(database: &Database) -> Self {
        let connection = database.connection();
        Self {
            networks: NetworkSeaOrmRepository::new(connection.clone()),
            programmes: ProgrammeSeaOrmRepository::new(connection.clone()),
            content: ContentSeaOrmRepository::new(connection),
        }
    }

    /// Guide for a single network
    pub async fn export_network(&self, network: &Network, now: DateTime<Utc>) -> AppResult<String> {
        self.export(std::slice::from_ref(network), now).await
    }

    /// Guide for every enabled network
    pub async fn export_all(&self, now: DateTime<Utc>) -> AppResult<String> {
        let networks = self.networks.find_enabled().await?;
        self.export(&networks, now).await
    }

    async fn export(&self, networks: &[Network], now: DateTime<Utc>) -> AppResult<String> {
        let ids: Vec<_> = networks.iter().map(|n| n.id).collect();
        let programmes = self
            .programmes
            .find_in_range(
                &ids,
                now - Duration::seconds(EPG_PAST_WINDOW_SECS),
                now + Duration::seconds(EPG_FUTURE_WINDOW_SECS),
            )
            .await?;

        // Only programmes without their own image need the content fallback
        let missing_images: Vec<ContentRef> = programmes
            .iter()
            .filter(|p| p.image.as_deref().is_none_or(str::is_empty))
            .map(|p| p.content)
            .collect();
        let resolved = self.content.resolve_many(&missing_images).await?;

        debug!(
            "Exporting XMLTV for {} network(s), {} programme(s)",
            networks.len(),
            programmes.len()
        );

        Ok(render_xmltv(networks, &programmes, &resolved))
    }
}

/// Render the XMLTV document
pub fn render_xmltv(
    networks: &[Network],
    programmes: &[Programme],
    contents: &HashMap<ContentRef, ResolvedContent>,
) -> String {
    let mut xmltv = String::new();

    xmltv.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xmltv.push_str("<!DOCTYPE tv SYSTEM \"xmltv.dtd\">\n");
    xmltv.push_str(&format!("<tv generator-info-name=\"{GENERATOR_NAME}\">\n"));

    for network in networks {
        xmltv.push_str(&format!("  <channel id=\"{}\">\n", escape_xml(&network.token)));
        xmltv.push_str(&format!(
            "    <display-name>{}</display-name>\n",
            escape_xml(&network.name)
        ));
        if let Some(logo) = non_empty(network.logo.as_deref()) {
            xmltv.push_str(&format!("    <icon src=\"{}\" />\n", escape_xml(logo)));
        }
        xmltv.push_str("  </channel>\n");
    }

    let tokens: HashMap<_, _> = networks.iter().map(|n| (n.id, n.token.as_str())).collect();

    for programme in programmes {
        let Some(token) = tokens.get(&programme.network_id) else {
            continue;
        };

        xmltv.push_str(&format!(
            "  <programme start=\"{}\" stop=\"{}\" channel=\"{}\">\n",
            format_xmltv_time(programme.start_time),
            format_xmltv_time(programme.end_time),
            escape_xml(token)
        ));
        xmltv.push_str(&format!("    <title>{}</title>\n", escape_xml(&programme.title)));
        if let Some(description) = non_empty(programme.description.as_deref()) {
            xmltv.push_str(&format!("    <desc>{}</desc>\n", escape_xml(description)));
        }
        if let Some(icon) = programme_icon(programme, contents.get(&programme.content)) {
            xmltv.push_str(&format!("    <icon src=\"{}\" />\n", escape_xml(icon)));
        }
        xmltv.push_str("  </programme>\n");
    }

    xmltv.push_str("</tv>\n");
    xmltv
}

fn programme_icon<'a>(
    programme: &'a Programme,
    content: Option<&'a ResolvedContent>,
) -> Option<&'a str> {
    non_empty(programme.image.as_deref())
        .or_else(|| content.and_then(|c| non_empty(c.cover.as_deref())))
        .or_else(|| content.and_then(|c| non_empty(c.series_cover.as_deref())))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Provider, TranscodeMode};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn network() -> Network {
        let now = Utc::now();
        Network {
            id: Uuid::new_v4(),
            name: "Films & Friends".into(),
            token: "f00d".into(),
            logo: Some("http://img/net.png".into()),
            enabled: true,
            broadcast_enabled: true,
            broadcast_requested: false,
            broadcast_pid: None,
            broadcast_started_at: None,
            broadcast_segment_sequence: 0,
            broadcast_programme_id: None,
            broadcast_initial_offset_seconds: None,
            broadcast_error: None,
            transcode_mode: TranscodeMode::Direct,
            loop_content: true,
            auto_regenerate_schedule: true,
            schedule_generated_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn programme(network: &Network, start: DateTime<Utc>, image: Option<&str>) -> Programme {
        Programme {
            id: Uuid::new_v4(),
            network_id: network.id,
            network_content_id: None,
            content: ContentRef::Episode(Uuid::new_v4()),
            start_time: start,
            end_time: start + Duration::seconds(1800),
            duration_seconds: 1800,
            title: "Night <Special>".into(),
            description: Some("".into()),
            image: image.map(str::to_string),
        }
    }

    fn content(reference: ContentRef, cover: Option<&str>, series_cover: Option<&str>) -> ResolvedContent {
        ResolvedContent {
            content: reference,
            title: "x".into(),
            description: None,
            cover: cover.map(str::to_string),
            series_cover: series_cover.map(str::to_string),
            stream_url: "http://media/x".into(),
            provider: Provider::Generic,
            duration_seconds: Some(1800),
        }
    }

    #[test]
    fn test_render_channel_and_programme() {
        let network = network();
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 21, 0, 0).unwrap();
        let programmes = vec![programme(&network, start, Some("http://img/prog.jpg"))];

        let xml = render_xmltv(std::slice::from_ref(&network), &programmes, &HashMap::new());

        assert!(xml.contains("<tv generator-info-name=\"netcaster\">"));
        assert!(xml.contains("<channel id=\"f00d\">"));
        assert!(xml.contains("<display-name>Films &amp; Friends</display-name>"));
        assert!(xml.contains("<icon src=\"http://img/net.png\" />"));
        assert!(xml.contains(
            "<programme start=\"20260301210000 +0000\" stop=\"20260301213000 +0000\" channel=\"f00d\">"
        ));
        assert!(xml.contains("<title>Night &lt;Special&gt;</title>"));
        assert!(!xml.contains("<desc>"));
        assert!(xml.contains("<icon src=\"http://img/prog.jpg\" />"));
    }

    #[test]
    fn test_programme_icon_fallback_chain() {
        let network = network();
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 21, 0, 0).unwrap();

        let own = programme(&network, start, Some("own.jpg"));
        let cover = programme(&network, start, None);
        let series = programme(&network, start, None);
        let bare = programme(&network, start, Some(""));

        let cover_content = content(cover.content, Some("cover.jpg"), Some("series.jpg"));
        let series_content = content(series.content, None, Some("series.jpg"));
        let bare_content = content(bare.content, None, None);

        assert_eq!(programme_icon(&own, Some(&cover_content)), Some("own.jpg"));
        assert_eq!(programme_icon(&cover, Some(&cover_content)), Some("cover.jpg"));
        assert_eq!(programme_icon(&series, Some(&series_content)), Some("series.jpg"));
        assert_eq!(programme_icon(&bare, Some(&bare_content)), None);
        assert_eq!(programme_icon(&bare, None), None);
    }
}

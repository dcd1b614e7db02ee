//! Schedule generator
//!
//! Turns a network's content pool into a contiguous programme timeline. Each run
//! keeps everything up to the regeneration boundary (the end of the programme
//! airing at the reference time, or of the most recent past programme) and
//! rebuilds the timeline after it, continuing the rotation from the pool entry
//! that follows the last surviving programme.
//!
//! Boundaries are whole seconds and every programme starts exactly where the
//! previous one ends, so repeated runs with the same inputs plan the same
//! timeline and write nothing.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ScheduleConfig;
use crate::database::Database;
use crate::database::repositories::{
    ContentSeaOrmRepository, NetworkContentSeaOrmRepository, NetworkSeaOrmRepository,
    ProgrammeSeaOrmRepository, ScheduleWrite,
};
use crate::errors::AppResult;
use crate::models::{
    ContentItem, ContentRef, Network, Programme, ResolvedContent, ScheduleGenerationResult,
};
use crate::utils::time::{same_second, truncate_to_second};

/// Builds and maintains programme timelines for networks
#[derive(Clone)]
pub struct ScheduleGenerator {
    networks: NetworkSeaOrmRepository,
    pool: NetworkContentSeaOrmRepository,
    content: ContentSeaOrmRepository,
    programmes: ProgrammeSeaOrmRepository,
    config: ScheduleConfig,
    /// Serializes read-plan-write runs within this process
    generation_lock: Arc<Mutex<()>>,
}

/// Where the new part of the timeline starts and which pool entry comes first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Continuation {
    boundary: DateTime<Utc>,
    /// Index into the pool of the next entry to schedule; `None` when a
    /// non-looping pool is exhausted
    next_index: Option<usize>,
    /// Programme that ends at the boundary; protected from pruning
    anchor_id: Option<Uuid>,
}

impl ScheduleGenerator {
    pub fn new(database: &Database, config: ScheduleConfig) -> Self {
        let connection = database.connection();
        Self {
            networks: NetworkSeaOrmRepository::new(connection.clone()),
            pool: NetworkContentSeaOrmRepository::new(connection.clone()),
            content: ContentSeaOrmRepository::new(connection.clone()),
            programmes: ProgrammeSeaOrmRepository::new(connection),
            config,
            generation_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Extend or rebuild the timeline of a network from now
    pub async fn generate_schedule(&self, network: &Network) -> AppResult<ScheduleGenerationResult> {
        self.generate_schedule_at(network, Utc::now()).await
    }

    /// Extend or rebuild the timeline of a network as seen at `reference`
    pub async fn generate_schedule_at(
        &self,
        network: &Network,
        reference: DateTime<Utc>,
    ) -> AppResult<ScheduleGenerationResult> {
        let _generation = self.generation_lock.lock().await;
        let reference = truncate_to_second(reference);
        let existing = self.programmes.find_by_network(&network.id).await?;
        let pool = self.pool.find_by_network(&network.id).await?;

        let contents: Vec<ContentRef> = pool.iter().map(|item| item.content).collect();
        let resolved = self.content.resolve_many(&contents).await?;
        for item in pool.iter().filter(|item| !resolved.contains_key(&item.content)) {
            warn!(
                "Network '{}' ({}): pool entry {} references missing {} {}, skipping",
                network.name,
                network.id,
                item.id,
                item.content.kind(),
                item.content.id()
            );
        }

        let continuation = self.continuation(network, &existing, &pool, reference);
        let horizon_end = reference + self.horizon();

        let planned = match continuation.next_index {
            Some(start_index) => plan_programmes(
                network,
                &pool,
                &resolved,
                start_index,
                continuation.boundary,
                horizon_end,
                self.default_programme_seconds(),
            ),
            None => Vec::new(),
        };

        let superseded: Vec<&Programme> = existing
            .iter()
            .filter(|p| p.start_time.timestamp() >= continuation.boundary.timestamp())
            .collect();

        // Programmes already matching the plan keep their ids
        let kept = superseded
            .iter()
            .zip(planned.iter())
            .take_while(|(stored, fresh)| same_slot(stored, fresh))
            .count();

        let mut result = ScheduleGenerationResult {
            network_id: network.id,
            boundary: Some(continuation.boundary),
            ..Default::default()
        };

        if kept == superseded.len() && kept == planned.len() {
            debug!(
                "Network '{}' ({}): planned timeline matches stored timeline, nothing to write",
                network.name, network.id
            );
            result.unchanged = true;
            result.scheduled_until = existing.iter().map(|p| p.end_time).max();
            return Ok(result);
        }

        let remove_ids: Vec<Uuid> = superseded[kept..].iter().map(|p| p.id).collect();
        let new_programmes: Vec<Programme> = planned[kept..].to_vec();

        result.scheduled_until = planned
            .last()
            .map(|p| p.end_time)
            .or_else(|| {
                existing
                    .iter()
                    .filter(|p| p.start_time.timestamp() < continuation.boundary.timestamp())
                    .map(|p| p.end_time)
                    .max()
            });

        let counts = self
            .programmes
            .apply_schedule(ScheduleWrite {
                network_id: network.id,
                remove_ids,
                programmes: new_programmes,
                prune_before: Some(reference - self.retention()),
                keep_id: continuation.anchor_id,
                generated_at: reference,
            })
            .await?;

        result.removed = counts.removed;
        result.created = counts.created;
        result.pruned = counts.pruned;

        info!(
            "Network '{}' ({}): schedule generated from {} ({} created, {} superseded, {} pruned)",
            network.name,
            network.id,
            continuation.boundary,
            result.created,
            result.removed,
            result.pruned
        );

        Ok(result)
    }

    /// True when the timeline is empty or ends within the regeneration threshold
    pub async fn needs_regeneration(&self, network: &Network, now: DateTime<Utc>) -> AppResult<bool> {
        let Some(last) = self.programmes.find_last(&network.id).await? else {
            return Ok(true);
        };
        let threshold = Duration::from_std(self.config.regenerate_threshold)
            .unwrap_or_else(|_| Duration::hours(24));
        Ok(last.end_time.timestamp() < (now + threshold).timestamp())
    }

    /// Regenerate every enabled, auto-regenerating network whose timeline is running out
    pub async fn regenerate_due(&self, now: DateTime<Utc>) -> AppResult<Vec<ScheduleGenerationResult>> {
        let networks = self.networks.find_enabled().await?;
        let mut results = Vec::new();

        for network in networks.iter().filter(|n| n.auto_regenerate_schedule) {
            match self.needs_regeneration(network, now).await {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => {
                    warn!(
                        "Network '{}' ({}): failed to check schedule: {}",
                        network.name, network.id, e
                    );
                    continue;
                }
            }

            match self.generate_schedule_at(network, now).await {
                Ok(result) => results.push(result),
                Err(e) => warn!(
                    "Network '{}' ({}): schedule regeneration failed: {}",
                    network.name, network.id, e
                ),
            }
        }

        Ok(results)
    }

    /// The programme airing on a network at `at`
    pub async fn current_programme(
        &self,
        network_id: &Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Programme>> {
        Ok(self.programmes.find_current(network_id, at).await?)
    }

    /// The current programme followed by what comes next, up to `limit` entries
    pub async fn upcoming(
        &self,
        network_id: &Uuid,
        from: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<Programme>> {
        Ok(self.programmes.find_upcoming(network_id, from, limit).await?)
    }

    fn continuation(
        &self,
        network: &Network,
        existing: &[Programme],
        pool: &[ContentItem],
        reference: DateTime<Utc>,
    ) -> Continuation {
        let now = reference.timestamp();
        let current = existing.iter().find(|p| p.is_airing_at(reference));
        let anchor = current.or_else(|| {
            existing
                .iter()
                .filter(|p| p.end_time.timestamp() <= now)
                .max_by_key(|p| p.end_time.timestamp())
        });

        let Some(anchor) = anchor else {
            return Continuation {
                boundary: reference,
                next_index: (!pool.is_empty()).then_some(0),
                anchor_id: None,
            };
        };

        // A gap longer than the retention window is not back-filled
        let anchor_end = truncate_to_second(anchor.end_time);
        let boundary = if current.is_none() && anchor_end < reference - self.retention() {
            reference
        } else {
            anchor_end
        };

        let position = anchor
            .network_content_id
            .and_then(|id| pool.iter().position(|item| item.id == id))
            .or_else(|| pool.iter().position(|item| item.content == anchor.content));

        let next_index = match position {
            None if pool.is_empty() => None,
            None => Some(0),
            Some(index) if index + 1 < pool.len() => Some(index + 1),
            Some(_) if network.loop_content => Some(0),
            Some(_) => None,
        };

        Continuation {
            boundary,
            next_index,
            anchor_id: Some(anchor.id),
        }
    }

    fn horizon(&self) -> Duration {
        Duration::from_std(self.config.horizon).unwrap_or_else(|_| Duration::hours(48))
    }

    fn retention(&self) -> Duration {
        Duration::from_std(self.config.retention).unwrap_or_else(|_| Duration::hours(24))
    }

    fn default_programme_seconds(&self) -> i64 {
        (self.config.default_programme_duration.as_secs() as i64).max(1)
    }
}

/// Lay out pool entries back to back from `boundary` until `horizon_end`
fn plan_programmes(
    network: &Network,
    pool: &[ContentItem],
    resolved: &HashMap<ContentRef, ResolvedContent>,
    start_index: usize,
    boundary: DateTime<Utc>,
    horizon_end: DateTime<Utc>,
    default_seconds: i64,
) -> Vec<Programme> {
    let mut planned = Vec::new();
    if !pool.iter().any(|item| resolved.contains_key(&item.content)) {
        return planned;
    }

    let mut start = truncate_to_second(boundary);
    let mut index = start_index;

    while start < horizon_end {
        if index >= pool.len() {
            if !network.loop_content {
                break;
            }
            index = 0;
        }
        let item = &pool[index];
        index += 1;

        let Some(content) = resolved.get(&item.content) else {
            continue;
        };

        let seconds = content.slot_seconds(default_seconds);
        let end = start + Duration::seconds(seconds);
        planned.push(Programme {
            id: Uuid::new_v4(),
            network_id: network.id,
            network_content_id: Some(item.id),
            content: item.content,
            start_time: start,
            end_time: end,
            duration_seconds: seconds,
            title: content.title.clone(),
            description: content.description.clone(),
            image: content.artwork().map(str::to_string),
        });
        start = end;
    }

    planned
}

fn same_slot(stored: &Programme, planned: &Programme) -> bool {
    same_second(stored.start_time, planned.start_time)
        && same_second(stored.end_time, planned.end_time)
        && stored.content == planned.content
        && stored.network_content_id == planned.network_content_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Provider, TranscodeMode};
    use chrono::TimeZone;

    fn network(loop_content: bool) -> Network {
        let now = Utc::now();
        Network {
            id: Uuid::new_v4(),
            name: "Test".into(),
            token: "token".into(),
            logo: None,
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
            loop_content,
            auto_regenerate_schedule: true,
            schedule_generated_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn pool(network: &Network, durations: &[Option<i64>]) -> (Vec<ContentItem>, HashMap<ContentRef, ResolvedContent>) {
        let mut items = Vec::new();
        let mut resolved = HashMap::new();
        for (i, duration) in durations.iter().enumerate() {
            let content = ContentRef::Episode(Uuid::new_v4());
            items.push(ContentItem {
                id: Uuid::new_v4(),
                network_id: network.id,
                content,
                sort_order: i as i32,
                weight: 1,
                created_at: Utc::now(),
            });
            resolved.insert(
                content,
                ResolvedContent {
                    content,
                    title: format!("Item {}", i + 1),
                    description: None,
                    cover: None,
                    series_cover: None,
                    stream_url: format!("http://media/{i}"),
                    provider: Provider::Generic,
                    duration_seconds: *duration,
                },
            );
        }
        (items, resolved)
    }

    #[test]
    fn test_plan_is_contiguous_and_wraps_when_looping() {
        let network = network(true);
        let (items, resolved) = pool(&network, &[Some(1200), Some(600)]);
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        let planned = plan_programmes(
            &network,
            &items,
            &resolved,
            1,
            t0,
            t0 + Duration::seconds(3600),
            3600,
        );

        let titles: Vec<&str> = planned.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Item 2", "Item 1", "Item 2", "Item 1"]);
        for pair in planned.windows(2) {
            assert_eq!(pair[0].end_time, pair[1].start_time);
        }
        for programme in &planned {
            assert_eq!(
                (programme.end_time - programme.start_time).num_seconds(),
                programme.duration_seconds
            );
        }
    }

    #[test]
    fn test_plan_stops_when_non_looping_pool_is_exhausted() {
        let network = network(false);
        let (items, resolved) = pool(&network, &[Some(600), Some(600), Some(600)]);
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        let planned = plan_programmes(
            &network,
            &items,
            &resolved,
            1,
            t0,
            t0 + Duration::hours(48),
            3600,
        );

        assert_eq!(planned.len(), 2);
        assert_eq!(planned[1].end_time, t0 + Duration::seconds(1200));
    }

    #[test]
    fn test_plan_uses_default_slot_for_unknown_durations() {
        let network = network(true);
        let (items, resolved) = pool(&network, &[None]);
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        let planned = plan_programmes(
            &network,
            &items,
            &resolved,
            0,
            t0,
            t0 + Duration::seconds(1),
            900,
        );

        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].duration_seconds, 900);
    }

    #[test]
    fn test_plan_skips_unresolved_entries_and_handles_empty_pools() {
        let network = network(true);
        let (mut items, resolved) = pool(&network, &[Some(600)]);
        items.insert(
            0,
            ContentItem {
                id: Uuid::new_v4(),
                network_id: network.id,
                content: ContentRef::Channel(Uuid::new_v4()),
                sort_order: -1,
                weight: 1,
                created_at: Utc::now(),
            },
        );
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        let planned = plan_programmes(
            &network,
            &items,
            &resolved,
            0,
            t0,
            t0 + Duration::seconds(1200),
            3600,
        );
        assert_eq!(planned.len(), 2);
        assert!(planned.iter().all(|p| p.network_content_id == Some(items[1].id)));

        let empty = plan_programmes(&network, &[], &HashMap::new(), 0, t0, t0 + Duration::hours(1), 3600);
        assert!(empty.is_empty());
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_missing_pool_content_is_skipped_with_warning() {
        use crate::database::repositories::ContentSeaOrmRepository;
        use crate::models::{ContentItemCreateRequest, EpisodeCreateRequest, NetworkCreateRequest};

        let database = Database::new_in_memory().await.unwrap();
        let connection = database.connection();
        let network = NetworkSeaOrmRepository::new(connection.clone())
            .create(NetworkCreateRequest::new("Gaps"))
            .await
            .unwrap();
        let episode = ContentSeaOrmRepository::new(connection.clone())
            .create_episode(EpisodeCreateRequest {
                series_id: None,
                title: "Present".into(),
                description: None,
                cover: None,
                duration_seconds: Some(3600),
                stream_url: "http://media/present".into(),
                provider: Provider::Generic,
            })
            .await
            .unwrap();
        let pool = NetworkContentSeaOrmRepository::new(connection);
        pool.add(
            &network.id,
            ContentItemCreateRequest::new(ContentRef::Episode(Uuid::new_v4()), 0),
        )
        .await
        .unwrap();
        pool.add(&network.id, ContentItemCreateRequest::new(episode, 1))
            .await
            .unwrap();

        let generator = ScheduleGenerator::new(&database, ScheduleConfig::default());
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let result = generator.generate_schedule_at(&network, t0).await.unwrap();

        assert!(result.created > 0);
        assert!(logs_contain("references missing episode"));
        let current = generator.current_programme(&network.id, t0).await.unwrap().unwrap();
        assert_eq!(current.content, episode);
    }
}

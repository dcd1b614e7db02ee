//! SeaORM repository for the episodes and channels that networks rotate through

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{channels, episodes, prelude::*, series};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::{
    ChannelCreateRequest, ContentRef, EpisodeCreateRequest, Provider, ResolvedContent,
    SeriesCreateRequest,
};

#[derive(Clone)]
pub struct ContentSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl ContentSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    pub async fn create_series(&self, request: SeriesCreateRequest) -> RepositoryResult<Uuid> {
        let now = Utc::now();
        let model = series::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(request.title),
            cover: Set(request.cover),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.connection)
        .await?;
        Ok(model.id)
    }

    pub async fn create_episode(&self, request: EpisodeCreateRequest) -> RepositoryResult<ContentRef> {
        let now = Utc::now();
        let model = episodes::ActiveModel {
            id: Set(Uuid::new_v4()),
            series_id: Set(request.series_id),
            title: Set(request.title),
            description: Set(request.description),
            cover: Set(request.cover),
            duration_seconds: Set(request.duration_seconds),
            stream_url: Set(request.stream_url),
            provider: Set(request.provider.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.connection)
        .await?;
        Ok(ContentRef::Episode(model.id))
    }

    pub async fn create_channel(&self, request: ChannelCreateRequest) -> RepositoryResult<ContentRef> {
        let now = Utc::now();
        let model = channels::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            logo: Set(request.logo),
            stream_url: Set(request.stream_url),
            provider: Set(request.provider.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.connection)
        .await?;
        Ok(ContentRef::Channel(model.id))
    }

    /// Look up a content reference by kind; `None` if the row is gone
    pub async fn resolve(&self, content: &ContentRef) -> RepositoryResult<Option<ResolvedContent>> {
        match content {
            ContentRef::Episode(id) => {
                let Some((episode, series)) = Episodes::find_by_id(*id)
                    .find_also_related(Series)
                    .one(&*self.connection)
                    .await?
                else {
                    return Ok(None);
                };
                Self::episode_to_resolved(episode, series).map(Some)
            }
            ContentRef::Channel(id) => {
                let Some(channel) = Channels::find_by_id(*id).one(&*self.connection).await? else {
                    return Ok(None);
                };
                Self::channel_to_resolved(channel).map(Some)
            }
        }
    }

    /// Resolve several references with one query per kind
    pub async fn resolve_many(
        &self,
        contents: &[ContentRef],
    ) -> RepositoryResult<HashMap<ContentRef, ResolvedContent>> {
        let mut episode_ids = HashSet::new();
        let mut channel_ids = HashSet::new();
        for content in contents {
            match content {
                ContentRef::Episode(id) => episode_ids.insert(*id),
                ContentRef::Channel(id) => channel_ids.insert(*id),
            };
        }

        let mut resolved = HashMap::with_capacity(contents.len());

        if !episode_ids.is_empty() {
            let rows = Episodes::find()
                .filter(episodes::Column::Id.is_in(episode_ids))
                .find_also_related(Series)
                .all(&*self.connection)
                .await?;
            for (episode, series) in rows {
                let content = Self::episode_to_resolved(episode, series)?;
                resolved.insert(content.content, content);
            }
        }

        if !channel_ids.is_empty() {
            let rows = Channels::find()
                .filter(channels::Column::Id.is_in(channel_ids))
                .all(&*self.connection)
                .await?;
            for channel in rows {
                let content = Self::channel_to_resolved(channel)?;
                resolved.insert(content.content, content);
            }
        }

        Ok(resolved)
    }

    fn parse_provider(table: &str, value: &str) -> RepositoryResult<Provider> {
        Provider::from_str(value)
            .map_err(|_| RepositoryError::invalid_value(table, "provider", value))
    }

    fn episode_to_resolved(
        episode: episodes::Model,
        series: Option<series::Model>,
    ) -> RepositoryResult<ResolvedContent> {
        Ok(ResolvedContent {
            content: ContentRef::Episode(episode.id),
            provider: Self::parse_provider("episodes", &episode.provider)?,
            title: episode.title,
            description: episode.description,
            cover: episode.cover,
            series_cover: series.and_then(|s| s.cover),
            stream_url: episode.stream_url,
            duration_seconds: episode.duration_seconds,
        })
    }

    fn channel_to_resolved(channel: channels::Model) -> RepositoryResult<ResolvedContent> {
        Ok(ResolvedContent {
            content: ContentRef::Channel(channel.id),
            provider: Self::parse_provider("channels", &channel.provider)?,
            title: channel.name,
            description: None,
            cover: channel.logo,
            series_cover: None,
            stream_url: channel.stream_url,
            duration_seconds: None,
        })
    }
}

//! SeaORM repository for network programme timelines

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{network_programmes, networks, prelude::*};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::{ContentKind, ContentRef, Programme};
use crate::utils::time::truncate_to_second;

/// One atomic timeline rewrite: drop the superseded future, append the new plan,
/// prune old history and move the generation watermark
#[derive(Debug, Clone)]
pub struct ScheduleWrite {
    pub network_id: Uuid,
    pub remove_ids: Vec<Uuid>,
    pub programmes: Vec<Programme>,
    /// Programmes ending before this instant are deleted
    pub prune_before: Option<DateTime<Utc>>,
    /// Never pruned, even if it ended before `prune_before`
    pub keep_id: Option<Uuid>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleWriteCounts {
    pub removed: u64,
    pub created: u64,
    pub pruned: u64,
}

#[derive(Clone)]
pub struct ProgrammeSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl ProgrammeSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    pub async fn find_by_id(&self, id: &Uuid) -> RepositoryResult<Option<Programme>> {
        let model = NetworkProgrammes::find_by_id(*id)
            .one(&*self.connection)
            .await?;
        model.map(Self::model_to_domain).transpose()
    }

    /// Full timeline of a network in start order
    pub async fn find_by_network(&self, network_id: &Uuid) -> RepositoryResult<Vec<Programme>> {
        let models = NetworkProgrammes::find()
            .filter(network_programmes::Column::NetworkId.eq(*network_id))
            .order_by_asc(network_programmes::Column::StartTime)
            .all(&*self.connection)
            .await?;
        models.into_iter().map(Self::model_to_domain).collect()
    }

    /// The programme airing at `at` (start <= at < end)
    pub async fn find_current(
        &self,
        network_id: &Uuid,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Option<Programme>> {
        let at = truncate_to_second(at);
        let model = NetworkProgrammes::find()
            .filter(network_programmes::Column::NetworkId.eq(*network_id))
            .filter(network_programmes::Column::StartTime.lte(at))
            .filter(network_programmes::Column::EndTime.gt(at))
            .order_by_desc(network_programmes::Column::StartTime)
            .one(&*self.connection)
            .await?;
        model.map(Self::model_to_domain).transpose()
    }

    /// Programmes still to finish after `from`, the current one included
    pub async fn find_upcoming(
        &self,
        network_id: &Uuid,
        from: DateTime<Utc>,
        limit: u64,
    ) -> RepositoryResult<Vec<Programme>> {
        let from = truncate_to_second(from);
        let models = NetworkProgrammes::find()
            .filter(network_programmes::Column::NetworkId.eq(*network_id))
            .filter(network_programmes::Column::EndTime.gt(from))
            .order_by_asc(network_programmes::Column::StartTime)
            .limit(limit)
            .all(&*self.connection)
            .await?;
        models.into_iter().map(Self::model_to_domain).collect()
    }

    /// The latest-ending programme of a network
    pub async fn find_last(&self, network_id: &Uuid) -> RepositoryResult<Option<Programme>> {
        let model = NetworkProgrammes::find()
            .filter(network_programmes::Column::NetworkId.eq(*network_id))
            .order_by_desc(network_programmes::Column::EndTime)
            .one(&*self.connection)
            .await?;
        model.map(Self::model_to_domain).transpose()
    }

    /// Programmes of the given networks overlapping `[start, end)`
    pub async fn find_in_range(
        &self,
        network_ids: &[Uuid],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Programme>> {
        if network_ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = NetworkProgrammes::find()
            .filter(network_programmes::Column::NetworkId.is_in(network_ids.iter().copied()))
            .filter(network_programmes::Column::EndTime.gt(truncate_to_second(start)))
            .filter(network_programmes::Column::StartTime.lt(truncate_to_second(end)))
            .order_by_asc(network_programmes::Column::NetworkId)
            .order_by_asc(network_programmes::Column::StartTime)
            .all(&*self.connection)
            .await?;
        models.into_iter().map(Self::model_to_domain).collect()
    }

    /// Apply a [`ScheduleWrite`] in a single transaction
    pub async fn apply_schedule(&self, write: ScheduleWrite) -> RepositoryResult<ScheduleWriteCounts> {
        let txn = self.connection.begin().await?;
        let mut counts = ScheduleWriteCounts::default();

        if !write.remove_ids.is_empty() {
            let result = NetworkProgrammes::delete_many()
                .filter(network_programmes::Column::NetworkId.eq(write.network_id))
                .filter(network_programmes::Column::Id.is_in(write.remove_ids.iter().copied()))
                .exec(&txn)
                .await?;
            counts.removed = result.rows_affected;
        }

        if !write.programmes.is_empty() {
            let now = Utc::now();
            let models = write.programmes.into_iter().map(|programme| {
                network_programmes::ActiveModel {
                    id: Set(programme.id),
                    network_id: Set(programme.network_id),
                    network_content_id: Set(programme.network_content_id),
                    content_type: Set(programme.content.kind().to_string()),
                    content_id: Set(programme.content.id()),
                    start_time: Set(programme.start_time),
                    end_time: Set(programme.end_time),
                    duration_seconds: Set(programme.duration_seconds),
                    title: Set(programme.title),
                    description: Set(programme.description),
                    image: Set(programme.image),
                    created_at: Set(now),
                }
            });
            counts.created = NetworkProgrammes::insert_many(models)
                .exec_without_returning(&txn)
                .await?;
        }

        if let Some(prune_before) = write.prune_before {
            let mut prune = NetworkProgrammes::delete_many()
                .filter(network_programmes::Column::NetworkId.eq(write.network_id))
                .filter(network_programmes::Column::EndTime.lt(truncate_to_second(prune_before)));
            if let Some(keep_id) = write.keep_id {
                prune = prune.filter(network_programmes::Column::Id.ne(keep_id));
            }
            counts.pruned = prune.exec(&txn).await?.rows_affected;
        }

        let network = Networks::find_by_id(write.network_id)
            .one(&txn)
            .await?
            .ok_or_else(|| RepositoryError::RecordNotFound {
                table: "networks".to_string(),
                field: "id".to_string(),
                value: write.network_id.to_string(),
            })?;
        let mut active_model: networks::ActiveModel = network.into();
        active_model.schedule_generated_at = Set(Some(write.generated_at));
        active_model.updated_at = Set(Utc::now());
        active_model.update(&txn).await?;

        txn.commit().await?;
        Ok(counts)
    }

    fn model_to_domain(model: network_programmes::Model) -> RepositoryResult<Programme> {
        let kind = ContentKind::from_str(&model.content_type).map_err(|_| {
            RepositoryError::invalid_value("network_programmes", "content_type", &model.content_type)
        })?;

        Ok(Programme {
            id: model.id,
            network_id: model.network_id,
            network_content_id: model.network_content_id,
            content: ContentRef::new(kind, model.content_id),
            start_time: model.start_time,
            end_time: model.end_time,
            duration_seconds: model.duration_seconds,
            title: model.title,
            description: model.description,
            image: model.image,
        })
    }
}

//! SeaORM repository for networks and their broadcast state

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{network_contents, network_programmes, networks, prelude::*};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::{BroadcastUpdate, Network, NetworkCreateRequest, TranscodeMode};

#[derive(Clone)]
pub struct NetworkSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl NetworkSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    pub async fn create(&self, request: NetworkCreateRequest) -> RepositoryResult<Network> {
        let now = Utc::now();
        let active_model = networks::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            token: Set(Uuid::new_v4().simple().to_string()),
            logo: Set(request.logo),
            enabled: Set(request.enabled),
            broadcast_enabled: Set(request.broadcast_enabled),
            broadcast_requested: Set(false),
            broadcast_pid: Set(None),
            broadcast_started_at: Set(None),
            broadcast_segment_sequence: Set(0),
            broadcast_programme_id: Set(None),
            broadcast_initial_offset_seconds: Set(None),
            broadcast_error: Set(None),
            transcode_mode: Set(request.transcode_mode.to_string()),
            loop_content: Set(request.loop_content),
            auto_regenerate_schedule: Set(request.auto_regenerate_schedule),
            schedule_generated_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(&*self.connection).await?;
        Self::model_to_domain(model)
    }

    pub async fn find_by_id(&self, id: &Uuid) -> RepositoryResult<Option<Network>> {
        let model = Networks::find_by_id(*id).one(&*self.connection).await?;
        model.map(Self::model_to_domain).transpose()
    }

    pub async fn find_by_token(&self, token: &str) -> RepositoryResult<Option<Network>> {
        let model = Networks::find()
            .filter(networks::Column::Token.eq(token))
            .one(&*self.connection)
            .await?;
        model.map(Self::model_to_domain).transpose()
    }

    pub async fn find_all(&self) -> RepositoryResult<Vec<Network>> {
        let models = Networks::find()
            .order_by_asc(networks::Column::Name)
            .all(&*self.connection)
            .await?;
        models.into_iter().map(Self::model_to_domain).collect()
    }

    /// Networks that are switched on, regardless of broadcast state
    pub async fn find_enabled(&self) -> RepositoryResult<Vec<Network>> {
        let models = Networks::find()
            .filter(networks::Column::Enabled.eq(true))
            .order_by_asc(networks::Column::Name)
            .all(&*self.connection)
            .await?;
        models.into_iter().map(Self::model_to_domain).collect()
    }

    /// Networks the supervisor is responsible for
    pub async fn find_broadcastable(&self) -> RepositoryResult<Vec<Network>> {
        let models = Networks::find()
            .filter(networks::Column::Enabled.eq(true))
            .filter(networks::Column::BroadcastEnabled.eq(true))
            .order_by_asc(networks::Column::Name)
            .all(&*self.connection)
            .await?;
        models.into_iter().map(Self::model_to_domain).collect()
    }

    /// Apply a partial update of the broadcast columns
    pub async fn update_broadcast(
        &self,
        id: &Uuid,
        update: BroadcastUpdate,
    ) -> RepositoryResult<Network> {
        let model = Networks::find_by_id(*id)
            .one(&*self.connection)
            .await?
            .ok_or_else(|| RepositoryError::RecordNotFound {
                table: "networks".to_string(),
                field: "id".to_string(),
                value: id.to_string(),
            })?;

        let mut active_model: networks::ActiveModel = model.into();

        if let Some(requested) = update.requested {
            active_model.broadcast_requested = Set(requested);
        }
        if let Some(pid) = update.pid {
            active_model.broadcast_pid = Set(pid);
        }
        if let Some(started_at) = update.started_at {
            active_model.broadcast_started_at = Set(started_at);
        }
        if let Some(sequence) = update.segment_sequence {
            active_model.broadcast_segment_sequence = Set(sequence);
        }
        if let Some(programme_id) = update.programme_id {
            active_model.broadcast_programme_id = Set(programme_id);
        }
        if let Some(offset) = update.initial_offset_seconds {
            active_model.broadcast_initial_offset_seconds = Set(offset);
        }
        if let Some(error) = update.error {
            active_model.broadcast_error = Set(error);
        }
        active_model.updated_at = Set(Utc::now());

        let updated = active_model.update(&*self.connection).await?;
        Self::model_to_domain(updated)
    }

    pub async fn set_enabled(&self, id: &Uuid, enabled: bool) -> RepositoryResult<Network> {
        self.update_flags(id, Some(enabled), None).await
    }

    pub async fn set_broadcast_enabled(
        &self,
        id: &Uuid,
        broadcast_enabled: bool,
    ) -> RepositoryResult<Network> {
        self.update_flags(id, None, Some(broadcast_enabled)).await
    }

    async fn update_flags(
        &self,
        id: &Uuid,
        enabled: Option<bool>,
        broadcast_enabled: Option<bool>,
    ) -> RepositoryResult<Network> {
        let model = Networks::find_by_id(*id)
            .one(&*self.connection)
            .await?
            .ok_or_else(|| RepositoryError::RecordNotFound {
                table: "networks".to_string(),
                field: "id".to_string(),
                value: id.to_string(),
            })?;

        let mut active_model: networks::ActiveModel = model.into();
        if let Some(enabled) = enabled {
            active_model.enabled = Set(enabled);
        }
        if let Some(broadcast_enabled) = broadcast_enabled {
            active_model.broadcast_enabled = Set(broadcast_enabled);
        }
        active_model.updated_at = Set(Utc::now());

        let updated = active_model.update(&*self.connection).await?;
        Self::model_to_domain(updated)
    }

    /// Delete a network together with its pool and timeline
    pub async fn delete(&self, id: &Uuid) -> RepositoryResult<bool> {
        let txn = self.connection.begin().await?;

        NetworkProgrammes::delete_many()
            .filter(network_programmes::Column::NetworkId.eq(*id))
            .exec(&txn)
            .await?;
        NetworkContents::delete_many()
            .filter(network_contents::Column::NetworkId.eq(*id))
            .exec(&txn)
            .await?;
        let result = Networks::delete_by_id(*id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    fn model_to_domain(model: networks::Model) -> RepositoryResult<Network> {
        let transcode_mode = TranscodeMode::from_str(&model.transcode_mode).map_err(|_| {
            RepositoryError::invalid_value("networks", "transcode_mode", &model.transcode_mode)
        })?;

        Ok(Network {
            id: model.id,
            name: model.name,
            token: model.token,
            logo: model.logo,
            enabled: model.enabled,
            broadcast_enabled: model.broadcast_enabled,
            broadcast_requested: model.broadcast_requested,
            broadcast_pid: model.broadcast_pid,
            broadcast_started_at: model.broadcast_started_at,
            broadcast_segment_sequence: model.broadcast_segment_sequence,
            broadcast_programme_id: model.broadcast_programme_id,
            broadcast_initial_offset_seconds: model.broadcast_initial_offset_seconds,
            broadcast_error: model.broadcast_error,
            transcode_mode,
            loop_content: model.loop_content,
            auto_regenerate_schedule: model.auto_regenerate_schedule,
            schedule_generated_at: model.schedule_generated_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    #[tokio::test]
    async fn test_create_and_find_network() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = NetworkSeaOrmRepository::new(db.connection());

        let mut request = NetworkCreateRequest::new("Retro TV");
        request.transcode_mode = TranscodeMode::Server;
        let network = repo.create(request).await.unwrap();

        assert_eq!(network.token.len(), 32);
        assert!(!network.broadcast_requested);

        let by_token = repo.find_by_token(&network.token).await.unwrap().unwrap();
        assert_eq!(by_token.id, network.id);
        assert_eq!(by_token.transcode_mode, TranscodeMode::Server);
        assert!(repo.find_by_token("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_broadcast_update_only_touches_given_columns() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = NetworkSeaOrmRepository::new(db.connection());
        let network = repo.create(NetworkCreateRequest::new("News")).await.unwrap();

        let started_at = crate::utils::time::truncate_to_second(Utc::now());
        let programme_id = Uuid::new_v4();
        let updated = repo
            .update_broadcast(
                &network.id,
                BroadcastUpdate::started(4242, started_at, programme_id, 90),
            )
            .await
            .unwrap();
        assert_eq!(updated.broadcast_pid, Some(4242));
        assert_eq!(updated.broadcast_programme_id, Some(programme_id));
        assert_eq!(updated.broadcast_initial_offset_seconds, Some(90));
        assert!(!updated.broadcast_requested);

        let stopped = repo
            .update_broadcast(&network.id, BroadcastUpdate::stopped())
            .await
            .unwrap();
        assert_eq!(stopped.broadcast_pid, None);
        assert_eq!(stopped.broadcast_started_at, None);
        assert_eq!(stopped.broadcast_segment_sequence, 0);
        assert_eq!(stopped.broadcast_programme_id, Some(programme_id));
    }

    #[tokio::test]
    async fn test_find_broadcastable_filters_flags() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = NetworkSeaOrmRepository::new(db.connection());

        let mut on = NetworkCreateRequest::new("On");
        on.broadcast_enabled = true;
        let on = repo.create(on).await.unwrap();

        let mut disabled = NetworkCreateRequest::new("Disabled");
        disabled.broadcast_enabled = true;
        disabled.enabled = false;
        repo.create(disabled).await.unwrap();
        repo.create(NetworkCreateRequest::new("Off")).await.unwrap();

        let networks = repo.find_broadcastable().await.unwrap();
        assert_eq!(networks.len(), 1);
        assert_eq!(networks[0].id, on.id);
        assert_eq!(repo.find_enabled().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_network() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = NetworkSeaOrmRepository::new(db.connection());
        let network = repo.create(NetworkCreateRequest::new("Gone")).await.unwrap();

        assert!(repo.delete(&network.id).await.unwrap());
        assert!(!repo.delete(&network.id).await.unwrap());
        assert!(repo.find_by_id(&network.id).await.unwrap().is_none());
    }
}

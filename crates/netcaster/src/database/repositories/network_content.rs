//! SeaORM repository for a network's content pool

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{network_contents, prelude::NetworkContents};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::{ContentItem, ContentItemCreateRequest, ContentKind, ContentRef};

#[derive(Clone)]
pub struct NetworkContentSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl NetworkContentSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    pub async fn add(
        &self,
        network_id: &Uuid,
        request: ContentItemCreateRequest,
    ) -> RepositoryResult<ContentItem> {
        let active_model = network_contents::ActiveModel {
            id: Set(Uuid::new_v4()),
            network_id: Set(*network_id),
            content_type: Set(request.content.kind().to_string()),
            content_id: Set(request.content.id()),
            sort_order: Set(request.sort_order),
            weight: Set(request.weight),
            created_at: Set(Utc::now()),
        };

        let model = active_model.insert(&*self.connection).await?;
        Self::model_to_domain(model)
    }

    /// The rotation pool in consumption order
    pub async fn find_by_network(&self, network_id: &Uuid) -> RepositoryResult<Vec<ContentItem>> {
        let models = NetworkContents::find()
            .filter(network_contents::Column::NetworkId.eq(*network_id))
            .order_by_asc(network_contents::Column::SortOrder)
            .order_by_asc(network_contents::Column::CreatedAt)
            .order_by_asc(network_contents::Column::Id)
            .all(&*self.connection)
            .await?;

        models.into_iter().map(Self::model_to_domain).collect()
    }

    pub async fn remove(&self, id: &Uuid) -> RepositoryResult<bool> {
        let result = NetworkContents::delete_by_id(*id)
            .exec(&*self.connection)
            .await?;
        Ok(result.rows_affected > 0)
    }

    fn model_to_domain(model: network_contents::Model) -> RepositoryResult<ContentItem> {
        let kind = ContentKind::from_str(&model.content_type).map_err(|_| {
            RepositoryError::invalid_value("network_contents", "content_type", &model.content_type)
        })?;

        Ok(ContentItem {
            id: model.id,
            network_id: model.network_id,
            content: ContentRef::new(kind, model.content_id),
            sort_order: model.sort_order,
            weight: model.weight,
            created_at: model.created_at,
        })
    }
}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "networks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub token: String,
    pub logo: Option<String>,
    pub enabled: bool,
    pub broadcast_enabled: bool,
    pub broadcast_requested: bool,
    pub broadcast_pid: Option<i64>,
    pub broadcast_started_at: Option<ChronoDateTimeUtc>,
    pub broadcast_segment_sequence: i64,
    pub broadcast_programme_id: Option<Uuid>,
    pub broadcast_initial_offset_seconds: Option<i64>,
    pub broadcast_error: Option<String>,
    pub transcode_mode: String,
    pub loop_content: bool,
    pub auto_regenerate_schedule: bool,
    pub schedule_generated_at: Option<ChronoDateTimeUtc>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::network_contents::Entity")]
    NetworkContents,
    #[sea_orm(has_many = "super::network_programmes::Entity")]
    NetworkProgrammes,
}

impl Related<super::network_contents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NetworkContents.def()
    }
}

impl Related<super::network_programmes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NetworkProgrammes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

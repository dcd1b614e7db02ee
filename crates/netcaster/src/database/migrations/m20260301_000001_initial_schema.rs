use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create tables in order of dependencies
        self.create_series_table(manager).await?;
        self.create_episodes_table(manager).await?;
        self.create_channels_table(manager).await?;
        self.create_networks_table(manager).await?;
        self.create_network_contents_table(manager).await?;
        self.create_network_programmes_table(manager).await?;

        self.create_indexes(manager).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NetworkProgrammes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(NetworkContents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Networks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Channels::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Episodes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Series::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    // Postgres gets native uuid/timestamptz, the others store text
    fn create_id_column(&self, manager: &SchemaManager, column: impl IntoIden) -> ColumnDef {
        let mut col = ColumnDef::new(column);
        match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => col.uuid().not_null(),
            _ => col.string().not_null(),
        };
        col
    }

    fn create_nullable_uuid_column(
        &self,
        manager: &SchemaManager,
        column: impl IntoIden,
    ) -> ColumnDef {
        let mut col = ColumnDef::new(column);
        match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => col.uuid(),
            _ => col.string(),
        };
        col
    }

    fn create_timestamp_column(&self, manager: &SchemaManager, column: impl IntoIden) -> ColumnDef {
        let mut col = ColumnDef::new(column);
        match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => col.timestamp_with_time_zone().not_null(),
            _ => col.string().not_null(),
        };
        col
    }

    fn create_nullable_timestamp_column(
        &self,
        manager: &SchemaManager,
        column: impl IntoIden,
    ) -> ColumnDef {
        let mut col = ColumnDef::new(column);
        match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => col.timestamp_with_time_zone(),
            _ => col.string(),
        };
        col
    }

    async fn create_series_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Series::Table)
                    .if_not_exists()
                    .col(self.create_id_column(manager, Series::Id).primary_key())
                    .col(ColumnDef::new(Series::Title).string().not_null())
                    .col(ColumnDef::new(Series::Cover).string())
                    .col(self.create_timestamp_column(manager, Series::CreatedAt))
                    .col(self.create_timestamp_column(manager, Series::UpdatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn create_episodes_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Episodes::Table)
                    .if_not_exists()
                    .col(self.create_id_column(manager, Episodes::Id).primary_key())
                    .col(self.create_nullable_uuid_column(manager, Episodes::SeriesId))
                    .col(ColumnDef::new(Episodes::Title).string().not_null())
                    .col(ColumnDef::new(Episodes::Description).text())
                    .col(ColumnDef::new(Episodes::Cover).string())
                    .col(ColumnDef::new(Episodes::DurationSeconds).big_integer())
                    .col(ColumnDef::new(Episodes::StreamUrl).string().not_null())
                    .col(
                        ColumnDef::new(Episodes::Provider)
                            .string()
                            .not_null()
                            .default("generic"),
                    )
                    .col(self.create_timestamp_column(manager, Episodes::CreatedAt))
                    .col(self.create_timestamp_column(manager, Episodes::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_episodes_series_id")
                            .from(Episodes::Table, Episodes::SeriesId)
                            .to(Series::Table, Series::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_channels_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Channels::Table)
                    .if_not_exists()
                    .col(self.create_id_column(manager, Channels::Id).primary_key())
                    .col(ColumnDef::new(Channels::Name).string().not_null())
                    .col(ColumnDef::new(Channels::Logo).string())
                    .col(ColumnDef::new(Channels::StreamUrl).string().not_null())
                    .col(
                        ColumnDef::new(Channels::Provider)
                            .string()
                            .not_null()
                            .default("generic"),
                    )
                    .col(self.create_timestamp_column(manager, Channels::CreatedAt))
                    .col(self.create_timestamp_column(manager, Channels::UpdatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn create_networks_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Networks::Table)
                    .if_not_exists()
                    .col(self.create_id_column(manager, Networks::Id).primary_key())
                    .col(ColumnDef::new(Networks::Name).string().not_null())
                    .col(
                        ColumnDef::new(Networks::Token)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Networks::Logo).string())
                    .col(
                        ColumnDef::new(Networks::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Networks::BroadcastEnabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Networks::BroadcastRequested)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Networks::BroadcastPid).big_integer())
                    .col(self.create_nullable_timestamp_column(manager, Networks::BroadcastStartedAt))
                    .col(
                        ColumnDef::new(Networks::BroadcastSegmentSequence)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(self.create_nullable_uuid_column(manager, Networks::BroadcastProgrammeId))
                    .col(ColumnDef::new(Networks::BroadcastInitialOffsetSeconds).big_integer())
                    .col(ColumnDef::new(Networks::BroadcastError).text())
                    .col(
                        ColumnDef::new(Networks::TranscodeMode)
                            .string()
                            .not_null()
                            .default("direct"),
                    )
                    .col(
                        ColumnDef::new(Networks::LoopContent)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Networks::AutoRegenerateSchedule)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(self.create_nullable_timestamp_column(manager, Networks::ScheduleGeneratedAt))
                    .col(self.create_timestamp_column(manager, Networks::CreatedAt))
                    .col(self.create_timestamp_column(manager, Networks::UpdatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn create_network_contents_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NetworkContents::Table)
                    .if_not_exists()
                    .col(self.create_id_column(manager, NetworkContents::Id).primary_key())
                    .col(self.create_id_column(manager, NetworkContents::NetworkId))
                    .col(ColumnDef::new(NetworkContents::ContentType).string().not_null())
                    .col(self.create_id_column(manager, NetworkContents::ContentId))
                    .col(
                        ColumnDef::new(NetworkContents::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(NetworkContents::Weight)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(self.create_timestamp_column(manager, NetworkContents::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_network_contents_network_id")
                            .from(NetworkContents::Table, NetworkContents::NetworkId)
                            .to(Networks::Table, Networks::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_network_programmes_table(
        &self,
        manager: &SchemaManager<'_>,
    ) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NetworkProgrammes::Table)
                    .if_not_exists()
                    .col(self.create_id_column(manager, NetworkProgrammes::Id).primary_key())
                    .col(self.create_id_column(manager, NetworkProgrammes::NetworkId))
                    .col(self.create_nullable_uuid_column(manager, NetworkProgrammes::NetworkContentId))
                    .col(ColumnDef::new(NetworkProgrammes::ContentType).string().not_null())
                    .col(self.create_id_column(manager, NetworkProgrammes::ContentId))
                    .col(self.create_timestamp_column(manager, NetworkProgrammes::StartTime))
                    .col(self.create_timestamp_column(manager, NetworkProgrammes::EndTime))
                    .col(
                        ColumnDef::new(NetworkProgrammes::DurationSeconds)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(NetworkProgrammes::Title).string().not_null())
                    .col(ColumnDef::new(NetworkProgrammes::Description).text())
                    .col(ColumnDef::new(NetworkProgrammes::Image).string())
                    .col(self.create_timestamp_column(manager, NetworkProgrammes::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_network_programmes_network_id")
                            .from(NetworkProgrammes::Table, NetworkProgrammes::NetworkId)
                            .to(Networks::Table, Networks::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_network_programmes_network_content_id")
                            .from(NetworkProgrammes::Table, NetworkProgrammes::NetworkContentId)
                            .to(NetworkContents::Table, NetworkContents::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_indexes(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_episodes_series_id")
                    .table(Episodes::Table)
                    .col(Episodes::SeriesId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_network_contents_network_sort")
                    .table(NetworkContents::Table)
                    .col(NetworkContents::NetworkId)
                    .col(NetworkContents::SortOrder)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_network_programmes_network_start")
                    .table(NetworkProgrammes::Table)
                    .col(NetworkProgrammes::NetworkId)
                    .col(NetworkProgrammes::StartTime)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_network_programmes_network_end")
                    .table(NetworkProgrammes::Table)
                    .col(NetworkProgrammes::NetworkId)
                    .col(NetworkProgrammes::EndTime)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}

// Table identifiers
#[derive(DeriveIden)]
enum Series {
    Table,
    Id,
    Title,
    Cover,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Episodes {
    Table,
    Id,
    SeriesId,
    Title,
    Description,
    Cover,
    DurationSeconds,
    StreamUrl,
    Provider,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Channels {
    Table,
    Id,
    Name,
    Logo,
    StreamUrl,
    Provider,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Networks {
    Table,
    Id,
    Name,
    Token,
    Logo,
    Enabled,
    BroadcastEnabled,
    BroadcastRequested,
    BroadcastPid,
    BroadcastStartedAt,
    BroadcastSegmentSequence,
    BroadcastProgrammeId,
    BroadcastInitialOffsetSeconds,
    BroadcastError,
    TranscodeMode,
    LoopContent,
    AutoRegenerateSchedule,
    ScheduleGeneratedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum NetworkContents {
    Table,
    Id,
    NetworkId,
    ContentType,
    ContentId,
    SortOrder,
    Weight,
    CreatedAt,
}

#[derive(DeriveIden)]
enum NetworkProgrammes {
    Table,
    Id,
    NetworkId,
    NetworkContentId,
    ContentType,
    ContentId,
    StartTime,
    EndTime,
    DurationSeconds,
    Title,
    Description,
    Image,
    CreatedAt,
}

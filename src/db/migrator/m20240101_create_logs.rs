use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Logs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Logs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Logs::Level).string().not_null())
                    .col(ColumnDef::new(Logs::Message).text().not_null())
                    .col(ColumnDef::new(Logs::ResourceId).string().null())
                    .col(ColumnDef::new(Logs::Timestamp).date_time().not_null())
                    .col(ColumnDef::new(Logs::TraceId).string().null())
                    .col(ColumnDef::new(Logs::SpanId).string().null())
                    .col(ColumnDef::new(Logs::Commit).string().null())
                    .col(ColumnDef::new(Logs::Metadata).json().null())
                    .col(
                        ColumnDef::new(Logs::CreatedAt)
                            .date_time()
                            .not_null()
                            .extra("DEFAULT CURRENT_TIMESTAMP".to_owned()),
                    )
                    .to_owned(),
            )
            .await?;

        // Indexes backing the query engine's filter predicates
        for (name, column) in [
            ("idx_logs_timestamp", Logs::Timestamp),
            ("idx_logs_level", Logs::Level),
            ("idx_logs_resource_id", Logs::ResourceId),
            ("idx_logs_trace_id", Logs::TraceId),
            ("idx_logs_commit", Logs::Commit),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Logs::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Logs::Table).to_owned())
            .await
    }
}

#[derive(Iden, Clone, Copy)]
enum Logs {
    Table,
    Id,
    Level,
    Message,
    ResourceId,
    Timestamp,
    TraceId,
    SpanId,
    Commit,
    Metadata,
    CreatedAt,
}

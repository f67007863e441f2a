use sea_orm_migration::{
    async_trait::async_trait,
    prelude::{DbErr, DeriveMigrationName, Iden, MigrationTrait, SchemaManager, Table},
    schema::{big_integer, integer},
    sea_query,
};

#[derive(Iden)]
enum SyncWatermark {
    Table,
    Id,
    LastSyncedBlock,
    LastSyncTime,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncWatermark::Table)
                    .if_not_exists()
                    .col(integer(SyncWatermark::Id).primary_key())
                    .col(big_integer(SyncWatermark::LastSyncedBlock))
                    .col(big_integer(SyncWatermark::LastSyncTime))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(SyncWatermark::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

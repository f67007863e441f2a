use sea_orm_migration::{
    async_trait::async_trait,
    prelude::{DbErr, DeriveMigrationName, Iden, Index, MigrationTrait, SchemaManager, Table},
    schema::{big_integer, boolean, string_len, text},
    sea_query,
};

#[derive(Iden)]
enum AccessLog {
    Table,
    TxHash,
    LogIndex,
    DeviceId,
    Reason,
    Success,
    Timestamp,
    BlockNumber,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AccessLog::Table)
                    .if_not_exists()
                    .col(string_len(AccessLog::TxHash, 66))
                    .col(big_integer(AccessLog::LogIndex))
                    .col(string_len(AccessLog::DeviceId, 42))
                    .col(text(AccessLog::Reason))
                    .col(boolean(AccessLog::Success))
                    .col(big_integer(AccessLog::Timestamp))
                    .col(big_integer(AccessLog::BlockNumber))
                    .col(big_integer(AccessLog::CreatedAt))
                    .primary_key(
                        Index::create()
                            .col(AccessLog::TxHash)
                            .col(AccessLog::LogIndex),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_access_log_chain_order")
                    .table(AccessLog::Table)
                    .if_not_exists()
                    .col(AccessLog::BlockNumber)
                    .col(AccessLog::LogIndex)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_access_log_device")
                    .table(AccessLog::Table)
                    .if_not_exists()
                    .col(AccessLog::DeviceId)
                    .col(AccessLog::BlockNumber)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AccessLog::Table).if_exists().to_owned())
            .await
    }
}

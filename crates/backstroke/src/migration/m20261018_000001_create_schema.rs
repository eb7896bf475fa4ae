//! Initial migration creating the queue and status tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_operation_queue(manager).await?;
        self.create_operation_status(manager).await?;
        self.create_link_operation(manager).await?;
        self.create_operation_counter(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OperationCounter::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LinkOperation::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OperationStatus::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OperationQueue::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_operation_queue(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OperationQueue::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OperationQueue::Seq)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OperationQueue::Id)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(OperationQueue::Payload).json().not_null())
                    .col(
                        ColumnDef::new(OperationQueue::EnqueuedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_operation_status(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OperationStatus::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OperationStatus::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OperationStatus::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OperationStatus::Record).json().not_null())
                    .col(
                        ColumnDef::new(OperationStatus::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OperationStatus::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Purges scan by expiry
        manager
            .create_index(
                Index::create()
                    .name("idx_operation_status_expires_at")
                    .table(OperationStatus::Table)
                    .col(OperationStatus::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_link_operation(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LinkOperation::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(LinkOperation::LinkId).string().not_null())
                    .col(ColumnDef::new(LinkOperation::OperationId).uuid().not_null())
                    .col(
                        ColumnDef::new(LinkOperation::Score)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(LinkOperation::LinkId)
                            .col(LinkOperation::OperationId),
                    )
                    .to_owned(),
            )
            .await?;

        // Composite index on (link_id, score) for ordered listings and pruning
        manager
            .create_index(
                Index::create()
                    .name("idx_link_operation_link_score")
                    .table(LinkOperation::Table)
                    .col(LinkOperation::LinkId)
                    .col(LinkOperation::Score)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_operation_counter(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OperationCounter::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OperationCounter::Name)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OperationCounter::Value)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
#[sea_orm(iden = "operation_queue")]
enum OperationQueue {
    Table,
    Seq,
    Id,
    Payload,
    EnqueuedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "operation_status")]
enum OperationStatus {
    Table,
    Id,
    Status,
    Record,
    ExpiresAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "link_operation")]
enum LinkOperation {
    Table,
    LinkId,
    OperationId,
    Score,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "operation_counter")]
enum OperationCounter {
    Table,
    Name,
    Value,
}

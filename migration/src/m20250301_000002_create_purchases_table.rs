use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Purchases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Purchases::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Purchases::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Purchases::OriginalTransactionId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Purchases::TransactionId).string().not_null())
                    .col(ColumnDef::new(Purchases::ProductId).string().not_null())
                    .col(
                        ColumnDef::new(Purchases::CreditsGranted)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Purchases::PurchaseDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Purchases::Platform).string().not_null())
                    .col(
                        ColumnDef::new(Purchases::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchases_user_id")
                            .from(Purchases::Table, Purchases::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // The unique constraint is the final arbiter against double-crediting:
        // a concurrent duplicate insert must fail here, not silently succeed.
        manager
            .create_index(
                Index::create()
                    .name("idx_purchases_original_transaction_id")
                    .table(Purchases::Table)
                    .col(Purchases::OriginalTransactionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchases_user_id")
                    .table(Purchases::Table)
                    .col(Purchases::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Purchases::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Purchases {
    Table,
    Id,
    UserId,
    OriginalTransactionId,
    TransactionId,
    ProductId,
    CreditsGranted,
    PurchaseDate,
    Platform,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

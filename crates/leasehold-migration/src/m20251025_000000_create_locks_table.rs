use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // The primary key on lock_key is what makes acquisition exclusive
        manager
            .create_table(
                Table::create()
                    .table(Locks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Locks::LockKey).string().not_null().primary_key())
                    .col(ColumnDef::new(Locks::Owner).string().not_null())
                    .col(ColumnDef::new(Locks::ExpiresAt).date_time().null())
                    .col(ColumnDef::new(Locks::CreatedAt).date_time().null())
                    .col(ColumnDef::new(Locks::UpdatedAt).date_time().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Locks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Locks {
    Table,
    LockKey,
    Owner,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}

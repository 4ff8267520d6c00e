use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SocialAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SocialAccounts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SocialAccounts::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(SocialAccounts::Driver)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SocialAccounts::Identity)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SocialAccounts::Username).string_len(255))
                    .col(ColumnDef::new(SocialAccounts::Email).string_len(255))
                    .col(ColumnDef::new(SocialAccounts::Avatar).text())
                    .col(
                        ColumnDef::new(SocialAccounts::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SocialAccounts::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_social_accounts_user_id")
                            .from(SocialAccounts::Table, SocialAccounts::UserId)
                            .to(Users::Table, Users::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // upsert 依赖该唯一索引
        manager
            .create_index(
                Index::create()
                    .name("uk_social_accounts_user_driver")
                    .table(SocialAccounts::Table)
                    .col(SocialAccounts::UserId)
                    .col(SocialAccounts::Driver)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_social_accounts_driver_identity")
                    .table(SocialAccounts::Table)
                    .col(SocialAccounts::Driver)
                    .col(SocialAccounts::Identity)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SocialAccounts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SocialAccounts {
    Table,
    Id,
    UserId,
    Driver,
    Identity,
    Username,
    Email,
    Avatar,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

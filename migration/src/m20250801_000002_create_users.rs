use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create dasher status enum
        manager
            .create_type(
                Type::create()
                    .as_enum(DasherStatus::Enum)
                    .values([DasherStatus::Online, DasherStatus::Offline])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(uuid(User::Id).primary_key())
                    .col(string_len(User::FirstName, 50).not_null())
                    .col(string_len(User::LastName, 50).not_null())
                    .col(string_len(User::Email, 255).not_null().unique_key())
                    .col(string_len_null(User::PhoneNumber, 20))
                    .col(string_len(User::PasswordHash, 255).not_null())
                    .col(boolean(User::IsDasher).not_null().default(false))
                    .col(
                        ColumnDef::new(User::DasherStatus)
                            .custom(DasherStatus::Enum)
                            .not_null(),
                    )
                    .col(
                        timestamp_with_time_zone(User::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(DasherStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum User {
    Table,
    Id,
    FirstName,
    LastName,
    Email,
    PhoneNumber,
    PasswordHash,
    IsDasher,
    DasherStatus,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum DasherStatus {
    #[sea_orm(iden = "dasher_status")]
    Enum,
    #[sea_orm(iden = "online")]
    Online,
    #[sea_orm(iden = "offline")]
    Offline,
}

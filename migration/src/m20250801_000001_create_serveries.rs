use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Servery::Table)
                    .if_not_exists()
                    .col(pk_auto(Servery::Id))
                    .col(string_len(Servery::Name, 50).not_null().unique_key())
                    .col(double(Servery::Lat).not_null())
                    .col(double(Servery::Lng).not_null())
                    .to_owned(),
            )
            .await?;

        // Seed the campus serveries
        let insert = Query::insert()
            .into_table(Servery::Table)
            .columns([Servery::Name, Servery::Lat, Servery::Lng])
            .values_panic(["Baker".into(), (29.7164).into(), (-95.4018).into()])
            .values_panic(["North".into(), (29.7184).into(), (-95.4018).into()])
            .values_panic(["Seibel".into(), (29.7174).into(), (-95.4008).into()])
            .values_panic(["South".into(), (29.7164).into(), (-95.4008).into()])
            .values_panic(["West".into(), (29.7174).into(), (-95.4028).into()])
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Servery::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Servery {
    Table,
    Id,
    Name,
    Lat,
    Lng,
}

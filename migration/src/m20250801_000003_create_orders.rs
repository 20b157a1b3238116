use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20250801_000001_create_serveries::Servery;
use super::m20250801_000002_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(OrderStatus::Enum)
                    .values([
                        OrderStatus::Pending,
                        OrderStatus::Accepted,
                        OrderStatus::Delivered,
                        OrderStatus::Cancelled,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(PaymentStatus::Enum)
                    .values([
                        PaymentStatus::Pending,
                        PaymentStatus::Paid,
                        PaymentStatus::Refunded,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Order::Table)
                    .if_not_exists()
                    .col(uuid(Order::Id).primary_key())
                    .col(uuid(Order::CustomerId).not_null())
                    .col(uuid_null(Order::DasherId))
                    .col(integer(Order::ServeryId).not_null())
                    .col(json_binary(Order::OrderItems).not_null())
                    .col(
                        ColumnDef::new(Order::Status)
                            .custom(OrderStatus::Enum)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Order::PaymentStatus)
                            .custom(PaymentStatus::Enum)
                            .not_null(),
                    )
                    .col(double(Order::DeliveryFee).not_null())
                    .col(double(Order::TotalAmount).not_null())
                    .col(double(Order::DistanceMiles).not_null())
                    .col(string_len(Order::DistanceSource, 32).not_null())
                    .col(string_len(Order::DeliveryLocation, 255).not_null())
                    .col(double(Order::DeliveryLat).not_null())
                    .col(double(Order::DeliveryLng).not_null())
                    .col(integer_null(Order::DeliveryRating))
                    .col(
                        timestamp_with_time_zone(Order::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_customer")
                            .from(Order::Table, Order::CustomerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_dasher")
                            .from(Order::Table, Order::DasherId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_servery")
                            .from(Order::Table, Order::ServeryId)
                            .to(Servery::Table, Servery::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Order::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(OrderStatus::Enum).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(PaymentStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Order {
    Table,
    Id,
    CustomerId,
    DasherId,
    ServeryId,
    OrderItems,
    Status,
    PaymentStatus,
    DeliveryFee,
    TotalAmount,
    DistanceMiles,
    DistanceSource,
    DeliveryLocation,
    DeliveryLat,
    DeliveryLng,
    DeliveryRating,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum OrderStatus {
    #[sea_orm(iden = "order_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "accepted")]
    Accepted,
    #[sea_orm(iden = "delivered")]
    Delivered,
    #[sea_orm(iden = "cancelled")]
    Cancelled,
}

#[derive(DeriveIden)]
pub enum PaymentStatus {
    #[sea_orm(iden = "payment_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "paid")]
    Paid,
    #[sea_orm(iden = "refunded")]
    Refunded,
}

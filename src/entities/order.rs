use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "order_status")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_status")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    pub dasher_id: Option<Uuid>,
    pub servery_id: i32,
    pub order_items: Json,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub delivery_fee: f64,
    pub total_amount: f64,
    pub distance_miles: f64,
    pub distance_source: String,
    pub delivery_location: String,
    pub delivery_lat: f64,
    pub delivery_lng: f64,
    pub delivery_rating: Option<i32>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CustomerId",
        to = "super::user::Column::Id"
    )]
    Customer,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::DasherId",
        to = "super::user::Column::Id"
    )]
    Dasher,
    #[sea_orm(
        belongs_to = "super::servery::Entity",
        from = "Column::ServeryId",
        to = "super::servery::Column::Id"
    )]
    Servery,
}

impl Related<super::servery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Servery.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

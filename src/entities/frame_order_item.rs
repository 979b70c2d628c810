use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One configured frame within a frame order.
///
/// `total` is the line total (`price * quantity`); the image URLs point at
/// durable storage by the time a row exists (see the asset materializer).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "frame_order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub frame_order_id: Uuid,

    pub title: String,
    pub shape: String,
    pub color: String,
    pub size: String,

    pub price: Decimal,
    pub quantity: i32,
    pub total: Decimal,

    pub frame_image_url: String,
    pub user_image_url: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::frame_order::Entity",
        from = "Column::FrameOrderId",
        to = "super::frame_order::Column::Id"
    )]
    FrameOrder,
}

impl Related<super::frame_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FrameOrder.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

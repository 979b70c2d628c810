use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::order::{DeliveryDetails, DeliveryStatus, PaymentMethod};

/// Composite frame order header.
///
/// A custom frame configuration has no independent stored identity, so the
/// order is fully denormalized: every configured frame is a
/// `frame_order_item` row owned by this header.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "frame_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    #[sea_orm(column_type = "Json")]
    pub shipping_details: DeliveryDetails,

    /// Shipping charge in major currency units
    pub shipping_charge: Decimal,

    /// Must equal the sum of item totals plus the shipping charge
    pub grand_total: Decimal,

    pub status: DeliveryStatus,
    pub payment_method: PaymentMethod,

    pub payment_id: Option<String>,
    pub payment_status: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::frame_order_item::Entity")]
    Items,
}

impl Related<super::frame_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

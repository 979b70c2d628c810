use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::order::ProductType;

/// Priced cart snapshot line.
///
/// Owned by the cart subsystem; the checkout core treats rows as immutable
/// once checkout begins and never writes here.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    /// Catalog product the line was configured from
    pub product_ref: Uuid,

    pub product_type: ProductType,
    pub title: String,
    pub size: String,
    pub thickness: Option<String>,

    /// Unit price in major currency units, frozen at add-to-cart time
    pub unit_price: Decimal,
    pub quantity: i32,

    pub image: Option<String>,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Print order: a single priced cart line plus delivery details.
///
/// Custom frame orders are structurally different and live in
/// `frame_order` / `frame_order_item`; both shapes share [`DeliveryStatus`].
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    /// Reference to the priced cart snapshot this order was created from
    pub cart_item_id: Uuid,

    pub product_type: ProductType,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[sea_orm(column_type = "Json")]
    pub delivery_details: DeliveryDetails,

    /// Grand total in major currency units (items total + shipping)
    pub amount: Decimal,

    /// Preview image URL carried over from the cart snapshot
    pub image: Option<String>,

    pub status: DeliveryStatus,
    pub payment_method: PaymentMethod,

    /// Gateway payment id; present only after verified online payment
    pub payment_id: Option<String>,
    pub payment_status: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cart_item::Entity",
        from = "Column::CartItemId",
        to = "super::cart_item::Column::Id"
    )]
    CartItem,
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Product families sold through the generic print path.
///
/// The storefront used to compare free-form strings; this is the closed set.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    #[sea_orm(string_value = "acrylic")]
    #[strum(serialize = "acrylic")]
    Acrylic,
    #[sea_orm(string_value = "frame")]
    #[strum(serialize = "frame")]
    Frame,
    #[sea_orm(string_value = "new_arrival")]
    #[strum(serialize = "new_arrival")]
    NewArrival,
    #[sea_orm(string_value = "special_offer")]
    #[strum(serialize = "special_offer")]
    SpecialOffer,
}

/// How the customer pays.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "cod")]
    #[strum(serialize = "cod")]
    Cod,
    #[sea_orm(string_value = "online")]
    #[strum(serialize = "online")]
    Online,
}

/// Delivery lifecycle shared by print and frame orders.
///
/// The chain is strictly linear; `Delivered` is terminal. Frame orders paid
/// on delivery enter at `COD Pending` and are confirmed into `Pending`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum DeliveryStatus {
    #[sea_orm(string_value = "COD Pending")]
    #[serde(rename = "COD Pending")]
    #[strum(serialize = "COD Pending")]
    CodPending,
    #[sea_orm(string_value = "Pending")]
    #[strum(serialize = "Pending")]
    Pending,
    #[sea_orm(string_value = "Shipped")]
    #[strum(serialize = "Shipped")]
    Shipped,
    #[sea_orm(string_value = "Out for Delivery")]
    #[serde(rename = "Out for Delivery")]
    #[strum(serialize = "Out for Delivery")]
    OutForDelivery,
    #[sea_orm(string_value = "Delivered")]
    #[strum(serialize = "Delivered")]
    Delivered,
}

impl DeliveryStatus {
    /// The single legal successor, or `None` once delivered.
    pub fn next(self) -> Option<DeliveryStatus> {
        match self {
            DeliveryStatus::CodPending => Some(DeliveryStatus::Pending),
            DeliveryStatus::Pending => Some(DeliveryStatus::Shipped),
            DeliveryStatus::Shipped => Some(DeliveryStatus::OutForDelivery),
            DeliveryStatus::OutForDelivery => Some(DeliveryStatus::Delivered),
            DeliveryStatus::Delivered => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DeliveryStatus::Delivered)
    }
}

/// Delivery address and charges, embedded in every order (never shared).
#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult, Validate, ToSchema,
)]
pub struct DeliveryDetails {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 7, max = 15))]
    pub phone: String,
    #[validate(length(min = 1, max = 300))]
    pub address: String,
    #[validate(length(min = 1, max = 100))]
    pub state: String,
    #[validate(length(min = 1, max = 100))]
    pub district: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 4, max = 10))]
    pub pincode: String,
    /// Shipping charge in major currency units
    pub shipping_charge: Decimal,
    /// Items subtotal in major currency units
    pub items_total: Decimal,
}

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Durable pending intent for the two-phase online checkout.
///
/// Created when the gateway intent is created, before the customer is handed
/// to the gateway UI. Holds the full order payload so the payment-success
/// callback (or the reconciliation worker) can persist the order without any
/// client-held state. The row id doubles as the checkout token and as the
/// deterministic id of the order it eventually produces.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "checkout_intents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    /// Gateway-side order id; unique, used to correlate callbacks
    pub gateway_order_id: String,

    pub kind: CheckoutKind,

    /// Serialized order payload (print or frame, matching `kind`)
    #[sea_orm(column_type = "Json")]
    pub payload: Json,

    /// Charged amount in minor currency units
    pub amount_minor: i64,
    pub currency: String,
    pub receipt: String,

    pub status: IntentStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Which order shape this intent will persist on completion.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum CheckoutKind {
    #[sea_orm(string_value = "print")]
    Print,
    #[sea_orm(string_value = "frame")]
    Frame,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    /// Waiting for the gateway callback
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Payment verified and order persisted
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Customer dismissed the gateway UI
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    /// Signature verification failed
    #[sea_orm(string_value = "failed")]
    Failed,
}

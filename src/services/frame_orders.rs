use crate::{
    entities::{
        frame_order::{self, Entity as FrameOrderEntity, Model as FrameOrderModel},
        frame_order_item::{self, Entity as FrameOrderItemEntity, Model as FrameOrderItemModel},
        order::{DeliveryDetails, DeliveryStatus, PaymentMethod},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::orders::{OrderListFilter, Page, PaymentReceipt, SortOrder},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func, Query},
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// One configured frame in a checkout submission.
///
/// Image references may still be ephemeral (data URLs, upload previews);
/// the asset materializer replaces them before persistence.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewFrameItem {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 50))]
    pub shape: String,
    #[validate(length(min = 1, max = 50))]
    pub color: String,
    #[validate(length(min = 1, max = 50))]
    pub size: String,
    pub price: Decimal,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub total: Decimal,
    #[validate(length(min = 1))]
    pub frame_image_url: String,
    #[validate(length(min = 1))]
    pub user_image_url: String,
}

/// Input for creating a frame order. Same idempotency contract as
/// [`crate::services::orders::NewPrintOrder`].
#[derive(Debug, Clone)]
pub struct NewFrameOrder {
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    pub items: Vec<NewFrameItem>,
    pub shipping_details: DeliveryDetails,
    pub shipping_charge: Decimal,
    pub grand_total: Decimal,
    pub status: DeliveryStatus,
    pub payment_method: PaymentMethod,
    pub payment: Option<PaymentReceipt>,
}

/// Validate the money invariants of a frame submission with field-level
/// messages: each line total must equal `price * quantity`, and the grand
/// total must equal the sum of line totals plus the shipping charge.
pub fn validate_totals(
    items: &[NewFrameItem],
    shipping_charge: Decimal,
    grand_total: Decimal,
) -> Result<(), ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::ValidationError(
            "items must not be empty".to_string(),
        ));
    }
    if shipping_charge < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "shipping_charge must not be negative".to_string(),
        ));
    }

    let mut sum = Decimal::ZERO;
    for (i, item) in items.iter().enumerate() {
        item.validate().map_err(|e| {
            ServiceError::ValidationError(format!("items[{}]: {}", i, e))
        })?;
        if item.price <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "items[{}].price must be greater than zero",
                i
            )));
        }
        let expected = item.price * Decimal::from(item.quantity);
        if item.total != expected {
            return Err(ServiceError::ValidationError(format!(
                "items[{}].total must equal price * quantity",
                i
            )));
        }
        sum += item.total;
    }

    if grand_total != sum + shipping_charge {
        return Err(ServiceError::ValidationError(
            "grand_total must equal sum of item totals plus shipping_charge".to_string(),
        ));
    }

    Ok(())
}

/// Repository for composite frame orders.
#[derive(Clone)]
pub struct FrameOrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl FrameOrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Persist a frame order header and all its line items atomically.
    #[instrument(skip(self, new), fields(user_id = %new.user_id, items = new.items.len()))]
    pub async fn create_frame_order(
        &self,
        new: NewFrameOrder,
    ) -> Result<(FrameOrderModel, Vec<FrameOrderItemModel>), ServiceError> {
        new.shipping_details.validate()?;
        validate_totals(&new.items, new.shipping_charge, new.grand_total)?;

        let db = &*self.db;

        if let Some(id) = new.id {
            if let Some(existing) = FrameOrderEntity::find_by_id(id).one(db).await? {
                info!(frame_order_id = %id, "frame order already persisted; returning existing record");
                let items = self.items_for(id).await?;
                return Ok((existing, items));
            }
        }

        let order_id = new.id.unwrap_or_else(Uuid::new_v4);
        let now = Utc::now();
        let (payment_id, payment_status, paid_at) = match new.payment {
            Some(receipt) => (
                Set(Some(receipt.payment_id)),
                Set(Some("success".to_string())),
                Set(Some(receipt.paid_at)),
            ),
            None => (Set(None), Set(None), Set(None)),
        };

        let txn = db.begin().await.map_err(|e| {
            error!("failed to begin frame order transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let header = frame_order::ActiveModel {
            id: Set(order_id),
            user_id: Set(new.user_id),
            shipping_details: Set(new.shipping_details),
            shipping_charge: Set(new.shipping_charge),
            grand_total: Set(new.grand_total),
            status: Set(new.status),
            payment_method: Set(new.payment_method),
            payment_id,
            payment_status,
            paid_at,
            created_at: Set(now),
            updated_at: Set(Some(now)),
            version: Set(1),
        };

        let header = match header.insert(&txn).await {
            Ok(model) => model,
            Err(e) if new.id.is_some() => {
                // A concurrent replay may have won the insert; converge on it.
                txn.rollback().await.ok();
                if let Some(existing) = FrameOrderEntity::find_by_id(order_id).one(db).await? {
                    let items = self.items_for(order_id).await?;
                    return Ok((existing, items));
                }
                return Err(ServiceError::DatabaseError(e));
            }
            Err(e) => {
                error!(frame_order_id = %order_id, "failed to create frame order: {}", e);
                return Err(ServiceError::DatabaseError(e));
            }
        };

        let mut stored_items = Vec::with_capacity(new.items.len());
        for item in &new.items {
            let row = frame_order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                frame_order_id: Set(order_id),
                title: Set(item.title.clone()),
                shape: Set(item.shape.clone()),
                color: Set(item.color.clone()),
                size: Set(item.size.clone()),
                price: Set(item.price),
                quantity: Set(item.quantity),
                total: Set(item.total),
                frame_image_url: Set(item.frame_image_url.clone()),
                user_image_url: Set(item.user_image_url.clone()),
            };
            stored_items.push(row.insert(&txn).await?);
        }

        txn.commit().await.map_err(|e| {
            error!(frame_order_id = %order_id, "failed to commit frame order: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(frame_order_id = %order_id, items = stored_items.len(), "frame order created");

        if let Err(e) = self
            .event_sender
            .send(Event::FrameOrderCreated(order_id))
            .await
        {
            warn!(frame_order_id = %order_id, "failed to send frame order event: {}", e);
        }

        Ok((header, stored_items))
    }

    /// Fetch a frame order with its items. With a requester, enforce ownership.
    #[instrument(skip(self), fields(frame_order_id = %order_id))]
    pub async fn get_frame_order(
        &self,
        order_id: Uuid,
        requester: Option<Uuid>,
    ) -> Result<(FrameOrderModel, Vec<FrameOrderItemModel>), ServiceError> {
        let order = FrameOrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Frame order {} not found", order_id)))?;

        if let Some(user_id) = requester {
            if order.user_id != user_id {
                return Err(ServiceError::Forbidden(
                    "order belongs to another user".to_string(),
                ));
            }
        }

        let items = self.items_for(order_id).await?;
        Ok((order, items))
    }

    /// List a user's frame orders, newest first, with items attached.
    ///
    /// `search` matches the order id or any line item title.
    #[instrument(skip(self, filter), fields(user_id = %user_id))]
    pub async fn list_frame_orders(
        &self,
        user_id: Uuid,
        filter: OrderListFilter,
    ) -> Result<Page<(FrameOrderModel, Vec<FrameOrderItemModel>)>, ServiceError> {
        let page = filter.page();
        let limit = filter.limit();

        let mut condition = Condition::all().add(frame_order::Column::UserId.eq(user_id));

        if let Some(category) = filter.status {
            condition =
                condition.add(frame_order::Column::Status.is_in(category.statuses().to_vec()));
        }

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let title_match = Query::select()
                .column(frame_order_item::Column::FrameOrderId)
                .from(FrameOrderItemEntity)
                .and_where(
                    Expr::expr(Func::lower(Expr::col(frame_order_item::Column::Title)))
                        .like(format!("%{}%", search.to_lowercase())),
                )
                .to_owned();
            let mut any = Condition::any().add(frame_order::Column::Id.in_subquery(title_match));
            if let Ok(id) = Uuid::parse_str(search) {
                any = any.add(frame_order::Column::Id.eq(id));
            }
            condition = condition.add(any);
        }

        let query = FrameOrderEntity::find().filter(condition);
        let query = match filter.sort {
            SortOrder::NewestFirst => query.order_by_desc(frame_order::Column::CreatedAt),
            SortOrder::OldestFirst => query.order_by_asc(frame_order::Column::CreatedAt),
        };
        let paginator = query.paginate(&*self.db, limit);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let mut grouped: HashMap<Uuid, Vec<FrameOrderItemModel>> = HashMap::new();
        if !ids.is_empty() {
            let items = FrameOrderItemEntity::find()
                .filter(frame_order_item::Column::FrameOrderId.is_in(ids))
                .all(&*self.db)
                .await?;
            for item in items {
                grouped.entry(item.frame_order_id).or_default().push(item);
            }
        }

        let records = orders
            .into_iter()
            .map(|o| {
                let items = grouped.remove(&o.id).unwrap_or_default();
                (o, items)
            })
            .collect();

        Ok(Page::new(records, total, page, limit))
    }

    async fn items_for(&self, order_id: Uuid) -> Result<Vec<FrameOrderItemModel>, ServiceError> {
        Ok(FrameOrderItemEntity::find()
            .filter(frame_order_item::Column::FrameOrderId.eq(order_id))
            .all(&*self.db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(price: Decimal, quantity: i32, total: Decimal) -> NewFrameItem {
        NewFrameItem {
            title: "Walnut 8x10".to_string(),
            shape: "rectangle".to_string(),
            color: "walnut".to_string(),
            size: "8x10".to_string(),
            price,
            quantity,
            total,
            frame_image_url: "https://cdn.example.com/frames/walnut.png".to_string(),
            user_image_url: "https://cdn.example.com/uploads/photo.png".to_string(),
        }
    }

    #[test]
    fn line_totals_must_be_price_times_quantity() {
        let items = vec![item(dec!(499), 1, dec!(499)), item(dec!(250), 2, dec!(500))];
        assert!(validate_totals(&items, dec!(100), dec!(1099)).is_ok());

        let items = vec![item(dec!(499), 2, dec!(499))];
        let err = validate_totals(&items, dec!(100), dec!(599)).unwrap_err();
        assert!(err.to_string().contains("items[0].total"));
    }

    #[test]
    fn grand_total_must_include_shipping() {
        let items = vec![item(dec!(499), 1, dec!(499))];
        assert!(validate_totals(&items, dec!(100), dec!(599)).is_ok());
        assert!(validate_totals(&items, dec!(100), dec!(499)).is_err());
    }

    #[test]
    fn empty_item_list_is_rejected() {
        let err = validate_totals(&[], dec!(0), dec!(0)).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[test]
    fn missing_item_fields_are_field_level_errors() {
        let mut bad = item(dec!(499), 1, dec!(499));
        bad.frame_image_url = String::new();
        let err = validate_totals(&[bad], dec!(0), dec!(499)).unwrap_err();
        assert!(err.to_string().contains("items[0]"));
    }
}

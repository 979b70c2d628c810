use crate::{
    entities::order::{
        self, ActiveModel as OrderActiveModel, DeliveryDetails, DeliveryStatus,
        Entity as OrderEntity, Model as OrderModel, PaymentMethod, ProductType,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

const MAX_PAGE_SIZE: u64 = 100;

/// Verified payment attribution stamped onto an order at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment_id: String,
    pub paid_at: DateTime<Utc>,
}

/// Coarse status filter exposed by the "my orders" screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    Completed,
    Processing,
}

impl StatusCategory {
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        match raw.to_ascii_lowercase().as_str() {
            "completed" => Ok(StatusCategory::Completed),
            "processing" => Ok(StatusCategory::Processing),
            other => Err(ServiceError::ValidationError(format!(
                "unknown status filter: {}",
                other
            ))),
        }
    }

    pub fn statuses(self) -> &'static [DeliveryStatus] {
        match self {
            StatusCategory::Completed => &[DeliveryStatus::Delivered],
            StatusCategory::Processing => &[
                DeliveryStatus::CodPending,
                DeliveryStatus::Pending,
                DeliveryStatus::Shipped,
                DeliveryStatus::OutForDelivery,
            ],
        }
    }
}

/// Sort order for lists; the storefront shows newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        match raw.to_ascii_lowercase().as_str() {
            "newest" | "desc" => Ok(SortOrder::NewestFirst),
            "oldest" | "asc" => Ok(SortOrder::OldestFirst),
            other => Err(ServiceError::ValidationError(format!(
                "unknown sort order: {}",
                other
            ))),
        }
    }
}

/// List filter shared by both order shapes.
#[derive(Debug, Clone, Default)]
pub struct OrderListFilter {
    pub status: Option<StatusCategory>,
    pub search: Option<String>,
    pub sort: SortOrder,
    pub page: u64,
    pub limit: u64,
}

impl OrderListFilter {
    pub(crate) fn page(&self) -> u64 {
        self.page.max(1)
    }

    pub(crate) fn limit(&self) -> u64 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }
}

/// One page of list results.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Map the records, keeping the pagination metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            records: self.records.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            total_pages: self.total_pages,
        }
    }

    pub fn new(records: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + limit - 1) / limit
        };
        Self {
            records,
            total,
            page,
            total_pages,
        }
    }
}

/// Input for creating a print order.
///
/// `id` is set only on reconciliation replay, where the order id is derived
/// from the checkout intent; creation is then idempotent.
#[derive(Debug, Clone)]
pub struct NewPrintOrder {
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    pub cart_item_id: Uuid,
    pub product_type: ProductType,
    pub title: String,
    pub image: Option<String>,
    pub delivery_details: DeliveryDetails,
    pub amount: Decimal,
    pub status: DeliveryStatus,
    pub payment_method: PaymentMethod,
    pub payment: Option<PaymentReceipt>,
}

/// Repository for print orders.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Persist a new print order and return the stored record.
    ///
    /// Two structurally identical submissions produce two distinct orders
    /// unless a deterministic id is supplied.
    #[instrument(skip(self, new), fields(user_id = %new.user_id, cart_item_id = %new.cart_item_id))]
    pub async fn create_order(&self, new: NewPrintOrder) -> Result<OrderModel, ServiceError> {
        new.delivery_details.validate()?;
        if new.title.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "title must not be empty".to_string(),
            ));
        }
        if new.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "amount must be greater than zero".to_string(),
            ));
        }

        let db = &*self.db;

        if let Some(id) = new.id {
            if let Some(existing) = OrderEntity::find_by_id(id).one(db).await? {
                info!(order_id = %id, "order already persisted; returning existing record");
                return Ok(existing);
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

        let active = OrderActiveModel {
            id: Set(order_id),
            user_id: Set(new.user_id),
            cart_item_id: Set(new.cart_item_id),
            product_type: Set(new.product_type),
            title: Set(new.title),
            delivery_details: Set(new.delivery_details),
            amount: Set(new.amount),
            image: Set(new.image),
            status: Set(new.status),
            payment_method: Set(new.payment_method),
            payment_id,
            payment_status,
            paid_at,
            created_at: Set(now),
            updated_at: Set(Some(now)),
            version: Set(1),
        };

        let inserted = match active.insert(db).await {
            Ok(model) => model,
            Err(e) if new.id.is_some() => {
                // A concurrent replay may have won the insert; converge on it.
                if let Some(existing) = OrderEntity::find_by_id(order_id).one(db).await? {
                    existing
                } else {
                    error!(order_id = %order_id, "failed to create order: {}", e);
                    return Err(ServiceError::DatabaseError(e));
                }
            }
            Err(e) => {
                error!(order_id = %order_id, "failed to create order: {}", e);
                return Err(ServiceError::DatabaseError(e));
            }
        };

        info!(order_id = %inserted.id, "print order created");

        if let Err(e) = self.event_sender.send(Event::OrderCreated(inserted.id)).await {
            warn!(order_id = %inserted.id, "failed to send order created event: {}", e);
        }

        Ok(inserted)
    }

    /// Fetch an order. With a requester, enforce ownership.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(
        &self,
        order_id: Uuid,
        requester: Option<Uuid>,
    ) -> Result<OrderModel, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if let Some(user_id) = requester {
            if order.user_id != user_id {
                return Err(ServiceError::Forbidden(
                    "order belongs to another user".to_string(),
                ));
            }
        }

        Ok(order)
    }

    /// List a user's orders, newest first.
    ///
    /// `search` matches the order id or the snapshot title, case-insensitive.
    #[instrument(skip(self, filter), fields(user_id = %user_id))]
    pub async fn list_orders(
        &self,
        user_id: Uuid,
        filter: OrderListFilter,
    ) -> Result<Page<OrderModel>, ServiceError> {
        let page = filter.page();
        let limit = filter.limit();

        let mut condition = Condition::all().add(order::Column::UserId.eq(user_id));

        if let Some(category) = filter.status {
            condition = condition.add(order::Column::Status.is_in(category.statuses().to_vec()));
        }

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let mut any = Condition::any().add(
                Expr::expr(Func::lower(Expr::col(order::Column::Title)))
                    .like(format!("%{}%", search.to_lowercase())),
            );
            if let Ok(id) = Uuid::parse_str(search) {
                any = any.add(order::Column::Id.eq(id));
            }
            condition = condition.add(any);
        }

        let query = OrderEntity::find().filter(condition);
        let query = match filter.sort {
            SortOrder::NewestFirst => query.order_by_desc(order::Column::CreatedAt),
            SortOrder::OldestFirst => query.order_by_asc(order::Column::CreatedAt),
        };
        let paginator = query.paginate(&*self.db, limit);

        let total = paginator.num_items().await?;
        let records = paginator.fetch_page(page - 1).await?;

        Ok(Page::new(records, total, page, limit))
    }
}

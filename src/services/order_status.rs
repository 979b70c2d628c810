use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::{
        frame_order,
        order::{self, DeliveryStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// One order, either shape, for status handling.
///
/// Print and frame orders are structurally different records sharing a
/// single delivery lifecycle; pattern matching here is the only place the
/// two shapes meet.
#[derive(Debug, Clone)]
pub enum StorefrontOrder {
    Print(order::Model),
    Frame(frame_order::Model),
}

impl StorefrontOrder {
    pub fn id(&self) -> Uuid {
        match self {
            StorefrontOrder::Print(m) => m.id,
            StorefrontOrder::Frame(m) => m.id,
        }
    }

    pub fn status(&self) -> DeliveryStatus {
        match self {
            StorefrontOrder::Print(m) => m.status,
            StorefrontOrder::Frame(m) => m.status,
        }
    }

    pub fn user_id(&self) -> Uuid {
        match self {
            StorefrontOrder::Print(m) => m.user_id,
            StorefrontOrder::Frame(m) => m.user_id,
        }
    }
}

/// Reject anything but the single forward step in the lifecycle.
///
/// There is no skip-ahead and no rollback; a delivered order is immutable.
pub fn ensure_transition(
    current: DeliveryStatus,
    requested: DeliveryStatus,
) -> Result<(), ServiceError> {
    if current.is_terminal() {
        return Err(ServiceError::InvalidOperation(
            "order is delivered and can no longer change status".to_string(),
        ));
    }
    match current.next() {
        Some(next) if next == requested => Ok(()),
        _ => Err(ServiceError::InvalidStatus(format!(
            "cannot transition from '{}' to '{}'",
            current, requested
        ))),
    }
}

#[derive(Clone)]
pub struct OrderStatusService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl OrderStatusService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Set an explicitly requested status, validating the transition.
    ///
    /// Since only the single successor is ever legal, a valid request is
    /// exactly one `advance` step.
    #[instrument(skip(self, order), fields(order_id = %order.id(), requested = %requested))]
    pub async fn update_status(
        &self,
        order: StorefrontOrder,
        requested: DeliveryStatus,
    ) -> Result<StorefrontOrder, ServiceError> {
        ensure_transition(order.status(), requested)?;
        self.advance(order).await
    }

    /// Advance one step along the lifecycle.
    #[instrument(skip(self, order), fields(order_id = %order.id()))]
    pub async fn advance(&self, order: StorefrontOrder) -> Result<StorefrontOrder, ServiceError> {
        let next = order.status().next().ok_or_else(|| {
            ServiceError::InvalidOperation(
                "order is delivered and can no longer change status".to_string(),
            )
        })?;
        self.write_status(order, next).await
    }

    /// Compare-and-swap write on the version column. Losing a race surfaces
    /// `ConcurrentModification` rather than silently overwriting.
    async fn write_status(
        &self,
        order: StorefrontOrder,
        new_status: DeliveryStatus,
    ) -> Result<StorefrontOrder, ServiceError> {
        let db = &*self.db;
        let now = Utc::now();
        let old_status = order.status();
        let order_id = order.id();

        let updated = match order {
            StorefrontOrder::Print(model) => {
                let expected_version = model.version;
                let update = order::ActiveModel {
                    status: Set(new_status),
                    updated_at: Set(Some(now)),
                    version: Set(expected_version + 1),
                    ..Default::default()
                };
                let result = order::Entity::update_many()
                    .set(update)
                    .filter(order::Column::Id.eq(order_id))
                    .filter(order::Column::Version.eq(expected_version))
                    .exec(db)
                    .await?;
                if result.rows_affected == 0 {
                    warn!(%order_id, "status update lost a concurrent write race");
                    return Err(ServiceError::ConcurrentModification(order_id));
                }
                StorefrontOrder::Print(order::Model {
                    status: new_status,
                    updated_at: Some(now),
                    version: expected_version + 1,
                    ..model
                })
            }
            StorefrontOrder::Frame(model) => {
                let expected_version = model.version;
                let update = frame_order::ActiveModel {
                    status: Set(new_status),
                    updated_at: Set(Some(now)),
                    version: Set(expected_version + 1),
                    ..Default::default()
                };
                let result = frame_order::Entity::update_many()
                    .set(update)
                    .filter(frame_order::Column::Id.eq(order_id))
                    .filter(frame_order::Column::Version.eq(expected_version))
                    .exec(db)
                    .await?;
                if result.rows_affected == 0 {
                    warn!(%order_id, "status update lost a concurrent write race");
                    return Err(ServiceError::ConcurrentModification(order_id));
                }
                StorefrontOrder::Frame(frame_order::Model {
                    status: new_status,
                    updated_at: Some(now),
                    version: expected_version + 1,
                    ..model
                })
            }
        };

        info!(
            %order_id,
            old_status = %old_status,
            new_status = %new_status,
            "order status updated"
        );

        if let Err(e) = self
            .event_sender
            .send(Event::OrderStatusChanged {
                order_id,
                old_status: old_status.to_string(),
                new_status: new_status.to_string(),
            })
            .await
        {
            warn!(%order_id, "failed to send status change event: {}", e);
        }

        Ok(updated)
    }
}

//! Checkout orchestrator.
//!
//! COD checkouts persist immediately. Online checkouts are two-phase: begin
//! creates a gateway intent and parks the full order payload in a durable
//! pending-intent row; complete runs only from the payment-success callback,
//! verifies the signature, and persists exactly as the COD path does. The
//! intent row id doubles as the checkout token and as the order id the
//! intent eventually produces, which makes completion and reconciliation
//! replays idempotent.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        cart_item::Entity as CartItemEntity,
        checkout_intent::{self, CheckoutKind, Entity as CheckoutIntentEntity, IntentStatus},
        frame_order,
        frame_order_item,
        order::{self, DeliveryDetails, DeliveryStatus, PaymentMethod, ProductType},
    },
    errors::ServiceError,
    events::{outbox, Event, EventSender},
    services::{
        assets::AssetMaterializer,
        frame_orders::{self, FrameOrderService, NewFrameItem, NewFrameOrder},
        gateway::{PaymentGatewayClient, PaymentIntent},
        orders::{NewPrintOrder, OrderService, PaymentReceipt},
    },
};

/// Checkout submission for a single priced cart line.
#[derive(Debug, Clone)]
pub struct PrintCheckoutRequest {
    pub cart_item_id: Uuid,
    pub product_type: ProductType,
    /// Client-stated grand total; must match the server-side recomputation
    pub amount: Decimal,
    pub delivery_details: DeliveryDetails,
}

/// Checkout submission for a batch of configured frames.
#[derive(Debug, Clone)]
pub struct FrameCheckoutRequest {
    pub items: Vec<NewFrameItem>,
    pub shipping_details: DeliveryDetails,
    pub shipping_charge: Decimal,
    pub grand_total: Decimal,
}

/// Gateway confirmation delivered by the payment-success callback.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub gateway_order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// A persisted order of either shape.
#[derive(Debug, Clone)]
pub enum CompletedOrder {
    Print(order::Model),
    Frame {
        order: frame_order::Model,
        items: Vec<frame_order_item::Model>,
    },
}

/// What a begin/cancel call produced.
#[derive(Debug)]
pub enum CheckoutOutcome {
    /// COD path: the order exists
    OrderCreated(CompletedOrder),
    /// Online path: the caller must open the gateway UI and come back
    PaymentRequired {
        checkout_token: Uuid,
        intent: PaymentIntent,
    },
    /// The customer dismissed the gateway UI; nothing was persisted
    Cancelled { checkout_token: Uuid },
}

/// Verified payment plus the payload needed to persist its order.
/// Serialized into the reconciliation outbox when persistence fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaidCheckout {
    pub intent_id: Uuid,
    pub user_id: Uuid,
    pub kind: CheckoutKind,
    pub gateway_order_id: String,
    pub payment_id: String,
    pub paid_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct PrintPayload {
    cart_item_id: Uuid,
    product_type: ProductType,
    title: String,
    image: Option<String>,
    delivery_details: DeliveryDetails,
    amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
struct FramePayload {
    items: Vec<NewFrameItem>,
    shipping_details: DeliveryDetails,
    shipping_charge: Decimal,
    grand_total: Decimal,
}

#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    gateway: Arc<PaymentGatewayClient>,
    orders: Arc<OrderService>,
    frame_orders: Arc<FrameOrderService>,
    materializer: Arc<AssetMaterializer>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        gateway: Arc<PaymentGatewayClient>,
        orders: Arc<OrderService>,
        frame_orders: Arc<FrameOrderService>,
        materializer: Arc<AssetMaterializer>,
    ) -> Self {
        Self {
            db,
            event_sender,
            gateway,
            orders,
            frame_orders,
            materializer,
        }
    }

    /// Start checkout for a print order.
    #[instrument(skip(self, request), fields(user_id = %user_id, cart_item_id = %request.cart_item_id))]
    pub async fn begin_print_checkout(
        &self,
        user_id: Uuid,
        request: PrintCheckoutRequest,
        payment_method: PaymentMethod,
    ) -> Result<CheckoutOutcome, ServiceError> {
        request.delivery_details.validate()?;

        let cart = CartItemEntity::find_by_id(request.cart_item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Cart item {} not found", request.cart_item_id))
            })?;

        if cart.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "cart item belongs to another user".to_string(),
            ));
        }
        if cart.product_type != request.product_type {
            return Err(ServiceError::ValidationError(
                "product_type does not match the cart snapshot".to_string(),
            ));
        }

        // Never trust a client-computed total: reprice from the snapshot.
        let items_total = cart.unit_price * Decimal::from(cart.quantity);
        if request.delivery_details.items_total != items_total {
            return Err(ServiceError::ValidationError(
                "items_total does not match the priced cart snapshot".to_string(),
            ));
        }
        let grand_total = items_total + request.delivery_details.shipping_charge;
        if request.amount != grand_total {
            return Err(ServiceError::ValidationError(
                "amount does not match the priced cart snapshot".to_string(),
            ));
        }

        match payment_method {
            PaymentMethod::Cod => {
                let model = self
                    .orders
                    .create_order(NewPrintOrder {
                        id: None,
                        user_id,
                        cart_item_id: cart.id,
                        product_type: cart.product_type,
                        title: cart.title,
                        image: cart.image,
                        delivery_details: request.delivery_details,
                        amount: grand_total,
                        status: DeliveryStatus::Pending,
                        payment_method: PaymentMethod::Cod,
                        payment: None,
                    })
                    .await?;
                Ok(CheckoutOutcome::OrderCreated(CompletedOrder::Print(model)))
            }
            PaymentMethod::Online => {
                let intent = self
                    .gateway
                    .create_intent(grand_total, &cart.id.to_string())
                    .await?;
                let payload = serde_json::to_value(PrintPayload {
                    cart_item_id: cart.id,
                    product_type: cart.product_type,
                    title: cart.title,
                    image: cart.image,
                    delivery_details: request.delivery_details,
                    amount: grand_total,
                })?;
                let token = self
                    .store_intent(user_id, CheckoutKind::Print, &intent, payload)
                    .await?;
                Ok(CheckoutOutcome::PaymentRequired {
                    checkout_token: token,
                    intent,
                })
            }
        }
    }

    /// Start checkout for a batch of configured frames.
    #[instrument(skip(self, request), fields(user_id = %user_id, items = request.items.len()))]
    pub async fn begin_frame_checkout(
        &self,
        user_id: Uuid,
        request: FrameCheckoutRequest,
        payment_method: PaymentMethod,
    ) -> Result<CheckoutOutcome, ServiceError> {
        request.shipping_details.validate()?;
        frame_orders::validate_totals(&request.items, request.shipping_charge, request.grand_total)?;

        match payment_method {
            PaymentMethod::Cod => {
                let items = self.materializer.materialize(request.items).await?;
                let (order, items) = self
                    .frame_orders
                    .create_frame_order(NewFrameOrder {
                        id: None,
                        user_id,
                        items,
                        shipping_details: request.shipping_details,
                        shipping_charge: request.shipping_charge,
                        grand_total: request.grand_total,
                        status: DeliveryStatus::CodPending,
                        payment_method: PaymentMethod::Cod,
                        payment: None,
                    })
                    .await?;
                Ok(CheckoutOutcome::OrderCreated(CompletedOrder::Frame {
                    order,
                    items,
                }))
            }
            PaymentMethod::Online => {
                let receipt_seed = Uuid::new_v4().to_string();
                let intent = self
                    .gateway
                    .create_intent(request.grand_total, &receipt_seed)
                    .await?;
                // Ephemeral image references ride along in the payload and are
                // materialized only once the payment is verified.
                let payload = serde_json::to_value(FramePayload {
                    items: request.items,
                    shipping_details: request.shipping_details,
                    shipping_charge: request.shipping_charge,
                    grand_total: request.grand_total,
                })?;
                let token = self
                    .store_intent(user_id, CheckoutKind::Frame, &intent, payload)
                    .await?;
                Ok(CheckoutOutcome::PaymentRequired {
                    checkout_token: token,
                    intent,
                })
            }
        }
    }

    /// Complete an online checkout from the payment-success callback.
    ///
    /// The only path that creates an order from an online attempt. Invalid
    /// signatures fail with `VerificationFailed` and persist nothing. A
    /// persistence failure after verification parks the paid payload in the
    /// reconciliation outbox before surfacing `PersistenceError`.
    #[instrument(skip(self, confirmation), fields(gateway_order_id = %confirmation.gateway_order_id))]
    pub async fn complete_checkout(
        &self,
        confirmation: PaymentConfirmation,
    ) -> Result<CompletedOrder, ServiceError> {
        let intent = CheckoutIntentEntity::find()
            .filter(
                checkout_intent::Column::GatewayOrderId.eq(confirmation.gateway_order_id.clone()),
            )
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "No checkout found for gateway order {}",
                    confirmation.gateway_order_id
                ))
            })?;

        match intent.status {
            IntentStatus::Completed => {
                // Double callback: converge on the already-persisted order.
                return self.load_completed(&intent).await;
            }
            IntentStatus::Cancelled => {
                return Err(ServiceError::InvalidOperation(
                    "checkout was cancelled".to_string(),
                ));
            }
            IntentStatus::Pending | IntentStatus::Failed => {}
        }

        let valid = self.gateway.verify_signature(
            &confirmation.gateway_order_id,
            &confirmation.payment_id,
            &confirmation.signature,
        )?;

        if !valid {
            warn!(intent_id = %intent.id, "payment signature verification failed");
            self.set_intent_status(&intent, IntentStatus::Failed).await?;
            if let Err(e) = self
                .event_sender
                .send(Event::PaymentVerificationFailed {
                    gateway_order_id: confirmation.gateway_order_id.clone(),
                })
                .await
            {
                warn!("failed to send event: {}", e);
            }
            return Err(ServiceError::VerificationFailed(
                "signature mismatch".to_string(),
            ));
        }

        if let Err(e) = self
            .event_sender
            .send(Event::PaymentVerified {
                gateway_order_id: confirmation.gateway_order_id.clone(),
            })
            .await
        {
            warn!("failed to send event: {}", e);
        }

        let paid = PaidCheckout {
            intent_id: intent.id,
            user_id: intent.user_id,
            kind: intent.kind,
            gateway_order_id: confirmation.gateway_order_id.clone(),
            payment_id: confirmation.payment_id.clone(),
            paid_at: Utc::now(),
            payload: intent.payload.clone(),
        };

        match self.replay_paid(&paid).await {
            Ok(completed) => Ok(completed),
            Err(e) => {
                // The gateway has already captured funds; park the payload
                // for idempotent replay instead of dropping it on the floor.
                warn!(
                    intent_id = %intent.id,
                    "post-payment persistence failed, queueing reconciliation: {}", e
                );
                outbox::enqueue(
                    &*self.db,
                    &paid.gateway_order_id,
                    &serde_json::to_value(&paid)?,
                )
                .await?;
                if let Err(send_err) = self
                    .event_sender
                    .send(Event::ReconciliationQueued {
                        gateway_order_id: paid.gateway_order_id.clone(),
                    })
                    .await
                {
                    warn!("failed to send event: {}", send_err);
                }
                Err(ServiceError::PersistenceError(e.to_string()))
            }
        }
    }

    /// Persist the order for a verified payment. Idempotent: the order id is
    /// the intent id, so replays converge on the first successful write.
    /// Called from `complete_checkout` and from the reconciliation worker.
    pub async fn replay_paid(&self, paid: &PaidCheckout) -> Result<CompletedOrder, ServiceError> {
        let receipt = PaymentReceipt {
            payment_id: paid.payment_id.clone(),
            paid_at: paid.paid_at,
        };

        let completed = match paid.kind {
            CheckoutKind::Print => {
                let payload: PrintPayload = serde_json::from_value(paid.payload.clone())?;
                let model = self
                    .orders
                    .create_order(NewPrintOrder {
                        id: Some(paid.intent_id),
                        user_id: paid.user_id,
                        cart_item_id: payload.cart_item_id,
                        product_type: payload.product_type,
                        title: payload.title,
                        image: payload.image,
                        delivery_details: payload.delivery_details,
                        amount: payload.amount,
                        status: DeliveryStatus::Pending,
                        payment_method: PaymentMethod::Online,
                        payment: Some(receipt),
                    })
                    .await?;
                CompletedOrder::Print(model)
            }
            CheckoutKind::Frame => {
                let payload: FramePayload = serde_json::from_value(paid.payload.clone())?;
                let items = self.materializer.materialize(payload.items).await?;
                let (order, items) = self
                    .frame_orders
                    .create_frame_order(NewFrameOrder {
                        id: Some(paid.intent_id),
                        user_id: paid.user_id,
                        items,
                        shipping_details: payload.shipping_details,
                        shipping_charge: payload.shipping_charge,
                        grand_total: payload.grand_total,
                        status: DeliveryStatus::Pending,
                        payment_method: PaymentMethod::Online,
                        payment: Some(receipt),
                    })
                    .await?;
                CompletedOrder::Frame { order, items }
            }
        };

        self.mark_intent_completed(paid.intent_id).await?;
        Ok(completed)
    }

    /// Cancel a pending online checkout (the customer dismissed the gateway
    /// UI). Not an error: the caller receives a distinct cancelled outcome,
    /// and no order row exists for the attempt.
    #[instrument(skip(self), fields(checkout_token = %checkout_token))]
    pub async fn cancel_checkout(
        &self,
        checkout_token: Uuid,
        user_id: Uuid,
    ) -> Result<CheckoutOutcome, ServiceError> {
        let intent = CheckoutIntentEntity::find_by_id(checkout_token)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Checkout {} not found", checkout_token))
            })?;

        if intent.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "checkout belongs to another user".to_string(),
            ));
        }

        match intent.status {
            IntentStatus::Completed => Err(ServiceError::InvalidOperation(
                "checkout already completed".to_string(),
            )),
            IntentStatus::Cancelled => Ok(CheckoutOutcome::Cancelled { checkout_token }),
            IntentStatus::Pending | IntentStatus::Failed => {
                self.set_intent_status(&intent, IntentStatus::Cancelled)
                    .await?;
                info!(intent_id = %checkout_token, "checkout cancelled by customer");
                if let Err(e) = self
                    .event_sender
                    .send(Event::CheckoutCancelled(checkout_token))
                    .await
                {
                    warn!("failed to send event: {}", e);
                }
                Ok(CheckoutOutcome::Cancelled { checkout_token })
            }
        }
    }

    async fn store_intent(
        &self,
        user_id: Uuid,
        kind: CheckoutKind,
        intent: &PaymentIntent,
        payload: serde_json::Value,
    ) -> Result<Uuid, ServiceError> {
        let token = Uuid::new_v4();
        let row = checkout_intent::ActiveModel {
            id: Set(token),
            user_id: Set(user_id),
            gateway_order_id: Set(intent.gateway_order_id.clone()),
            kind: Set(kind),
            payload: Set(payload),
            amount_minor: Set(intent.amount_minor),
            currency: Set(intent.currency.clone()),
            receipt: Set(intent.receipt.clone()),
            status: Set(IntentStatus::Pending),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        row.insert(&*self.db).await?;

        if let Err(e) = self
            .event_sender
            .send(Event::CheckoutStarted {
                intent_id: token,
                gateway_order_id: intent.gateway_order_id.clone(),
            })
            .await
        {
            warn!("failed to send event: {}", e);
        }

        Ok(token)
    }

    async fn set_intent_status(
        &self,
        intent: &checkout_intent::Model,
        status: IntentStatus,
    ) -> Result<(), ServiceError> {
        let mut active: checkout_intent::ActiveModel = intent.clone().into();
        active.status = Set(status);
        active.updated_at = Set(Some(Utc::now()));
        active.update(&*self.db).await?;
        Ok(())
    }

    async fn mark_intent_completed(&self, intent_id: Uuid) -> Result<(), ServiceError> {
        if let Some(intent) = CheckoutIntentEntity::find_by_id(intent_id)
            .one(&*self.db)
            .await?
        {
            if intent.status != IntentStatus::Completed {
                self.set_intent_status(&intent, IntentStatus::Completed)
                    .await?;
            }
        }
        Ok(())
    }

    async fn load_completed(
        &self,
        intent: &checkout_intent::Model,
    ) -> Result<CompletedOrder, ServiceError> {
        match intent.kind {
            CheckoutKind::Print => {
                let model = self.orders.get_order(intent.id, None).await?;
                Ok(CompletedOrder::Print(model))
            }
            CheckoutKind::Frame => {
                let (order, items) = self.frame_orders.get_frame_order(intent.id, None).await?;
                Ok(CompletedOrder::Frame { order, items })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn paid_checkout_survives_the_outbox_round_trip() {
        let paid = PaidCheckout {
            intent_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            kind: CheckoutKind::Frame,
            gateway_order_id: "order_G123".to_string(),
            payment_id: "pay_G456".to_string(),
            paid_at: Utc::now(),
            payload: serde_json::json!({"grand_total": "599"}),
        };

        let value = serde_json::to_value(&paid).unwrap();
        let back: PaidCheckout = serde_json::from_value(value).unwrap();
        assert_eq!(back.intent_id, paid.intent_id);
        assert_eq!(back.kind, CheckoutKind::Frame);
        assert_eq!(back.gateway_order_id, paid.gateway_order_id);
    }

    #[test]
    fn print_payload_round_trips_money_exactly() {
        let payload = PrintPayload {
            cart_item_id: Uuid::new_v4(),
            product_type: ProductType::Acrylic,
            title: "Acrylic 12x18".to_string(),
            image: None,
            delivery_details: DeliveryDetails {
                name: "Asha Verma".to_string(),
                email: "asha@example.com".to_string(),
                phone: "9876543210".to_string(),
                address: "12 MG Road".to_string(),
                state: "Karnataka".to_string(),
                district: "Bengaluru Urban".to_string(),
                city: "Bengaluru".to_string(),
                pincode: "560001".to_string(),
                shipping_charge: dec!(100),
                items_total: dec!(499),
            },
            amount: dec!(599),
        };

        let value = serde_json::to_value(&payload).unwrap();
        let back: PrintPayload = serde_json::from_value(value).unwrap();
        assert_eq!(back.amount, dec!(599));
        assert_eq!(back.delivery_details.items_total, dec!(499));
    }
}

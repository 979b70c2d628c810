pub mod common;
pub mod frame_orders;
pub mod health;
pub mod orders;
pub mod payments;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::ServiceError;
use crate::events::EventSender;
use crate::services::{
    assets::{self, AssetMaterializer},
    checkout::CheckoutService,
    frame_orders::FrameOrderService,
    gateway::PaymentGatewayClient,
    order_status::OrderStatusService,
    orders::OrderService,
};
use std::sync::Arc;
use std::time::Duration;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub frame_orders: Arc<FrameOrderService>,
    pub order_status: Arc<OrderStatusService>,
    pub checkout: Arc<CheckoutService>,
    pub gateway: Arc<PaymentGatewayClient>,
}

impl AppServices {
    /// Build the service container from configuration.
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
    ) -> Result<Self, ServiceError> {
        let gateway = Arc::new(PaymentGatewayClient::new(config.gateway.clone())?);

        let store = assets::store_from_config(&config.storage)?;
        let materializer = Arc::new(AssetMaterializer::new(
            store,
            Duration::from_secs(config.storage.timeout_secs),
        )?);

        let orders = Arc::new(OrderService::new(db.clone(), event_sender.clone()));
        let frame_orders = Arc::new(FrameOrderService::new(db.clone(), event_sender.clone()));
        let order_status = Arc::new(OrderStatusService::new(db.clone(), event_sender.clone()));
        let checkout = Arc::new(CheckoutService::new(
            db,
            event_sender,
            gateway.clone(),
            orders.clone(),
            frame_orders.clone(),
            materializer,
        ));

        Ok(Self {
            orders,
            frame_orders,
            order_status,
            checkout,
            gateway,
        })
    }
}

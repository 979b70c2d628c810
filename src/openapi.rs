use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "FramePress API",
        version = "0.3.0",
        description = r#"
# FramePress Storefront API

Backend for the FramePress storefront: checkout for custom photo prints and
custom photo frames, online payment verification and reconciliation, and the
order delivery lifecycle.

## Authentication

All order and payment endpoints require a storefront JWT:

```
Authorization: Bearer <token>
```

## Checkout model

- Cash-on-delivery checkouts persist the order immediately.
- Online checkouts are two-phase: `POST /payments/create` (or an online
  `POST /frameorders/create`) returns a gateway intent and a checkout
  token; `POST /payments/verify` completes the purchase after the gateway
  confirms payment. Dismissing the gateway UI maps to
  `POST /payments/cancel` and leaves nothing behind.

## Pagination

List endpoints accept `page`, `limit`, `search` and a coarse `status`
filter (`Completed` or `Processing`). Results are newest first.
        "#,
        contact(
            name = "FramePress Engineering",
            email = "engineering@framepress.dev"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Print order checkout and lifecycle"),
        (name = "Frame Orders", description = "Custom frame order checkout and lifecycle"),
        (name = "Payments", description = "Online payment intents, verification and cancellation"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order,
        crate::handlers::frame_orders::create_frame_order,
        crate::handlers::frame_orders::list_frame_orders,
        crate::handlers::frame_orders::get_frame_order,
        crate::handlers::frame_orders::update_frame_order_status,
        crate::handlers::payments::create_payment,
        crate::handlers::payments::verify_payment,
        crate::handlers::payments::cancel_payment,
        crate::handlers::health::liveness,
        crate::handlers::health::readiness,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::entities::order::DeliveryDetails,
        crate::entities::order::DeliveryStatus,
        crate::entities::order::PaymentMethod,
        crate::entities::order::ProductType,
        crate::services::frame_orders::NewFrameItem,
        crate::services::gateway::PaymentIntent,
        crate::handlers::orders::PrintOrderResponse,
        crate::handlers::orders::UpdateOrderStatusRequest,
        crate::handlers::frame_orders::CreateFrameOrderRequest,
        crate::handlers::frame_orders::FrameOrderResponse,
        crate::handlers::frame_orders::FrameOrderItemResponse,
        crate::handlers::payments::CreatePaymentRequest,
        crate::handlers::payments::CheckoutStartedResponse,
        crate::handlers::payments::VerifyPaymentRequest,
        crate::handlers::payments::VerifyPaymentResponse,
        crate::handlers::payments::CancelCheckoutRequest,
        crate::handlers::payments::CancelCheckoutResponse,
        crate::handlers::health::HealthStatus,
    ))
)]
pub struct ApiDoc;

/// Swagger UI served at `/docs`, spec at `/api-docs/openapi.json`.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

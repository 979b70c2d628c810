use axum::{extract::State, response::Response, routing::post, Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::common::{map_service_error, success_response, validate_input};
use crate::handlers::frame_orders::FrameOrderResponse;
use crate::handlers::orders::PrintOrderResponse;
use crate::{
    auth::AuthUser,
    entities::order::{DeliveryDetails, PaymentMethod, ProductType},
    errors::ApiError,
    services::checkout::{
        CheckoutOutcome, CompletedOrder, PaymentConfirmation, PrintCheckoutRequest,
    },
    services::gateway::PaymentIntent,
    ApiResponse, AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_payment))
        .route("/verify", post(verify_payment))
        .route("/cancel", post(cancel_payment))
}

#[derive(Debug, Deserialize, validator::Validate, ToSchema)]
pub struct CreatePaymentRequest {
    pub amount: Decimal,
    pub cart_item_id: Uuid,
    pub product_type: ProductType,
    #[validate]
    pub delivery_details: DeliveryDetails,
}

/// Gateway intent handed back to the storefront so it can open the payment UI.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutStartedResponse {
    /// Token for `POST /payments/verify` and `POST /payments/cancel`
    pub checkout_token: Uuid,
    pub gateway_order_id: String,
    /// Amount in minor currency units
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
}

impl CheckoutStartedResponse {
    pub fn new(checkout_token: Uuid, intent: PaymentIntent) -> Self {
        Self {
            checkout_token,
            gateway_order_id: intent.gateway_order_id,
            amount: intent.amount_minor,
            currency: intent.currency,
            receipt: intent.receipt,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    pub gateway_order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// Either order shape, depending on what the checkout was for.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum OrderResponseBody {
    Print(PrintOrderResponse),
    Frame(FrameOrderResponse),
}

impl From<CompletedOrder> for OrderResponseBody {
    fn from(completed: CompletedOrder) -> Self {
        match completed {
            CompletedOrder::Print(model) => OrderResponseBody::Print(model.into()),
            CompletedOrder::Frame { order, items } => {
                OrderResponseBody::Frame(FrameOrderResponse::from_parts(order, items))
            }
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub order: OrderResponseBody,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelCheckoutRequest {
    pub checkout_token: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelCheckoutResponse {
    pub cancelled: bool,
    pub checkout_token: Uuid,
}

/// Begin an online print checkout: create a gateway intent and park the
/// order payload server-side. No order exists until the payment succeeds.
#[utoipa::path(
    post,
    path = "/api/v1/payments/create",
    request_body = CreatePaymentRequest,
    responses(
        (status = 200, description = "Gateway intent created", body = CheckoutStartedResponse),
        (status = 400, description = "Invalid amount or delivery details", body = crate::errors::ErrorResponse),
        (status = 502, description = "Gateway unreachable", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn create_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreatePaymentRequest>,
) -> Result<Response, ApiError> {
    validate_input(&body)?;

    let request = PrintCheckoutRequest {
        cart_item_id: body.cart_item_id,
        product_type: body.product_type,
        amount: body.amount,
        delivery_details: body.delivery_details,
    };

    let outcome = state
        .services
        .checkout
        .begin_print_checkout(user.user_id, request, PaymentMethod::Online)
        .await
        .map_err(map_service_error)?;

    match outcome {
        CheckoutOutcome::PaymentRequired {
            checkout_token,
            intent,
        } => Ok(success_response(ApiResponse::success(
            CheckoutStartedResponse::new(checkout_token, intent),
        ))),
        _ => Err(ApiError::ServiceError(
            crate::errors::ServiceError::InternalError(
                "online checkout produced an unexpected outcome".to_string(),
            ),
        )),
    }
}

/// Complete an online checkout from the gateway's payment-success callback.
///
/// Verifies the confirmation signature; on success the parked payload is
/// persisted as an order. A tampered signature yields 400 and persists
/// nothing.
#[utoipa::path(
    post,
    path = "/api/v1/payments/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment verified, order created", body = VerifyPaymentResponse),
        (status = 400, description = "Signature mismatch", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(body): Json<VerifyPaymentRequest>,
) -> Result<Response, ApiError> {
    let completed = state
        .services
        .checkout
        .complete_checkout(PaymentConfirmation {
            gateway_order_id: body.gateway_order_id,
            payment_id: body.payment_id,
            signature: body.signature,
        })
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(
        VerifyPaymentResponse {
            success: true,
            order: completed.into(),
        },
    )))
}

/// Abandon a pending online checkout (customer dismissed the gateway UI).
///
/// A distinct non-error outcome: nothing was persisted, and a later
/// legitimate checkout attempt proceeds independently.
#[utoipa::path(
    post,
    path = "/api/v1/payments/cancel",
    request_body = CancelCheckoutRequest,
    responses(
        (status = 200, description = "Checkout cancelled", body = CancelCheckoutResponse),
        (status = 404, description = "Unknown checkout token", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn cancel_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CancelCheckoutRequest>,
) -> Result<Response, ApiError> {
    let outcome = state
        .services
        .checkout
        .cancel_checkout(body.checkout_token, user.user_id)
        .await
        .map_err(map_service_error)?;

    match outcome {
        CheckoutOutcome::Cancelled { checkout_token } => Ok(success_response(
            ApiResponse::success(CancelCheckoutResponse {
                cancelled: true,
                checkout_token,
            }),
        )),
        _ => Err(ApiError::ServiceError(
            crate::errors::ServiceError::InternalError(
                "cancel produced an unexpected outcome".to_string(),
            ),
        )),
    }
}

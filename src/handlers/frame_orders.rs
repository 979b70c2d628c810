use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::common::{created_response, map_service_error, success_response, validate_input};
use crate::handlers::orders::{list_filter, UpdateOrderStatusRequest};
use crate::handlers::payments::CheckoutStartedResponse;
use crate::{
    auth::AuthUser,
    entities::{
        frame_order, frame_order_item,
        order::{DeliveryDetails, DeliveryStatus, PaymentMethod},
    },
    errors::ApiError,
    services::checkout::{CheckoutOutcome, CompletedOrder, FrameCheckoutRequest},
    services::frame_orders::NewFrameItem,
    services::order_status::StorefrontOrder,
    ApiResponse, AppState, ListQuery,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_frame_order))
        .route("/", get(list_frame_orders))
        .route("/:id", get(get_frame_order))
        .route("/:id/status", patch(update_frame_order_status))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateFrameOrderRequest {
    #[validate(length(min = 1, message = "at least one frame item is required"))]
    pub items: Vec<NewFrameItem>,
    #[validate]
    pub shipping_details: DeliveryDetails,
    pub shipping_charge: Decimal,
    pub grand_total: Decimal,
    /// Defaults to cash on delivery
    #[serde(default = "default_payment_method")]
    pub payment_method: PaymentMethod,
}

fn default_payment_method() -> PaymentMethod {
    PaymentMethod::Cod
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FrameOrderItemResponse {
    pub id: Uuid,
    pub title: String,
    pub shape: String,
    pub color: String,
    pub size: String,
    pub price: Decimal,
    pub quantity: i32,
    pub total: Decimal,
    pub frame_image_url: String,
    pub user_image_url: String,
}

impl From<frame_order_item::Model> for FrameOrderItemResponse {
    fn from(model: frame_order_item::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            shape: model.shape,
            color: model.color,
            size: model.size,
            price: model.price,
            quantity: model.quantity,
            total: model.total,
            frame_image_url: model.frame_image_url,
            user_image_url: model.user_image_url,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FrameOrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<FrameOrderItemResponse>,
    pub shipping_details: DeliveryDetails,
    pub shipping_charge: Decimal,
    pub grand_total: Decimal,
    pub status: DeliveryStatus,
    pub payment_method: PaymentMethod,
    pub payment_id: Option<String>,
    pub payment_status: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl FrameOrderResponse {
    pub fn from_parts(order: frame_order::Model, items: Vec<frame_order_item::Model>) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            items: items.into_iter().map(FrameOrderItemResponse::from).collect(),
            shipping_details: order.shipping_details,
            shipping_charge: order.shipping_charge,
            grand_total: order.grand_total,
            status: order.status,
            payment_method: order.payment_method,
            payment_id: order.payment_id,
            payment_status: order.payment_status,
            paid_at: order.paid_at,
            created_at: order.created_at,
        }
    }
}

/// Create a frame order, or start an online frame checkout.
///
/// COD submissions materialize assets and persist immediately with status
/// `COD Pending`. Online submissions return a gateway intent; the order is
/// created only by `POST /payments/verify`.
#[utoipa::path(
    post,
    path = "/api/v1/frameorders/create",
    request_body = CreateFrameOrderRequest,
    responses(
        (status = 201, description = "COD order created", body = FrameOrderResponse),
        (status = 200, description = "Online checkout started", body = CheckoutStartedResponse),
        (status = 400, description = "Missing or inconsistent item fields", body = crate::errors::ErrorResponse)
    ),
    tag = "Frame Orders"
)]
pub async fn create_frame_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreateFrameOrderRequest>,
) -> Result<Response, ApiError> {
    validate_input(&body)?;

    let request = FrameCheckoutRequest {
        items: body.items,
        shipping_details: body.shipping_details,
        shipping_charge: body.shipping_charge,
        grand_total: body.grand_total,
    };

    let outcome = state
        .services
        .checkout
        .begin_frame_checkout(user.user_id, request, body.payment_method)
        .await
        .map_err(map_service_error)?;

    match outcome {
        CheckoutOutcome::OrderCreated(CompletedOrder::Frame { order, items }) => Ok(
            created_response(ApiResponse::success(FrameOrderResponse::from_parts(
                order, items,
            ))),
        ),
        CheckoutOutcome::PaymentRequired {
            checkout_token,
            intent,
        } => Ok(success_response(ApiResponse::success(
            CheckoutStartedResponse::new(checkout_token, intent),
        ))),
        _ => Err(ApiError::ServiceError(
            crate::errors::ServiceError::InternalError(
                "frame checkout produced an unexpected outcome".to_string(),
            ),
        )),
    }
}

/// List the authenticated user's frame orders with their items.
#[utoipa::path(
    get,
    path = "/api/v1/frameorders",
    params(ListQuery),
    responses((status = 200, description = "Frame orders page")),
    tag = "Frame Orders"
)]
pub async fn list_frame_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let filter = list_filter(&query).map_err(map_service_error)?;

    let page = state
        .services
        .frame_orders
        .list_frame_orders(user.user_id, filter)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(page.map(
        |(order, items)| FrameOrderResponse::from_parts(order, items),
    ))))
}

/// Fetch one frame order. Customers can only read their own orders.
#[utoipa::path(
    get,
    path = "/api/v1/frameorders/{id}",
    params(("id" = Uuid, Path, description = "Frame order id")),
    responses(
        (status = 200, description = "Frame order", body = FrameOrderResponse),
        (status = 403, description = "Order belongs to another user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Frame Orders"
)]
pub async fn get_frame_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let requester = if user.is_admin() {
        None
    } else {
        Some(user.user_id)
    };
    let (order, items) = state
        .services
        .frame_orders
        .get_frame_order(id, requester)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(ApiResponse::success(
        FrameOrderResponse::from_parts(order, items),
    )))
}

/// Advance a frame order's delivery status (admin only).
#[utoipa::path(
    patch,
    path = "/api/v1/frameorders/{id}/status",
    params(("id" = Uuid, Path, description = "Frame order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Updated frame order", body = FrameOrderResponse),
        (status = 400, description = "Illegal transition", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Frame Orders"
)]
pub async fn update_frame_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateOrderStatusRequest>,
) -> Result<Response, ApiError> {
    user.require_admin().map_err(map_service_error)?;

    let (order, items) = state
        .services
        .frame_orders
        .get_frame_order(id, None)
        .await
        .map_err(map_service_error)?;

    let updated = state
        .services
        .order_status
        .update_status(StorefrontOrder::Frame(order), body.status)
        .await
        .map_err(map_service_error)?;

    match updated {
        StorefrontOrder::Frame(order) => Ok(success_response(ApiResponse::success(
            FrameOrderResponse::from_parts(order, items),
        ))),
        StorefrontOrder::Print(_) => unreachable!("frame orders stay frame orders"),
    }
}

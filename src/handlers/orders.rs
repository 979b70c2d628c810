use axum::{
    extract::{Multipart, Path, Query, State},
    response::Response,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::handlers::common::{created_response, map_service_error, success_response};
use crate::{
    auth::AuthUser,
    entities::order::{self, DeliveryDetails, DeliveryStatus, PaymentMethod, ProductType},
    errors::ApiError,
    services::checkout::{CheckoutOutcome, CompletedOrder, PrintCheckoutRequest},
    services::order_status::StorefrontOrder,
    services::orders::{OrderListFilter, SortOrder, StatusCategory},
    ApiResponse, AppState, ListQuery,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/:id", get(get_order).put(update_order))
}

/// Print order representation returned to the storefront
#[derive(Debug, Serialize, ToSchema)]
pub struct PrintOrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub cart_item_id: Uuid,
    pub product_type: ProductType,
    pub title: String,
    pub delivery_details: DeliveryDetails,
    pub amount: Decimal,
    pub image: Option<String>,
    pub status: DeliveryStatus,
    pub payment_method: PaymentMethod,
    pub payment_id: Option<String>,
    pub payment_status: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<order::Model> for PrintOrderResponse {
    fn from(model: order::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            cart_item_id: model.cart_item_id,
            product_type: model.product_type,
            title: model.title,
            delivery_details: model.delivery_details,
            amount: model.amount,
            image: model.image,
            status: model.status,
            payment_method: model.payment_method,
            payment_id: model.payment_id,
            payment_status: model.payment_status,
            paid_at: model.paid_at,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: DeliveryStatus,
}

/// Create a cash-on-delivery print order from a cart snapshot.
///
/// Multipart fields: `cart_item_id`, `product_type`, `amount`,
/// `delivery_details` (JSON). Online payments go through
/// `POST /payments/create` instead.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    responses(
        (status = 201, description = "Order created", body = PrintOrderResponse),
        (status = 400, description = "Invalid fields", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut cart_item_id: Option<Uuid> = None;
    let mut product_type: Option<ProductType> = None;
    let mut amount: Option<Decimal> = None;
    let mut delivery_details: Option<DeliveryDetails> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::BadRequest {
        message: format!("invalid multipart body: {}", e),
        error_code: None,
    })? {
        let name = field.name().unwrap_or_default().to_string();
        let value = field.text().await.map_err(|e| ApiError::BadRequest {
            message: format!("invalid multipart field {}: {}", name, e),
            error_code: None,
        })?;
        match name.as_str() {
            "cart_item_id" => {
                cart_item_id = Some(Uuid::parse_str(value.trim()).map_err(|_| {
                    ApiError::ValidationError("cart_item_id must be a UUID".to_string())
                })?)
            }
            "product_type" => {
                product_type = Some(ProductType::from_str(value.trim()).map_err(|_| {
                    ApiError::ValidationError(format!("unknown product_type: {}", value.trim()))
                })?)
            }
            "amount" => {
                amount = Some(Decimal::from_str(value.trim()).map_err(|_| {
                    ApiError::ValidationError("amount must be a decimal number".to_string())
                })?)
            }
            "delivery_details" => {
                delivery_details = Some(serde_json::from_str(&value).map_err(|e| {
                    ApiError::ValidationError(format!("invalid delivery_details: {}", e))
                })?)
            }
            _ => {}
        }
    }

    let request = PrintCheckoutRequest {
        cart_item_id: cart_item_id
            .ok_or_else(|| ApiError::ValidationError("cart_item_id is required".to_string()))?,
        product_type: product_type
            .ok_or_else(|| ApiError::ValidationError("product_type is required".to_string()))?,
        amount: amount
            .ok_or_else(|| ApiError::ValidationError("amount is required".to_string()))?,
        delivery_details: delivery_details
            .ok_or_else(|| ApiError::ValidationError("delivery_details is required".to_string()))?,
    };

    let outcome = state
        .services
        .checkout
        .begin_print_checkout(user.user_id, request, PaymentMethod::Cod)
        .await
        .map_err(map_service_error)?;

    match outcome {
        CheckoutOutcome::OrderCreated(CompletedOrder::Print(model)) => Ok(created_response(
            ApiResponse::success(PrintOrderResponse::from(model)),
        )),
        _ => Err(ApiError::ServiceError(
            crate::errors::ServiceError::InternalError(
                "COD checkout produced an unexpected outcome".to_string(),
            ),
        )),
    }
}

/// List the authenticated user's print orders.
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(ListQuery),
    responses((status = 200, description = "Orders page")),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let filter = list_filter(&query).map_err(map_service_error)?;

    let page = state
        .services
        .orders
        .list_orders(user.user_id, filter)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(
        page.map(PrintOrderResponse::from),
    )))
}

/// Fetch one print order. Customers can only read their own orders.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order", body = PrintOrderResponse),
        (status = 403, description = "Order belongs to another user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let requester = if user.is_admin() {
        None
    } else {
        Some(user.user_id)
    };
    let model = state
        .services
        .orders
        .get_order(id, requester)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(ApiResponse::success(
        PrintOrderResponse::from(model),
    )))
}

/// Advance an order's delivery status (admin only).
///
/// Only the single next status in the lifecycle is accepted; skip-ahead and
/// rollback are rejected, and delivered orders are immutable.
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Updated order", body = PrintOrderResponse),
        (status = 400, description = "Illegal transition", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    axum::Json(body): axum::Json<UpdateOrderStatusRequest>,
) -> Result<Response, ApiError> {
    user.require_admin().map_err(map_service_error)?;

    let model = state
        .services
        .orders
        .get_order(id, None)
        .await
        .map_err(map_service_error)?;

    let updated = state
        .services
        .order_status
        .update_status(StorefrontOrder::Print(model), body.status)
        .await
        .map_err(map_service_error)?;

    match updated {
        StorefrontOrder::Print(model) => Ok(success_response(ApiResponse::success(
            PrintOrderResponse::from(model),
        ))),
        StorefrontOrder::Frame(_) => unreachable!("print orders stay print orders"),
    }
}

pub(crate) fn list_filter(query: &ListQuery) -> Result<OrderListFilter, crate::errors::ServiceError> {
    let status = query
        .status
        .as_deref()
        .map(StatusCategory::parse)
        .transpose()?;
    let sort = query
        .sort
        .as_deref()
        .map(SortOrder::parse)
        .transpose()?
        .unwrap_or_default();
    Ok(OrderListFilter {
        status,
        search: query.search.clone(),
        sort,
        page: query.page,
        limit: query.limit,
    })
}

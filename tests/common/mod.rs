//! Shared integration test harness: in-memory SQLite, a mocked payment
//! gateway, and request helpers for the axum router.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Extension, Router,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Respond, ResponseTemplate,
};

use framepress_api as api;

use api::{
    auth::AuthVerifier,
    config::AppConfig,
    db::DbConfig,
    entities::{cart_item, order::ProductType},
    AppState,
};

pub const TEST_GATEWAY_SECRET: &str = "test_gateway_secret";

pub struct TestApp {
    pub db: Arc<sea_orm::DatabaseConnection>,
    pub router: Router,
    pub verifier: Arc<AuthVerifier>,
    _media_dir: tempfile::TempDir,
}

impl TestApp {
    /// App with an unreachable gateway; fine for COD and lifecycle tests.
    pub async fn new() -> Self {
        Self::with_gateway("http://127.0.0.1:9/v1").await
    }

    pub async fn with_gateway(gateway_url: &str) -> Self {
        let media_dir = tempfile::tempdir().expect("media dir");

        let mut cfg = AppConfig::default();
        cfg.database_url = "sqlite::memory:".to_string();
        cfg.environment = "test".to_string();
        cfg.gateway.key_id = "gw_test_123".to_string();
        cfg.gateway.key_secret = secrecy::Secret::new(TEST_GATEWAY_SECRET.to_string());
        cfg.gateway.api_base_url = gateway_url.trim_end_matches('/').to_string();
        cfg.gateway.timeout_secs = 5;
        cfg.storage.local_root = media_dir.path().display().to_string();
        cfg.storage.public_base_url = "http://localhost:8080/media".to_string();

        // A single pooled connection keeps every query on the same
        // in-memory SQLite database.
        let db = api::db::establish_connection_with_config(&DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .expect("test database");
        api::db::run_migrations(&db).await.expect("migrations");
        let db = Arc::new(db);

        let (tx, rx) = tokio::sync::mpsc::channel(1024);
        let event_sender = api::events::EventSender::new(tx);
        tokio::spawn(api::events::process_events(rx));

        let services =
            api::handlers::AppServices::new(db.clone(), Arc::new(event_sender.clone()), &cfg)
                .expect("services");
        let verifier = Arc::new(AuthVerifier::from_config(&cfg));

        let state = AppState {
            db: db.clone(),
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .nest("/health", api::handlers::health::routes())
            .nest("/api/v1", api::api_v1_routes())
            .layer(Extension(verifier.clone()))
            .layer(axum::middleware::from_fn(
                api::tracing_support::request_id_middleware,
            ))
            .with_state(state);

        Self {
            db,
            router,
            verifier,
            _media_dir: media_dir,
        }
    }

    pub fn token_for(&self, user_id: Uuid, roles: &[&str]) -> String {
        self.verifier
            .issue_token(user_id, roles, 3600)
            .expect("token")
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    pub async fn request_multipart(
        &self,
        path: &str,
        token: &str,
        fields: &[(&str, String)],
    ) -> Response {
        let boundary = "framepress-test-boundary";
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                boundary, name, value
            ));
        }
        body.push_str(&format!("--{}--\r\n", boundary));

        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("authorization", format!("Bearer {}", token))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .expect("request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    /// Insert a priced cart snapshot the checkout can reference.
    pub async fn seed_cart_item(
        &self,
        user_id: Uuid,
        product_type: ProductType,
        title: &str,
        unit_price: Decimal,
        quantity: i32,
    ) -> cart_item::Model {
        cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            product_ref: Set(Uuid::new_v4()),
            product_type: Set(product_type),
            title: Set(title.to_string()),
            size: Set("12x18".to_string()),
            thickness: Set(Some("3mm".to_string())),
            unit_price: Set(unit_price),
            quantity: Set(quantity),
            image: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("cart item")
    }
}

/// Start a mock gateway whose order ids are unique per call.
pub async fn mock_gateway() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(DynamicGatewayOrder)
        .mount(&server)
        .await;
    server
}

struct DynamicGatewayOrder;

impl Respond for DynamicGatewayOrder {
    fn respond(&self, request: &wiremock::Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or_default();
        ResponseTemplate::new(200).set_body_json(json!({
            "id": format!("order_{}", Uuid::new_v4().simple()),
            "amount": body.get("amount").cloned().unwrap_or_else(|| json!(0)),
            "currency": body.get("currency").cloned().unwrap_or_else(|| json!("INR")),
            "receipt": body.get("receipt").cloned().unwrap_or(Value::Null),
            "status": "created"
        }))
    }
}

/// Compute the confirmation signature the way the gateway does.
pub fn sign(gateway_order_id: &str, payment_id: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(TEST_GATEWAY_SECRET.as_bytes()).expect("hmac key");
    mac.update(format!("{}|{}", gateway_order_id, payment_id).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

pub async fn response_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Read a money field regardless of its JSON representation.
pub fn decimal_field(value: &Value) -> Decimal {
    serde_json::from_value(value.clone()).expect("decimal field")
}

pub fn delivery_details_json(items_total: Decimal, shipping_charge: Decimal) -> Value {
    json!({
        "name": "Asha Verma",
        "email": "asha@example.com",
        "phone": "9876543210",
        "address": "12 MG Road",
        "state": "Karnataka",
        "district": "Bengaluru Urban",
        "city": "Bengaluru",
        "pincode": "560001",
        "shipping_charge": shipping_charge,
        "items_total": items_total
    })
}

/// 1x1 transparent PNG as a data URL, the shape the configurator submits.
pub const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

pub fn frame_item_json(price: Decimal, quantity: i32, total: Decimal) -> Value {
    json!({
        "title": "Walnut classic 8x10",
        "shape": "rectangle",
        "color": "walnut",
        "size": "8x10",
        "price": price,
        "quantity": quantity,
        "total": total,
        "frame_image_url": PNG_DATA_URL,
        "user_image_url": PNG_DATA_URL
    })
}

//! End-to-end checkout tests over the axum router: COD for both order
//! shapes, the two-phase online flow against a mocked gateway, signature
//! tampering, cancellation, and callback idempotency.

mod common;

use axum::http::{Method, StatusCode};
use common::{
    delivery_details_json, frame_item_json, mock_gateway, response_json, sign, TestApp,
};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use framepress_api::entities::order::ProductType;

#[tokio::test]
async fn cod_frame_checkout_persists_with_cod_pending_status() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let token = app.token_for(customer, &[]);

    // one frame at 499, quantity 1, shipping 100 => grand total 599
    let payload = json!({
        "items": [frame_item_json(dec!(499), 1, dec!(499))],
        "shipping_details": delivery_details_json(dec!(499), dec!(100)),
        "shipping_charge": 100,
        "grand_total": 599,
        "payment_method": "cod"
    });

    let response = app
        .request(
            Method::POST,
            "/api/v1/frameorders/create",
            Some(&token),
            Some(payload),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    let data = &body["data"];
    assert_eq!(data["status"], "COD Pending");
    assert_eq!(common::decimal_field(&data["grand_total"]), dec!(599));
    assert_eq!(data["payment_method"], "cod");
    assert!(data["payment_id"].is_null());

    // image references were materialized to durable URLs
    let frame_url = data["items"][0]["frame_image_url"].as_str().unwrap();
    assert!(frame_url.starts_with("http://localhost:8080/media/frames/"));
    let user_url = data["items"][0]["user_image_url"].as_str().unwrap();
    assert!(user_url.starts_with("http://localhost:8080/media/frames/"));
    assert_ne!(frame_url, user_url);
}

#[tokio::test]
async fn cod_print_checkout_creates_pending_order_from_snapshot() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let token = app.token_for(customer, &[]);

    let cart = app
        .seed_cart_item(customer, ProductType::Acrylic, "Acrylic Sunset 12x18", dec!(499), 1)
        .await;

    let response = app
        .request_multipart(
            "/api/v1/orders",
            &token,
            &[
                ("cart_item_id", cart.id.to_string()),
                ("product_type", "acrylic".to_string()),
                ("amount", "599".to_string()),
                (
                    "delivery_details",
                    delivery_details_json(dec!(499), dec!(100)).to_string(),
                ),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    let data = &body["data"];
    assert_eq!(data["status"], "Pending");
    assert_eq!(data["payment_method"], "cod");
    assert_eq!(common::decimal_field(&data["amount"]), dec!(599));
    assert_eq!(data["title"], "Acrylic Sunset 12x18");
}

#[tokio::test]
async fn client_totals_that_disagree_with_the_snapshot_are_rejected() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let token = app.token_for(customer, &[]);

    let cart = app
        .seed_cart_item(customer, ProductType::Acrylic, "Acrylic Sunset 12x18", dec!(499), 1)
        .await;

    // 499 + 100 shipping is 599, not 500
    let response = app
        .request_multipart(
            "/api/v1/orders",
            &token,
            &[
                ("cart_item_id", cart.id.to_string()),
                ("product_type", "acrylic".to_string()),
                ("amount", "500".to_string()),
                (
                    "delivery_details",
                    delivery_details_json(dec!(499), dec!(100)).to_string(),
                ),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn online_print_checkout_completes_after_signature_verification() {
    let gateway = mock_gateway().await;
    let app = TestApp::with_gateway(&gateway.uri()).await;
    let customer = Uuid::new_v4();
    let token = app.token_for(customer, &[]);

    let cart = app
        .seed_cart_item(customer, ProductType::Acrylic, "Acrylic Sunset 12x18", dec!(499), 1)
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/create",
            Some(&token),
            Some(json!({
                "amount": 599,
                "cart_item_id": cart.id,
                "product_type": "acrylic",
                "delivery_details": delivery_details_json(dec!(499), dec!(100))
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let data = &body["data"];
    // 599 rupees charged as 59900 paise
    assert_eq!(data["amount"], 59900);
    let gateway_order_id = data["gateway_order_id"].as_str().unwrap().to_string();
    assert!(gateway_order_id.starts_with("order_"));

    // no order yet: the gateway UI is still open
    let list = app
        .request(Method::GET, "/api/v1/orders", Some(&token), None)
        .await;
    let list_body = response_json(list).await;
    assert_eq!(list_body["data"]["total"], 0);

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/verify",
            Some(&token),
            Some(json!({
                "gateway_order_id": gateway_order_id,
                "payment_id": "pay_77001",
                "signature": sign(&gateway_order_id, "pay_77001")
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["data"]["success"], true);
    let order = &body["data"]["order"];
    assert_eq!(order["status"], "Pending");
    assert_eq!(order["payment_method"], "online");
    assert_eq!(order["payment_status"], "success");
    assert_eq!(order["payment_id"], "pay_77001");
    assert_eq!(common::decimal_field(&order["amount"]), dec!(599));

    let list = app
        .request(Method::GET, "/api/v1/orders", Some(&token), None)
        .await;
    let list_body = response_json(list).await;
    assert_eq!(list_body["data"]["total"], 1);
}

#[tokio::test]
async fn tampered_signature_fails_and_persists_nothing() {
    let gateway = mock_gateway().await;
    let app = TestApp::with_gateway(&gateway.uri()).await;
    let customer = Uuid::new_v4();
    let token = app.token_for(customer, &[]);

    let response = app
        .request(
            Method::POST,
            "/api/v1/frameorders/create",
            Some(&token),
            Some(json!({
                "items": [frame_item_json(dec!(499), 1, dec!(499))],
                "shipping_details": delivery_details_json(dec!(499), dec!(100)),
                "shipping_charge": 100,
                "grand_total": 599,
                "payment_method": "online"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let gateway_order_id = body["data"]["gateway_order_id"].as_str().unwrap().to_string();

    // signature computed over a different payment id
    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/verify",
            Some(&token),
            Some(json!({
                "gateway_order_id": gateway_order_id,
                "payment_id": "pay_77002",
                "signature": sign(&gateway_order_id, "pay_other")
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let list = app
        .request(Method::GET, "/api/v1/frameorders", Some(&token), None)
        .await;
    let list_body = response_json(list).await;
    assert_eq!(list_body["data"]["total"], 0);
}

#[tokio::test]
async fn dismissing_the_gateway_leaves_no_order_and_allows_a_second_attempt() {
    let gateway = mock_gateway().await;
    let app = TestApp::with_gateway(&gateway.uri()).await;
    let customer = Uuid::new_v4();
    let token = app.token_for(customer, &[]);

    let cart = app
        .seed_cart_item(customer, ProductType::NewArrival, "Birch print 10x14", dec!(799), 2)
        .await;

    async fn begin(app: &TestApp, token: &str, cart_id: Uuid) -> serde_json::Value {
        let response = app
            .request(
                Method::POST,
                "/api/v1/payments/create",
                Some(token),
                Some(json!({
                    "amount": 1698,
                    "cart_item_id": cart_id,
                    "product_type": "new_arrival",
                    "delivery_details": delivery_details_json(dec!(1598), dec!(100))
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        response_json(response).await
    }

    // first attempt: customer closes the gateway UI
    let first = begin(&app, &token, cart.id).await;
    let checkout_token = first["data"]["checkout_token"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/cancel",
            Some(&token),
            Some(json!({ "checkout_token": checkout_token })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["cancelled"], true);

    // verifying a cancelled attempt is an error and still persists nothing
    let first_gw = first["data"]["gateway_order_id"].as_str().unwrap();
    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/verify",
            Some(&token),
            Some(json!({
                "gateway_order_id": first_gw,
                "payment_id": "pay_77003",
                "signature": sign(first_gw, "pay_77003")
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let list = app
        .request(Method::GET, "/api/v1/orders", Some(&token), None)
        .await;
    assert_eq!(response_json(list).await["data"]["total"], 0);

    // second, legitimate attempt succeeds independently
    let second = begin(&app, &token, cart.id).await;
    let second_gw = second["data"]["gateway_order_id"].as_str().unwrap().to_string();
    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/verify",
            Some(&token),
            Some(json!({
                "gateway_order_id": second_gw,
                "payment_id": "pay_77004",
                "signature": sign(&second_gw, "pay_77004")
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let list = app
        .request(Method::GET, "/api/v1/orders", Some(&token), None)
        .await;
    assert_eq!(response_json(list).await["data"]["total"], 1);
}

#[tokio::test]
async fn duplicate_success_callbacks_converge_on_one_order() {
    let gateway = mock_gateway().await;
    let app = TestApp::with_gateway(&gateway.uri()).await;
    let customer = Uuid::new_v4();
    let token = app.token_for(customer, &[]);

    let response = app
        .request(
            Method::POST,
            "/api/v1/frameorders/create",
            Some(&token),
            Some(json!({
                "items": [frame_item_json(dec!(250), 2, dec!(500))],
                "shipping_details": delivery_details_json(dec!(500), dec!(50)),
                "shipping_charge": 50,
                "grand_total": 550,
                "payment_method": "online"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let gateway_order_id = body["data"]["gateway_order_id"].as_str().unwrap().to_string();

    let confirm = json!({
        "gateway_order_id": gateway_order_id,
        "payment_id": "pay_77005",
        "signature": sign(&gateway_order_id, "pay_77005")
    });

    let first = app
        .request(
            Method::POST,
            "/api/v1/payments/verify",
            Some(&token),
            Some(confirm.clone()),
        )
        .await;
    assert_eq!(first.status(), StatusCode::OK);
    let first_body = response_json(first).await;
    let first_id = first_body["data"]["order"]["id"].as_str().unwrap().to_string();

    let second = app
        .request(
            Method::POST,
            "/api/v1/payments/verify",
            Some(&token),
            Some(confirm),
        )
        .await;
    assert_eq!(second.status(), StatusCode::OK);
    let second_body = response_json(second).await;
    assert_eq!(second_body["data"]["order"]["id"], first_id.as_str());

    let list = app
        .request(Method::GET, "/api/v1/frameorders", Some(&token), None)
        .await;
    let list_body = response_json(list).await;
    assert_eq!(list_body["data"]["total"], 1);

    // online frame orders start at Pending and carry materialized assets
    let order = &list_body["data"]["records"][0];
    assert_eq!(order["status"], "Pending");
    assert!(order["items"][0]["frame_image_url"]
        .as_str()
        .unwrap()
        .starts_with("http://localhost:8080/media/frames/"));
}

#[tokio::test]
async fn inconsistent_frame_totals_are_rejected_with_field_messages() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let token = app.token_for(customer, &[]);

    // total says 499 but price * quantity is 998
    let response = app
        .request(
            Method::POST,
            "/api/v1/frameorders/create",
            Some(&token),
            Some(json!({
                "items": [frame_item_json(dec!(499), 2, dec!(499))],
                "shipping_details": delivery_details_json(dec!(998), dec!(100)),
                "shipping_charge": 100,
                "grand_total": 599,
                "payment_method": "cod"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("items[0]"));
}

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/api/v1/orders", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_endpoints_respond() {
    let app = TestApp::new().await;
    let live = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(live.status(), StatusCode::OK);
    let ready = app.request(Method::GET, "/health/ready", None, None).await;
    assert_eq!(ready.status(), StatusCode::OK);
}

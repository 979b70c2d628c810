//! Delivery lifecycle tests for both order shapes: strict forward-only
//! transitions, terminal immutability, access control, and the list
//! filters the storefront's "my orders" screens rely on.

mod common;

use axum::http::{Method, StatusCode};
use common::{delivery_details_json, frame_item_json, response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

use framepress_api::entities::order::ProductType;

async fn create_cod_frame_order(app: &TestApp, token: &str) -> Value {
    let response = app
        .request(
            Method::POST,
            "/api/v1/frameorders/create",
            Some(token),
            Some(json!({
                "items": [frame_item_json(dec!(499), 1, dec!(499))],
                "shipping_details": delivery_details_json(dec!(499), dec!(100)),
                "shipping_charge": 100,
                "grand_total": 599,
                "payment_method": "cod"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response_json(response).await["data"].clone()
}

async fn create_cod_print_order(
    app: &TestApp,
    token: &str,
    user: Uuid,
    title: &str,
) -> Value {
    let cart = app
        .seed_cart_item(user, ProductType::Acrylic, title, dec!(499), 1)
        .await;
    let response = app
        .request_multipart(
            "/api/v1/orders",
            token,
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
    response_json(response).await["data"].clone()
}

async fn patch_frame_status(app: &TestApp, token: &str, id: &str, status: &str) -> StatusCode {
    app.request(
        Method::PATCH,
        &format!("/api/v1/frameorders/{}/status", id),
        Some(token),
        Some(json!({ "status": status })),
    )
    .await
    .status()
}

async fn put_order_status(app: &TestApp, token: &str, id: &str, status: &str) -> StatusCode {
    app.request(
        Method::PUT,
        &format!("/api/v1/orders/{}", id),
        Some(token),
        Some(json!({ "status": status })),
    )
    .await
    .status()
}

#[tokio::test]
async fn frame_orders_walk_the_full_lifecycle_and_stop_at_delivered() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let customer_token = app.token_for(customer, &[]);
    let admin_token = app.token_for(Uuid::new_v4(), &["admin"]);

    let order = create_cod_frame_order(&app, &customer_token).await;
    let id = order["id"].as_str().unwrap();
    assert_eq!(order["status"], "COD Pending");

    // COD confirmation, then the delivery chain
    for status in ["Pending", "Shipped", "Out for Delivery", "Delivered"] {
        assert_eq!(
            patch_frame_status(&app, &admin_token, id, status).await,
            StatusCode::OK,
            "transition to {} should be accepted",
            status
        );
    }

    // delivered orders are immutable: any further update is rejected
    for status in ["Delivered", "Pending", "Shipped"] {
        assert_eq!(
            patch_frame_status(&app, &admin_token, id, status).await,
            StatusCode::BAD_REQUEST,
            "transition out of Delivered to {} must be rejected",
            status
        );
    }

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/frameorders/{}", id),
            Some(&customer_token),
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "Delivered");
}

#[tokio::test]
async fn skip_ahead_and_rollback_are_rejected() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let customer_token = app.token_for(customer, &[]);
    let admin_token = app.token_for(Uuid::new_v4(), &["admin"]);

    let order = create_cod_print_order(&app, &customer_token, customer, "Acrylic Sunset").await;
    let id = order["id"].as_str().unwrap();
    assert_eq!(order["status"], "Pending");

    // Pending -> Delivered skips two states
    assert_eq!(
        put_order_status(&app, &admin_token, id, "Delivered").await,
        StatusCode::BAD_REQUEST
    );
    // Pending -> Out for Delivery skips one
    assert_eq!(
        put_order_status(&app, &admin_token, id, "Out for Delivery").await,
        StatusCode::BAD_REQUEST
    );

    assert_eq!(
        put_order_status(&app, &admin_token, id, "Shipped").await,
        StatusCode::OK
    );
    // rollback
    assert_eq!(
        put_order_status(&app, &admin_token, id, "Pending").await,
        StatusCode::BAD_REQUEST
    );

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", id),
            Some(&customer_token),
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "Shipped");
}

#[tokio::test]
async fn status_updates_require_the_admin_role() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let customer_token = app.token_for(customer, &[]);

    let order = create_cod_print_order(&app, &customer_token, customer, "Acrylic Sunset").await;
    let id = order["id"].as_str().unwrap();

    assert_eq!(
        put_order_status(&app, &customer_token, id, "Shipped").await,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn customers_cannot_read_each_others_orders() {
    let app = TestApp::new().await;
    let alice = Uuid::new_v4();
    let alice_token = app.token_for(alice, &[]);
    let mallory_token = app.token_for(Uuid::new_v4(), &[]);
    let admin_token = app.token_for(Uuid::new_v4(), &["admin"]);

    let order = create_cod_print_order(&app, &alice_token, alice, "Acrylic Sunset").await;
    let id = order["id"].as_str().unwrap();

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", id),
            Some(&mallory_token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // the owner and an admin both can
    for token in [&alice_token, &admin_token] {
        let response = app
            .request(
                Method::GET,
                &format!("/api/v1/orders/{}", id),
                Some(token),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn unknown_orders_yield_404() {
    let app = TestApp::new().await;
    let admin_token = app.token_for(Uuid::new_v4(), &["admin"]);

    assert_eq!(
        put_order_status(&app, &admin_token, &Uuid::new_v4().to_string(), "Shipped").await,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn list_supports_status_categories_and_search() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let customer_token = app.token_for(customer, &[]);
    let admin_token = app.token_for(Uuid::new_v4(), &["admin"]);

    let sunset =
        create_cod_print_order(&app, &customer_token, customer, "Acrylic Sunset").await;
    let _dog = create_cod_print_order(&app, &customer_token, customer, "Canvas Dog").await;

    // drive the first order to Delivered
    let sunset_id = sunset["id"].as_str().unwrap();
    for status in ["Shipped", "Out for Delivery", "Delivered"] {
        assert_eq!(
            put_order_status(&app, &admin_token, sunset_id, status).await,
            StatusCode::OK
        );
    }

    let completed = response_json(
        app.request(
            Method::GET,
            "/api/v1/orders?status=Completed",
            Some(&customer_token),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(completed["data"]["total"], 1);
    assert_eq!(completed["data"]["records"][0]["status"], "Delivered");

    let processing = response_json(
        app.request(
            Method::GET,
            "/api/v1/orders?status=Processing",
            Some(&customer_token),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(processing["data"]["total"], 1);
    assert_eq!(processing["data"]["records"][0]["status"], "Pending");

    // case-insensitive title search
    let by_title = response_json(
        app.request(
            Method::GET,
            "/api/v1/orders?search=sunset",
            Some(&customer_token),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(by_title["data"]["total"], 1);
    assert_eq!(by_title["data"]["records"][0]["id"], sunset_id);

    // search by order id
    let by_id = response_json(
        app.request(
            Method::GET,
            &format!("/api/v1/orders?search={}", sunset_id),
            Some(&customer_token),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(by_id["data"]["total"], 1);

    // unknown category is a validation error
    let response = app
        .request(
            Method::GET,
            "/api/v1/orders?status=Archived",
            Some(&customer_token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn frame_list_searches_item_titles() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let token = app.token_for(customer, &[]);

    create_cod_frame_order(&app, &token).await;

    let found = response_json(
        app.request(
            Method::GET,
            "/api/v1/frameorders?search=walnut",
            Some(&token),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(found["data"]["total"], 1);

    let missing = response_json(
        app.request(
            Method::GET,
            "/api/v1/frameorders?search=mahogany",
            Some(&token),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(missing["data"]["total"], 0);
}

#[tokio::test]
async fn lists_paginate_with_round_up_page_counts() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let token = app.token_for(customer, &[]);

    for title in ["First print", "Second print", "Third print"] {
        create_cod_print_order(&app, &token, customer, title).await;
    }

    let page = response_json(
        app.request(
            Method::GET,
            "/api/v1/orders?page=1&limit=2",
            Some(&token),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(page["data"]["total"], 3);
    assert_eq!(page["data"]["total_pages"], 2);
    assert_eq!(page["data"]["records"].as_array().unwrap().len(), 2);

    let page2 = response_json(
        app.request(
            Method::GET,
            "/api/v1/orders?page=2&limit=2",
            Some(&token),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(page2["data"]["records"].as_array().unwrap().len(), 1);
}

use std::sync::Arc;
use std::time::Duration;

use chrono::Datelike;
use serde_json::json;
use uuid::Uuid;

use checkout_engine::application::checkout_service::CheckoutService;
use checkout_engine::application::provider_registry::ProviderRegistry;
use checkout_engine::application::providers::FlatRateTax;
use checkout_engine::inbound::http::{HttpServer, HttpServerConfig};
use checkout_store::memory::MemoryStore;
use checkout_types::domain::order::OrderStatus;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

async fn start_server() -> String {
    let port = find_free_port();
    let config = HttpServerConfig {
        port: port.to_string(),
    };
    let service = CheckoutService::new(
        MemoryStore::new(),
        Arc::new(ProviderRegistry::with_defaults()),
        Arc::new(FlatRateTax::new(0)),
        chrono::Duration::minutes(15),
        Duration::from_secs(5),
    );
    let server = HttpServer::new(service, config).await.unwrap();
    tokio::spawn(async move {
        server.run().await.expect("server run");
    });

    // Give the server a moment to start.
    tokio::time::sleep(Duration::from_millis(50)).await;
    format!("http://127.0.0.1:{}", port)
}

fn destination() -> serde_json::Value {
    json!({
        "full_name": "Alex Merchant",
        "line1": "1 Main St",
        "city": "Springfield",
        "postal_code": "12345",
        "country": "US",
        "service_level": "standard"
    })
}

fn card(number: &str) -> serde_json::Value {
    json!({
        "cardholder_name": "Alex Merchant",
        "card_number": number,
        "exp_month": "12",
        "exp_year": (chrono::Utc::now().year() + 1).to_string()
    })
}

#[tokio::test]
async fn full_checkout_over_http() {
    let addr = start_server().await;
    let client = reqwest::Client::new();
    let user = Uuid::new_v4().to_string();

    let res = client
        .post(format!("{}/products", addr))
        .json(&json!({ "name": "Widget", "price": 1000, "stock": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    let product: serde_json::Value = res.json().await.unwrap();
    let product_id = product["id"].as_str().unwrap().to_string();

    let res = client
        .post(format!("{}/cart/items", addr))
        .header("x-user-id", &user)
        .json(&json!({ "product_id": product_id, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let cart: serde_json::Value = res.json().await.unwrap();
    assert_eq!(cart["subtotal"], 1000);

    let providers: serde_json::Value = client
        .get(format!("{}/providers", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(providers.as_array().unwrap().len(), 4);

    let res = client
        .post(format!("{}/checkout/quote", addr))
        .header("x-user-id", &user)
        .json(&json!({
            "payment_provider_id": "dummy-card",
            "shipping_provider_id": "dummy-ground",
            "destination": destination()
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    let quote: serde_json::Value = res.json().await.unwrap();
    assert_eq!(quote["subtotal"], 1000);
    assert_eq!(quote["shipping_cost"], 599);
    assert_eq!(quote["total"], 1599);
    let quote_id = quote["id"].as_str().unwrap().to_string();

    let res = client
        .post(format!("{}/checkout/place", addr))
        .header("x-user-id", &user)
        .json(&json!({ "quote_id": quote_id, "payment_input": card("4242424242424242") }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    let order: serde_json::Value = res.json().await.unwrap();
    assert_eq!(order["status"], "PAID");
    assert_eq!(
        order["payment_method_display"],
        "Visa \u{2022}\u{2022}\u{2022}\u{2022} 4242"
    );
    let order_id = order["id"].as_str().unwrap().to_string();

    // Re-using the consumed quote is rejected.
    let res = client
        .post(format!("{}/checkout/place", addr))
        .header("x-user-id", &user)
        .json(&json!({ "quote_id": quote_id, "payment_input": card("4242424242424242") }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::GONE);

    let cart: serde_json::Value = client
        .get(format!("{}/cart", addr))
        .header("x-user-id", &user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(cart["lines"].as_array().unwrap().is_empty());

    let fetched: serde_json::Value = client
        .get(format!("{}/orders/{}", addr, order_id))
        .header("x-user-id", &user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["status"], "PAID");

    let list: serde_json::Value = client
        .get(format!("{}/orders", addr))
        .header("x-user-id", &user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn declined_settlement_over_http() {
    let addr = start_server().await;
    let client = reqwest::Client::new();
    let user = Uuid::new_v4().to_string();

    let product: serde_json::Value = client
        .post(format!("{}/products", addr))
        .json(&json!({ "name": "Widget", "price": 1000, "stock": 5 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let product_id = product["id"].as_str().unwrap().to_string();

    client
        .post(format!("{}/cart/items", addr))
        .header("x-user-id", &user)
        .json(&json!({ "product_id": product_id, "quantity": 1 }))
        .send()
        .await
        .unwrap();

    let quote: serde_json::Value = client
        .post(format!("{}/checkout/quote", addr))
        .header("x-user-id", &user)
        .json(&json!({
            "payment_provider_id": "dummy-card",
            "shipping_provider_id": "dummy-ground",
            "destination": destination()
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let res = client
        .post(format!("{}/checkout/place", addr))
        .header("x-user-id", &user)
        .json(&json!({
            "quote_id": quote["id"],
            "payment_input": card("4242424242420000")
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::PAYMENT_REQUIRED);

    // Stock restored, cart intact, order FAILED.
    let products: serde_json::Value = client
        .get(format!("{}/products", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(products[0]["stock"], 5);

    let cart: serde_json::Value = client
        .get(format!("{}/cart", addr))
        .header("x-user-id", &user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["lines"].as_array().unwrap().len(), 1);

    let orders: serde_json::Value = client
        .get(format!("{}/orders", addr))
        .header("x-user-id", &user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(orders[0]["status"], json!(OrderStatus::Failed));
}

#[tokio::test]
async fn error_statuses() {
    let addr = start_server().await;
    let client = reqwest::Client::new();
    let user = Uuid::new_v4().to_string();

    // Identity is required for user-scoped routes.
    let res = client.get(format!("{}/cart", addr)).send().await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

    // Unknown product.
    let res = client
        .post(format!("{}/cart/items", addr))
        .header("x-user-id", &user)
        .json(&json!({ "product_id": Uuid::new_v4(), "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);

    // Quoting an empty cart.
    let res = client
        .post(format!("{}/checkout/quote", addr))
        .header("x-user-id", &user)
        .json(&json!({
            "payment_provider_id": "dummy-card",
            "shipping_provider_id": "dummy-ground",
            "destination": destination()
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

    // Missing destination fields surface as 400 with the field list.
    let product: serde_json::Value = client
        .post(format!("{}/products", addr))
        .json(&json!({ "name": "Widget", "price": 1000, "stock": 5 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    client
        .post(format!("{}/cart/items", addr))
        .header("x-user-id", &user)
        .json(&json!({ "product_id": product["id"], "quantity": 1 }))
        .send()
        .await
        .unwrap();
    let res = client
        .post(format!("{}/checkout/quote", addr))
        .header("x-user-id", &user)
        .json(&json!({
            "payment_provider_id": "dummy-card",
            "shipping_provider_id": "dummy-ground",
            "destination": {}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["fields"].as_array().unwrap().len() >= 4);

    // Orders are invisible to other users.
    let res = client
        .get(format!("{}/orders/{}", addr, Uuid::new_v4()))
        .header("x-user-id", &user)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
}

///  To run :
///  cargo r --example client_example
use std::sync::Arc;

use checkout_client::{CheckoutClient, CreateProductRequest, QuoteCheckoutRequest};
use checkout_engine::application::checkout_service::CheckoutService;
use checkout_engine::application::provider_registry::ProviderRegistry;
use checkout_engine::application::providers::FlatRateTax;
use checkout_engine::inbound::http::{HttpServer, HttpServerConfig};
use checkout_store::build_store;
use checkout_types::domain::money::Money;
use checkout_types::domain::order::OrderStatus;
use checkout_types::domain::provider::FieldValues;
use chrono::Datelike;
use tempfile::tempdir;
use uuid::Uuid;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Start server on an ephemeral port.
    let port = find_free_port();
    let addr = format!("http://127.0.0.1:{port}/");

    // Use a temp file-backed SQLite DB so multiple connections see the same data.
    let tmp = tempdir()?;
    let db_path = tmp.path().join("checkout.db");
    let db_url = format!("sqlite://{}", db_path.display());

    let store = build_store(Some(&db_url)).await?;
    let service = CheckoutService::new(
        store,
        Arc::new(ProviderRegistry::with_defaults()),
        Arc::new(FlatRateTax::new(0)),
        chrono::Duration::minutes(15),
        std::time::Duration::from_secs(5),
    );
    let server = HttpServer::new(
        service,
        HttpServerConfig {
            port: port.to_string(),
        },
    )
    .await?;

    tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let user = Uuid::new_v4();
    let client = CheckoutClient::for_user(&addr, user)?;

    let product = client
        .create_product(CreateProductRequest {
            name: "Widget".into(),
            price: Money(1000),
            stock: 5,
        })
        .await?;
    println!("Created product id={}", product.id);

    let cart = client.add_cart_item(product.id, 1).await?;
    println!("Cart subtotal={}", cart.subtotal);

    let mut destination = FieldValues::new();
    destination.insert("full_name".into(), "Example Buyer".into());
    destination.insert("line1".into(), "1 Main St".into());
    destination.insert("city".into(), "Springfield".into());
    destination.insert("postal_code".into(), "12345".into());
    destination.insert("country".into(), "US".into());
    destination.insert("service_level".into(), "standard".into());

    let quote = client
        .quote_checkout(QuoteCheckoutRequest {
            payment_provider_id: "dummy-card".into(),
            shipping_provider_id: "dummy-ground".into(),
            destination,
        })
        .await?;
    println!(
        "Quoted subtotal={} shipping={} total={}",
        quote.subtotal, quote.shipping_cost, quote.total
    );

    let mut payment = FieldValues::new();
    payment.insert("cardholder_name".into(), "Example Buyer".into());
    payment.insert("card_number".into(), "4242424242424242".into());
    payment.insert("exp_month".into(), "12".into());
    payment.insert(
        "exp_year".into(),
        (chrono::Utc::now().year() + 1).to_string(),
    );

    let order = client.place_order(quote.id, payment).await?;
    println!(
        "Placed order id={} status={:?} paid with {:?}",
        order.id, order.status, order.payment_method_display
    );
    assert_eq!(order.status, OrderStatus::Paid);

    let orders = client.list_orders().await?;
    println!("User now has {} order(s)", orders.len());

    Ok(())
}

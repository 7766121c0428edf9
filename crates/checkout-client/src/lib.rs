//! HTTP client for the checkout service. Identity travels as the
//! `x-user-id` default header, matching what the server expects from
//! its fronting auth layer.

use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use checkout_types::domain::money::Money;
use checkout_types::domain::order::Order;
use checkout_types::domain::product::Product;
use checkout_types::domain::provider::{FieldValues, ProviderDefinition};
use checkout_types::domain::quote::CheckoutQuote;

#[derive(Clone)]
pub struct CheckoutClientBuilder {
    base: Url,
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

#[derive(Clone)]
pub struct CheckoutClient {
    base: Url,
    client: reqwest::Client,
}

impl CheckoutClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::builder(base_url)?.build()
    }

    /// Client whose requests all act as the given user.
    pub fn for_user(base_url: &str, user_id: Uuid) -> anyhow::Result<Self> {
        Self::builder(base_url)?
            .with_header("x-user-id", user_id.to_string())?
            .build()
    }

    pub fn builder(base_url: &str) -> anyhow::Result<CheckoutClientBuilder> {
        let base = Url::parse(base_url).context("invalid base url")?;
        Ok(CheckoutClientBuilder {
            base,
            headers: HeaderMap::new(),
            timeout: None,
            client: None,
        })
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base.join(path).context("failed to join url")
    }

    pub async fn list_products(&self) -> anyhow::Result<Vec<Product>> {
        let res = self
            .client
            .get(self.url("products")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn create_product(&self, req: CreateProductRequest) -> anyhow::Result<Product> {
        let res = self
            .client
            .post(self.url("products")?)
            .json(&req)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn view_cart(&self) -> anyhow::Result<CartView> {
        let res = self
            .client
            .get(self.url("cart")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn add_cart_item(&self, product_id: Uuid, quantity: u32) -> anyhow::Result<CartView> {
        let res = self
            .client
            .post(self.url("cart/items")?)
            .json(&AddCartItemRequest {
                product_id,
                quantity,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn update_cart_item(
        &self,
        product_id: Uuid,
        quantity: i64,
    ) -> anyhow::Result<CartView> {
        let res = self
            .client
            .patch(self.url(&format!("cart/items/{product_id}"))?)
            .json(&UpdateCartItemRequest { quantity })
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn remove_cart_item(&self, product_id: Uuid) -> anyhow::Result<CartView> {
        let res = self
            .client
            .delete(self.url(&format!("cart/items/{product_id}"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn list_providers(&self) -> anyhow::Result<Vec<ProviderDefinition>> {
        let res = self
            .client
            .get(self.url("providers")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn quote_checkout(&self, req: QuoteCheckoutRequest) -> anyhow::Result<CheckoutQuote> {
        let res = self
            .client
            .post(self.url("checkout/quote")?)
            .json(&req)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn place_order(
        &self,
        quote_id: Uuid,
        payment_input: FieldValues,
    ) -> anyhow::Result<Order> {
        let res = self
            .client
            .post(self.url("checkout/place")?)
            .json(&PlaceOrderRequest {
                quote_id,
                payment_input,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn create_order(&self, quote_id: Uuid) -> anyhow::Result<Order> {
        let res = self
            .client
            .post(self.url("orders")?)
            .json(&CreateOrderRequest { quote_id })
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn list_orders(&self) -> anyhow::Result<Vec<Order>> {
        let res = self
            .client
            .get(self.url("orders")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn get_order(&self, id: Uuid) -> anyhow::Result<Order> {
        let res = self
            .client
            .get(self.url(&format!("orders/{id}"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn settle_order(&self, id: Uuid, payment_input: FieldValues) -> anyhow::Result<Order> {
        let res = self
            .client
            .post(self.url(&format!("orders/{id}/settle"))?)
            .json(&SettleOrderRequest { payment_input })
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn cancel_order(&self, id: Uuid) -> anyhow::Result<Order> {
        let res = self
            .client
            .post(self.url(&format!("orders/{id}/cancel"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }
}

impl CheckoutClientBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("invalid header value")?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<CheckoutClient> {
        if let Some(client) = self.client {
            return Ok(CheckoutClient {
                base: self.base,
                client,
            });
        }

        let mut builder = reqwest::Client::builder();
        if !self.headers.is_empty() {
            builder = builder.default_headers(self.headers);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(CheckoutClient {
            base: self.base,
            client,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: Money,
    pub stock: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct UpdateCartItemRequest {
    quantity: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct QuoteCheckoutRequest {
    pub payment_provider_id: String,
    pub shipping_provider_id: String,
    #[serde(default)]
    pub destination: FieldValues,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct CreateOrderRequest {
    quote_id: Uuid,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct PlaceOrderRequest {
    quote_id: Uuid,
    #[serde(default)]
    payment_input: FieldValues,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct SettleOrderRequest {
    #[serde(default)]
    payment_input: FieldValues,
}

/// Wire mirror of the server's live-priced cart view.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CartView {
    pub user_id: Uuid,
    pub lines: Vec<CartLineView>,
    pub subtotal: Money,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CartLineView {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_types::domain::order::{OrderItem, OrderStatus};
    use httpmock::prelude::*;

    fn sample_order(user_id: Uuid) -> Order {
        Order {
            id: Uuid::new_v4(),
            user_id,
            items: vec![OrderItem {
                product_id: Uuid::new_v4(),
                name: "Widget".into(),
                quantity: 1,
                unit_price: Money(1000),
            }],
            total: Money(1599),
            status: OrderStatus::Pending,
            payment_provider_id: "dummy-card".into(),
            payment_method_display: None,
            shipping_address: "1 Main St, Springfield, 12345, US".into(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn user_header_travels_with_every_request() {
        let server = MockServer::start();
        let user = Uuid::new_v4();

        let cart_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/cart")
                .header("x-user-id", user.to_string());
            then.status(200).json_body_obj(&CartView {
                user_id: user,
                lines: vec![],
                subtotal: Money::ZERO,
            });
        });

        let client = CheckoutClient::for_user(&server.base_url(), user).unwrap();
        let cart = client.view_cart().await.unwrap();
        assert!(cart.lines.is_empty());

        cart_mock.assert();
    }

    #[tokio::test]
    async fn cart_and_quote_round_trip() {
        let server = MockServer::start();
        let user = Uuid::new_v4();
        let product_id = Uuid::new_v4();

        let add_mock = server.mock(|when, then| {
            when.method(POST).path("/cart/items").json_body_obj(
                &AddCartItemRequest {
                    product_id,
                    quantity: 2,
                },
            );
            then.status(200).json_body_obj(&CartView {
                user_id: user,
                lines: vec![CartLineView {
                    product_id,
                    name: "Widget".into(),
                    quantity: 2,
                    unit_price: Money(1000),
                    line_total: Money(2000),
                }],
                subtotal: Money(2000),
            });
        });

        let quote = CheckoutQuote {
            id: Uuid::new_v4(),
            user_id: user,
            lines: vec![],
            payment_provider_id: "dummy-card".into(),
            shipping_provider_id: "dummy-ground".into(),
            destination: FieldValues::new(),
            shipping_address: "1 Main St".into(),
            subtotal: Money(2000),
            shipping_cost: Money(599),
            tax: Money::ZERO,
            total: Money(2599),
            expires_at: chrono::Utc::now() + chrono::Duration::minutes(15),
        };
        let quote_mock = server.mock(|when, then| {
            when.method(POST).path("/checkout/quote");
            then.status(201).json_body_obj(&quote);
        });

        let client = CheckoutClient::for_user(&server.base_url(), user).unwrap();
        let cart = client.add_cart_item(product_id, 2).await.unwrap();
        assert_eq!(cart.subtotal, Money(2000));

        let quoted = client
            .quote_checkout(QuoteCheckoutRequest {
                payment_provider_id: "dummy-card".into(),
                shipping_provider_id: "dummy-ground".into(),
                destination: FieldValues::new(),
            })
            .await
            .unwrap();
        assert_eq!(quoted.total, Money(2599));

        add_mock.assert();
        quote_mock.assert();
    }

    #[tokio::test]
    async fn place_and_settle() {
        let server = MockServer::start();
        let user = Uuid::new_v4();
        let quote_id = Uuid::new_v4();

        let mut paid = sample_order(user);
        paid.status = OrderStatus::Paid;
        paid.payment_method_display = Some("Visa \u{2022}\u{2022}\u{2022}\u{2022} 4242".into());

        let place_mock = server.mock(|when, then| {
            when.method(POST).path("/checkout/place");
            then.status(201).json_body_obj(&paid);
        });

        let settle_mock = server.mock(|when, then| {
            when.method(POST).path(format!("/orders/{}/settle", paid.id));
            then.status(200).json_body_obj(&paid);
        });

        let client = CheckoutClient::for_user(&server.base_url(), user).unwrap();
        let placed = client
            .place_order(quote_id, FieldValues::new())
            .await
            .unwrap();
        assert_eq!(placed.status, OrderStatus::Paid);

        let settled = client.settle_order(paid.id, FieldValues::new()).await.unwrap();
        assert_eq!(
            settled.payment_method_display.as_deref(),
            Some("Visa \u{2022}\u{2022}\u{2022}\u{2022} 4242")
        );

        place_mock.assert();
        settle_mock.assert();
    }
}

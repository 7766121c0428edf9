use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

use checkout_types::domain::cart::{Cart, CartItem};
use checkout_types::domain::money::Money;
use checkout_types::domain::order::{Order, OrderItem, OrderStatus};
use checkout_types::domain::product::Product;
use checkout_types::ports::cart_store::CartStore;
use checkout_types::ports::catalog_store::CatalogStore;
use checkout_types::ports::inventory_ledger::{InventoryLedger, LedgerError, ReservationToken};
use checkout_types::ports::order_store::OrderStore;
use checkout_types::ports::StoreError;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl Clone for SqliteStore {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

fn db_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn ledger_err(e: impl std::fmt::Display) -> LedgerError {
    LedgerError::Backend(e.to_string())
}

#[derive(FromRow)]
struct DbProduct {
    id: String,
    name: String,
    price_cents: i64,
    stock: i64,
    created_at: String,
    updated_at: String,
}

impl DbProduct {
    fn into_product(self) -> Result<Product, StoreError> {
        Ok(Product {
            id: Uuid::parse_str(&self.id).map_err(db_err)?,
            name: self.name,
            price: Money(self.price_cents),
            stock: u32::try_from(self.stock).map_err(db_err)?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbOrder {
    id: String,
    user_id: String,
    total_cents: i64,
    status: String,
    payment_provider_id: String,
    payment_method_display: Option<String>,
    shipping_address: String,
    items_json: String,
    created_at: String,
    updated_at: String,
}

impl DbOrder {
    fn into_order(self) -> Result<Order, StoreError> {
        let status = OrderStatus::from_str(&self.status).map_err(db_err)?;
        let items: Vec<OrderItem> = serde_json::from_str(&self.items_json).map_err(db_err)?;
        Ok(Order {
            id: Uuid::parse_str(&self.id).map_err(db_err)?,
            user_id: Uuid::parse_str(&self.user_id).map_err(db_err)?,
            items,
            total: Money(self.total_cents),
            status,
            payment_provider_id: self.payment_provider_id,
            payment_method_display: self.payment_method_display,
            shipping_address: self.shipping_address,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(db_err)?
        .with_timezone(&Utc))
}

impl SqliteStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let ddl = include_str!("../migrations/0001_create_checkout.sql");
        for stmt in ddl.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(stmt).execute(&pool).await?;
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn upsert_product(&self, product: Product) -> Result<Product, StoreError> {
        sqlx::query(
            "INSERT INTO products (id, name, price_cents, stock, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 price_cents = excluded.price_cents,
                 stock = excluded.stock,
                 updated_at = excluded.updated_at",
        )
        .bind(product.id.to_string())
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(product.stock as i64)
        .bind(product.created_at.to_rfc3339())
        .bind(product.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(product)
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let row: Option<DbProduct> = sqlx::query_as(
            "SELECT id, name, price_cents, stock, created_at, updated_at FROM products WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(|r| r.into_product()).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows: Vec<DbProduct> = sqlx::query_as(
            "SELECT id, name, price_cents, stock, created_at, updated_at FROM products
             ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(|r| r.into_product()).collect()
    }
}

#[async_trait]
impl InventoryLedger for SqliteStore {
    async fn reserve(
        &self,
        product_id: Uuid,
        qty: u32,
        ttl: chrono::Duration,
    ) -> Result<ReservationToken, LedgerError> {
        self.purge_expired().await?;

        let mut tx = self.pool.begin().await.map_err(ledger_err)?;

        let available: Option<(i64,)> = sqlx::query_as("SELECT stock FROM products WHERE id = ?")
            .bind(product_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(ledger_err)?;
        let Some((available,)) = available else {
            // Roll back before returning: a dropped transaction is rolled
            // back asynchronously, so its lock could outlive this call and
            // make the next pooled connection fail with SQLITE_BUSY.
            let _ = tx.rollback().await;
            return Err(LedgerError::UnknownProduct(product_id));
        };

        // Conditional decrement: atomic per row, so a concurrent
        // reservation can never take the same unit twice.
        let updated = sqlx::query(
            "UPDATE products SET stock = stock - ?, updated_at = ? WHERE id = ? AND stock >= ?",
        )
        .bind(qty as i64)
        .bind(Utc::now().to_rfc3339())
        .bind(product_id.to_string())
        .bind(qty as i64)
        .execute(&mut *tx)
        .await
        .map_err(ledger_err)?;
        if updated.rows_affected() == 0 {
            let _ = tx.rollback().await;
            return Err(LedgerError::InsufficientStock {
                product_id,
                requested: qty,
                available: u32::try_from(available.max(0)).unwrap_or(0),
            });
        }

        let token = ReservationToken::new();
        let expires_at_ms = (Utc::now() + ttl).timestamp_millis();
        sqlx::query(
            "INSERT INTO reservations (token, product_id, qty, expires_at_ms) VALUES (?, ?, ?, ?)",
        )
        .bind(token.0.to_string())
        .bind(product_id.to_string())
        .bind(qty as i64)
        .bind(expires_at_ms)
        .execute(&mut *tx)
        .await
        .map_err(ledger_err)?;

        tx.commit().await.map_err(ledger_err)?;
        Ok(token)
    }

    async fn commit(&self, token: ReservationToken) -> Result<(), LedgerError> {
        self.purge_expired().await?;
        let res = sqlx::query("DELETE FROM reservations WHERE token = ?")
            .bind(token.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(ledger_err)?;
        if res.rows_affected() == 0 {
            return Err(LedgerError::ReservationNotFound(token));
        }
        Ok(())
    }

    async fn release(&self, token: ReservationToken) -> Result<(), LedgerError> {
        let mut tx = self.pool.begin().await.map_err(ledger_err)?;

        let hold: Option<(String, i64)> =
            sqlx::query_as("SELECT product_id, qty FROM reservations WHERE token = ?")
                .bind(token.0.to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(ledger_err)?;
        let Some((product_id, qty)) = hold else {
            let _ = tx.rollback().await;
            return Err(LedgerError::ReservationNotFound(token));
        };

        sqlx::query("DELETE FROM reservations WHERE token = ?")
            .bind(token.0.to_string())
            .execute(&mut *tx)
            .await
            .map_err(ledger_err)?;
        sqlx::query("UPDATE products SET stock = stock + ?, updated_at = ? WHERE id = ?")
            .bind(qty)
            .bind(Utc::now().to_rfc3339())
            .bind(&product_id)
            .execute(&mut *tx)
            .await
            .map_err(ledger_err)?;

        tx.commit().await.map_err(ledger_err)?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, LedgerError> {
        let now_ms = Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await.map_err(ledger_err)?;

        let expired: Vec<(String, String, i64)> = sqlx::query_as(
            "SELECT token, product_id, qty FROM reservations WHERE expires_at_ms <= ?",
        )
        .bind(now_ms)
        .fetch_all(&mut *tx)
        .await
        .map_err(ledger_err)?;

        for (token, product_id, qty) in &expired {
            sqlx::query("UPDATE products SET stock = stock + ?, updated_at = ? WHERE id = ?")
                .bind(qty)
                .bind(Utc::now().to_rfc3339())
                .bind(product_id)
                .execute(&mut *tx)
                .await
                .map_err(ledger_err)?;
            sqlx::query("DELETE FROM reservations WHERE token = ?")
                .bind(token)
                .execute(&mut *tx)
                .await
                .map_err(ledger_err)?;
        }

        tx.commit().await.map_err(ledger_err)?;
        Ok(expired.len() as u64)
    }
}

#[async_trait]
impl CartStore for SqliteStore {
    async fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        qty: u32,
    ) -> Result<Cart, StoreError> {
        sqlx::query(
            "INSERT INTO cart_items (user_id, product_id, quantity) VALUES (?, ?, ?)
             ON CONFLICT(user_id, product_id) DO UPDATE SET
                 quantity = MIN(quantity + excluded.quantity, 4294967295)",
        )
        .bind(user_id.to_string())
        .bind(product_id.to_string())
        .bind(qty as i64)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        self.cart(user_id).await
    }

    async fn set_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        qty: u32,
    ) -> Result<Option<Cart>, StoreError> {
        let res =
            sqlx::query("UPDATE cart_items SET quantity = ? WHERE user_id = ? AND product_id = ?")
                .bind(qty as i64)
                .bind(user_id.to_string())
                .bind(product_id.to_string())
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }
        self.cart(user_id).await.map(Some)
    }

    async fn remove_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Cart>, StoreError> {
        let res = sqlx::query("DELETE FROM cart_items WHERE user_id = ? AND product_id = ?")
            .bind(user_id.to_string())
            .bind(product_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }
        self.cart(user_id).await.map(Some)
    }

    async fn cart(&self, user_id: Uuid) -> Result<Cart, StoreError> {
        // rowid preserves insertion order for lines in the cart.
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT product_id, quantity FROM cart_items WHERE user_id = ? ORDER BY rowid",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut items = Vec::with_capacity(rows.len());
        for (product_id, quantity) in rows {
            items.push(CartItem {
                product_id: Uuid::parse_str(&product_id).map_err(db_err)?,
                quantity: u32::try_from(quantity).map_err(db_err)?,
            });
        }
        Ok(Cart { user_id, items })
    }

    async fn clear_cart(&self, user_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = ?")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for SqliteStore {
    async fn insert_order(&self, order: Order) -> Result<Order, StoreError> {
        let items_json = serde_json::to_string(&order.items).map_err(db_err)?;
        sqlx::query(
            "INSERT INTO orders (id, user_id, total_cents, status, payment_provider_id,
                                 payment_method_display, shipping_address, items_json,
                                 created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(order.id.to_string())
        .bind(order.user_id.to_string())
        .bind(order.total.cents())
        .bind(order.status.to_string())
        .bind(&order.payment_provider_id)
        .bind(&order.payment_method_display)
        .bind(&order.shipping_address)
        .bind(items_json)
        .bind(order.created_at.to_rfc3339())
        .bind(order.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(order)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let row: Option<DbOrder> = sqlx::query_as(
            "SELECT id, user_id, total_cents, status, payment_provider_id,
                    payment_method_display, shipping_address, items_json, created_at, updated_at
             FROM orders WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(|r| r.into_order()).transpose()
    }

    async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let rows: Vec<DbOrder> = sqlx::query_as(
            "SELECT id, user_id, total_cents, status, payment_provider_id,
                    payment_method_display, shipping_address, items_json, created_at, updated_at
             FROM orders WHERE user_id = ? ORDER BY created_at",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(|r| r.into_order()).collect()
    }

    async fn transition_from_pending(
        &self,
        id: Uuid,
        status: OrderStatus,
        payment_method_display: Option<String>,
    ) -> Result<Option<Order>, StoreError> {
        let res = sqlx::query(
            "UPDATE orders
             SET status = ?,
                 payment_method_display = COALESCE(?, payment_method_display),
                 updated_at = ?
             WHERE id = ? AND status = 'PENDING'",
        )
        .bind(status.to_string())
        .bind(payment_method_display)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_order(id).await
    }
}

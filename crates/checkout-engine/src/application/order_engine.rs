use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use checkout_types::domain::order::{Order, OrderItem, OrderStatus};
use checkout_types::domain::provider::FieldValues;
use checkout_types::domain::quote::CheckoutQuote;
use checkout_types::ports::inventory_ledger::ReservationToken;
use checkout_types::ports::providers::ProviderError;

use crate::application::provider_registry::ProviderRegistry;
use crate::application::Storage;
use crate::errors::CheckoutError;

/// Creates orders from accepted quotes and drives them to a terminal
/// status. All stock movement goes through the inventory ledger:
/// `create` reserves, a successful settle commits, every failure path
/// releases.
pub struct OrderEngine<S: Storage> {
    store: S,
    registry: Arc<ProviderRegistry>,
    hold_ttl: chrono::Duration,
    settle_timeout: Duration,
    // Serializes order creation per user so two concurrent placements
    // cannot both pass the cart-match check.
    user_locks: DashMap<Uuid, Arc<Mutex<()>>>,
    holds: DashMap<Uuid, HeldTokens>,
}

struct HeldTokens {
    tokens: Vec<ReservationToken>,
    expires_at: chrono::DateTime<Utc>,
}

impl<S: Storage> OrderEngine<S> {
    pub fn new(
        store: S,
        registry: Arc<ProviderRegistry>,
        hold_ttl: chrono::Duration,
        settle_timeout: Duration,
    ) -> Self {
        Self {
            store,
            registry,
            hold_ttl,
            settle_timeout,
            user_locks: DashMap::new(),
            holds: DashMap::new(),
        }
    }

    /// Turns a consumed quote into a `PENDING` order, reserving stock
    /// for every line. All-or-nothing: if any line cannot be reserved,
    /// the holds already acquired for this attempt are released and no
    /// order exists. The cart is left untouched until settlement.
    pub async fn create(&self, user_id: Uuid, quote: CheckoutQuote) -> Result<Order, CheckoutError> {
        let lock = self
            .user_locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;
        self.evict_stale(Utc::now());

        if quote.user_id != user_id {
            return Err(CheckoutError::NotFound(format!("quote {}", quote.id)));
        }
        if quote.is_expired(Utc::now()) {
            return Err(CheckoutError::QuoteExpired);
        }
        let cart = self.store.cart(user_id).await?;
        if !quote.matches_cart(&cart) {
            return Err(CheckoutError::QuoteExpired);
        }

        let mut tokens = Vec::with_capacity(quote.lines.len());
        for line in &quote.lines {
            match self
                .store
                .reserve(line.product_id, line.quantity, self.hold_ttl)
                .await
            {
                Ok(token) => tokens.push(token),
                Err(err) => {
                    self.release_all(&tokens).await;
                    return Err(err.into());
                }
            }
        }

        let items = quote
            .lines
            .iter()
            .map(|line| OrderItem {
                product_id: line.product_id,
                name: line.name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
            })
            .collect();
        let mut order = match Order::new(
            user_id,
            items,
            quote.total,
            quote.payment_provider_id.clone(),
            quote.shipping_address.clone(),
        ) {
            Ok(order) => order,
            Err(err) => {
                self.release_all(&tokens).await;
                return Err(CheckoutError::Validation(err.to_string()));
            }
        };
        order = match self.store.insert_order(order).await {
            Ok(order) => order,
            Err(err) => {
                self.release_all(&tokens).await;
                return Err(err.into());
            }
        };
        self.holds.insert(
            order.id,
            HeldTokens {
                tokens,
                expires_at: Utc::now() + self.hold_ttl,
            },
        );
        tracing::info!(order_id = %order.id, user_id = %user_id, total = %order.total, "order created");
        Ok(order)
    }

    /// Settles payment for a `PENDING` order. Retry-safe: a terminal
    /// order is returned as-is without touching the provider or stock.
    pub async fn settle(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        input: FieldValues,
    ) -> Result<Order, CheckoutError> {
        let order = self.get(user_id, order_id).await?;
        if order.status.is_terminal() {
            return Ok(order);
        }

        let provider = self
            .registry
            .selectable_payment(&order.payment_provider_id)?;
        // Incomplete input leaves the order PENDING so the caller can
        // correct it and retry.
        let missing = provider.definition().missing_required(&input);
        if !missing.is_empty() {
            return Err(CheckoutError::MissingFields(missing));
        }

        let attempt = tokio::time::timeout(self.settle_timeout, provider.settle(order.total, &input)).await;
        match attempt {
            Ok(Ok(receipt)) => {
                let display = provider.display(&input);
                match self
                    .store
                    .transition_from_pending(order_id, OrderStatus::Paid, Some(display))
                    .await?
                {
                    Some(paid) => {
                        tracing::info!(
                            order_id = %order_id,
                            reference = %receipt.reference,
                            "settlement accepted"
                        );
                        self.commit_holds(order_id).await;
                        self.store.clear_cart(user_id).await?;
                        Ok(paid)
                    }
                    // Lost the race against a concurrent settle, cancel,
                    // or timeout; the winner already moved the stock.
                    None => self.get(user_id, order_id).await,
                }
            }
            Ok(Err(ProviderError::MissingFields(fields))) => {
                Err(CheckoutError::MissingFields(fields))
            }
            Ok(Err(ProviderError::Declined(reason))) => {
                if self
                    .store
                    .transition_from_pending(order_id, OrderStatus::Failed, None)
                    .await?
                    .is_some()
                {
                    tracing::warn!(order_id = %order_id, reason = %reason, "settlement declined");
                    self.release_holds(order_id).await;
                }
                Err(CheckoutError::ProviderDeclined(reason))
            }
            Err(_elapsed) => {
                if self
                    .store
                    .transition_from_pending(order_id, OrderStatus::Failed, None)
                    .await?
                    .is_some()
                {
                    tracing::warn!(order_id = %order_id, "settlement timed out");
                    self.release_holds(order_id).await;
                }
                Err(CheckoutError::ProviderTimeout)
            }
        }
    }

    /// Cancels a `PENDING` order, restoring stock. Cancelling an
    /// already cancelled order is a no-op; a `PAID` or `FAILED` order
    /// cannot be cancelled.
    pub async fn cancel(&self, user_id: Uuid, order_id: Uuid) -> Result<Order, CheckoutError> {
        // Owner check before any transition attempt.
        self.get(user_id, order_id).await?;
        match self
            .store
            .transition_from_pending(order_id, OrderStatus::Cancelled, None)
            .await?
        {
            Some(cancelled) => {
                tracing::info!(order_id = %order_id, "order cancelled");
                self.release_holds(order_id).await;
                Ok(cancelled)
            }
            None => {
                let current = self.get(user_id, order_id).await?;
                if current.status == OrderStatus::Cancelled {
                    Ok(current)
                } else {
                    Err(CheckoutError::InvalidState(current.status))
                }
            }
        }
    }

    pub async fn get(&self, user_id: Uuid, order_id: Uuid) -> Result<Order, CheckoutError> {
        match self.store.get_order(order_id).await? {
            Some(order) if order.user_id == user_id => Ok(order),
            _ => Err(CheckoutError::NotFound(format!("order {order_id}"))),
        }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Order>, CheckoutError> {
        Ok(self.store.list_orders_for_user(user_id).await?)
    }

    async fn commit_holds(&self, order_id: Uuid) {
        let Some((_, hold)) = self.holds.remove(&order_id) else {
            return;
        };
        for token in hold.tokens {
            if let Err(err) = self.store.commit(token).await {
                // The hold may have expired and been purged, which
                // restored its units to the shelf; the order stays
                // PAID and that stock is sellable again.
                tracing::warn!(order_id = %order_id, error = %err, "commit of reservation failed");
            }
        }
    }

    async fn release_holds(&self, order_id: Uuid) {
        let Some((_, hold)) = self.holds.remove(&order_id) else {
            return;
        };
        self.release_all(&hold.tokens).await;
    }

    // Lapsed entries are dead weight; the ledger restored that stock
    // when the underlying reservations expired. Idle per-user locks
    // (no clone held outside the map) go with them.
    fn evict_stale(&self, now: chrono::DateTime<Utc>) {
        self.holds.retain(|_, hold| hold.expires_at > now);
        self.user_locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    async fn release_all(&self, tokens: &[ReservationToken]) {
        for token in tokens {
            if let Err(err) = self.store.release(*token).await {
                tracing::warn!(error = %err, "release of reservation failed");
            }
        }
    }
}

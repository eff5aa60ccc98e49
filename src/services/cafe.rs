//! Cafe menu and ordering
use crate::config::PricingConfig;
use crate::core::pricing::{self, Quote};
use crate::core::repository::{MenuItemUpdate, NewMenuItem, NewOrder, Page, Repositories};
use crate::core::types::*;
use crate::core::{DomainError, DomainResult};
use crate::email::templates;
use crate::notify::{ADMIN_CHANNEL, user_channel};
use crate::payments::{PaymentIntent, PaymentTarget};
use crate::services::{Actor, Integrations, audit, send_email};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

const MAX_QUANTITY: i32 = 50;
const MAX_NOTES_LEN: usize = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemRequest {
    pub menu_item_id: MenuItemId,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderRequest {
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderQuote {
    pub lines: Vec<OrderLine>,
    #[serde(flatten)]
    pub quote: Quote,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderPlaced {
    pub order: Order,
    pub payment: Option<PaymentIntent>,
}

pub struct CafeService {
    repos: Repositories,
    integrations: Integrations,
    pricing: PricingConfig,
}

impl CafeService {
    pub fn new(repos: Repositories, integrations: Integrations, pricing: PricingConfig) -> Self {
        Self { repos, integrations, pricing }
    }

    pub async fn menu(&self, available_only: bool) -> DomainResult<Vec<MenuItem>> {
        Ok(self.repos.menu.list(available_only).await?)
    }

    /// Resolve requested items into priced lines; duplicates are merged
    async fn lines(&self, request: &OrderRequest) -> DomainResult<Vec<OrderLine>> {
        if request.items.is_empty() {
            return Err(DomainError::Validation("an order needs at least one item".into()));
        }

        let mut quantities: BTreeMap<MenuItemId, i32> = BTreeMap::new();
        for item in &request.items {
            if item.quantity < 1 {
                return Err(DomainError::Validation("quantity must be at least 1".into()));
            }
            let merged = quantities.entry(item.menu_item_id).or_default();
            *merged = merged.saturating_add(item.quantity);
            if *merged > MAX_QUANTITY {
                return Err(DomainError::Validation(format!(
                    "quantity per item is limited to {MAX_QUANTITY}"
                )));
            }
        }

        let ids: Vec<MenuItemId> = quantities.keys().copied().collect();
        let items = self.repos.menu.get_many(&ids).await?;

        let mut lines = Vec::with_capacity(ids.len());
        for (id, quantity) in quantities {
            let item = items
                .iter()
                .find(|m| m.id == id)
                .filter(|m| m.is_available)
                .ok_or_else(|| DomainError::Validation(format!("menu item {id} is not available")))?;
            lines.push(OrderLine {
                menu_item_id: id,
                name: item.name.clone(),
                quantity,
                unit_price_cents: item.price_cents,
            });
        }
        Ok(lines)
    }

    fn price(&self, user: &User, lines: &[OrderLine]) -> Quote {
        let priced: Vec<(Cents, i32)> = lines.iter().map(|l| (l.unit_price_cents, l.quantity)).collect();
        pricing::quote_cafe(&priced, user.is_nft_holder, &self.pricing)
    }

    pub async fn quote(&self, user: &User, request: OrderRequest) -> DomainResult<OrderQuote> {
        let lines = self.lines(&request).await?;
        let quote = self.price(user, &lines);
        Ok(OrderQuote { lines, quote })
    }

    pub async fn place(&self, user: &User, request: OrderRequest, actor: &Actor) -> DomainResult<OrderPlaced> {
        let notes = request.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);
        if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
            return Err(DomainError::Validation(format!(
                "notes are limited to {MAX_NOTES_LEN} characters"
            )));
        }

        let lines = self.lines(&request).await?;
        let quote = self.price(user, &lines);
        let free = quote.total_cents == 0;

        let mut order = self
            .repos
            .orders
            .create(NewOrder {
                user_id: user.id,
                lines,
                subtotal_cents: quote.base_cents,
                discount_cents: quote.discount_cents,
                fee_cents: quote.fee_cents,
                total_cents: quote.total_cents,
                payment_status: if free { PaymentStatus::NotRequired } else { PaymentStatus::Unpaid },
                notes,
            })
            .await?;

        let mut payment = None;
        if let (false, Some(gateway)) = (free, &self.integrations.payments) {
            let intent = gateway
                .create_intent(
                    order.total_cents,
                    self.pricing.currency,
                    PaymentTarget::Order(order.id),
                    Some(user.email.clone()),
                )
                .await;
            match intent {
                Ok(intent) => {
                    order = self
                        .repos
                        .orders
                        .set_payment(order.id, PaymentStatus::Unpaid, Some(intent.id.clone()))
                        .await?;
                    payment = Some(intent);
                },
                Err(e) => {
                    warn!(order_id = %order.id, "Payment intent failed, cancelling order: {}", e);
                    if let Err(cancel) = self
                        .repos
                        .orders
                        .update_status(order.id, OrderStatus::Pending, OrderStatus::Cancelled)
                        .await
                    {
                        warn!(order_id = %order.id, "Failed to cancel order: {}", cancel);
                    }
                    return Err(e.into());
                },
            }
        }

        info!(order_id = %order.id, total_cents = order.total_cents, lines = order.lines.len(), "Order placed");
        crate::metrics::incr("orders.created");

        self.integrations
            .notifier
            .publish(ADMIN_CHANNEL, "order.created", json!({ "order": &order, "customer": user.name }))
            .await;
        send_email(
            self.integrations.email.as_ref(),
            templates::order_receipt(user, &order, self.pricing.currency),
        )
        .await;
        audit(
            self.repos.audit.as_ref(),
            actor,
            "order.create",
            "order",
            Some(order.id.to_string()),
            json!({ "total_cents": order.total_cents }),
        )
        .await;

        Ok(OrderPlaced { order, payment })
    }

    pub async fn list_for_user(&self, user: &User, page: Page) -> DomainResult<Vec<Order>> {
        Ok(self.repos.orders.list_for_user(user.id, page.clamped()).await?)
    }

    pub async fn list(&self, status: Option<OrderStatus>, page: Page) -> DomainResult<Vec<Order>> {
        Ok(self.repos.orders.list(status, page.clamped()).await?)
    }

    async fn order(&self, id: OrderId) -> DomainResult<Order> {
        self.repos
            .orders
            .get(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("order {id}")))
    }

    /// Kitchen workflow; cancelling a paid order refunds it
    pub async fn update_status(&self, id: OrderId, next: OrderStatus, actor: &Actor) -> DomainResult<Order> {
        let order = self.order(id).await?;
        if !order.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: order.status.to_string(),
                to: next.to_string(),
            });
        }

        let mut updated = self.repos.orders.update_status(id, order.status, next).await?;
        if next == OrderStatus::Cancelled && updated.payment_status == PaymentStatus::Paid {
            updated = match self.refund(updated.clone()).await {
                Ok(refunded) => refunded,
                Err(e) => {
                    error!(order_id = %id, "Refund failed for cancelled order: {}", e);
                    crate::metrics::incr("orders.refund_failed");
                    updated
                },
            };
        }

        self.integrations
            .notifier
            .publish(
                &user_channel(updated.user_id),
                "order.status",
                json!({ "order_id": id, "status": next }),
            )
            .await;
        audit(
            self.repos.audit.as_ref(),
            actor,
            "order.status",
            "order",
            Some(id.to_string()),
            json!({ "from": order.status, "to": next }),
        )
        .await;
        Ok(updated)
    }

    async fn refund(&self, order: Order) -> DomainResult<Order> {
        let Some(gateway) = &self.integrations.payments else {
            warn!(order_id = %order.id, "No payment gateway to refund through");
            return Ok(order);
        };
        let Some(intent_id) = order.payment_intent_id.clone() else {
            warn!(order_id = %order.id, "Paid order has no payment intent to refund");
            return Ok(order);
        };
        gateway.refund(&intent_id).await?;
        info!(order_id = %order.id, "Order refunded");
        Ok(self.repos.orders.set_payment(order.id, PaymentStatus::Refunded, None).await?)
    }

    /// Record a successful payment; replays are no-ops
    pub async fn mark_paid(&self, id: OrderId, intent_id: &str) -> DomainResult<Order> {
        let order = self.order(id).await?;
        let cancelled = order.status == OrderStatus::Cancelled;
        match order.payment_status {
            PaymentStatus::Refunded => {
                debug!(order_id = %id, "Payment already refunded");
                return Ok(order);
            },
            PaymentStatus::Paid if !cancelled => {
                debug!(order_id = %id, "Payment already recorded");
                return Ok(order);
            },
            _ => {},
        }
        let order = if order.payment_status == PaymentStatus::Paid {
            order
        } else {
            crate::metrics::incr("orders.paid");
            self.repos
                .orders
                .set_payment(id, PaymentStatus::Paid, Some(intent_id.to_string()))
                .await?
        };
        if cancelled {
            warn!(order_id = %id, "Payment arrived for a cancelled order, refunding");
            return self.refund(order).await;
        }
        self.integrations
            .notifier
            .publish(ADMIN_CHANNEL, "order.paid", json!({ "order_id": id }))
            .await;
        Ok(order)
    }

    pub async fn create_item(&self, item: NewMenuItem, actor: &Actor) -> DomainResult<MenuItem> {
        if item.name.trim().is_empty() {
            return Err(DomainError::Validation("name is required".into()));
        }
        if item.price_cents < 0 {
            return Err(DomainError::Validation("price cannot be negative".into()));
        }
        let created = self.repos.menu.create(item).await?;
        audit(
            self.repos.audit.as_ref(),
            actor,
            "menu.create",
            "menu_item",
            Some(created.id.to_string()),
            json!({ "name": created.name, "price_cents": created.price_cents }),
        )
        .await;
        Ok(created)
    }

    pub async fn update_item(
        &self,
        id: MenuItemId,
        update: MenuItemUpdate,
        actor: &Actor,
    ) -> DomainResult<MenuItem> {
        if update.price_cents.is_some_and(|p| p < 0) {
            return Err(DomainError::Validation("price cannot be negative".into()));
        }
        let updated = self.repos.menu.update(id, update).await?;
        audit(
            self.repos.audit.as_ref(),
            actor,
            "menu.update",
            "menu_item",
            Some(id.to_string()),
            json!({ "price_cents": updated.price_cents, "is_available": updated.is_available }),
        )
        .await;
        Ok(updated)
    }
}

//! PostgreSQL menu and order repositories
use crate::core::repository::{
    MenuItemUpdate, MenuRepository, NewMenuItem, NewOrder, OrderRepository, Page, Result,
    RepositoryError,
};
use crate::core::types::{
    Cents, MenuItem, MenuItemId, Order, OrderId, OrderLine, OrderStatus, PaymentStatus, UserId,
};
use crate::database::client::Database;
use crate::database::models::{MenuItemRow, OrderLineRow, OrderRow};
use crate::database::postgres::not_found;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

const MENU_COLUMNS: &str = "id, name, description, category, price_cents, is_available";

const ORDER_COLUMNS: &str = "id, user_id, status, subtotal_cents, discount_cents, fee_cents, \
     total_cents, payment_status, payment_intent_id, notes, created_at";

pub struct PostgresMenuRepository {
    db: Arc<Database>,
}

impl PostgresMenuRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MenuRepository for PostgresMenuRepository {
    async fn list(&self, available_only: bool) -> Result<Vec<MenuItem>> {
        let sql = format!(
            "SELECT {MENU_COLUMNS} FROM menu_items
             WHERE ($1 = FALSE OR is_available)
             ORDER BY category, name"
        );
        let rows: Vec<MenuItemRow> =
            sqlx::query_as(&sql).bind(available_only).fetch_all(&self.db.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_many(&self, ids: &[MenuItemId]) -> Result<Vec<MenuItem>> {
        let ids: Vec<Uuid> = ids.iter().map(|id| id.value()).collect();
        let sql = format!("SELECT {MENU_COLUMNS} FROM menu_items WHERE id = ANY($1)");
        let rows: Vec<MenuItemRow> = sqlx::query_as(&sql).bind(&ids).fetch_all(&self.db.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create(&self, item: NewMenuItem) -> Result<MenuItem> {
        let sql = format!(
            "INSERT INTO menu_items (id, name, description, category, price_cents)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {MENU_COLUMNS}"
        );
        let row: MenuItemRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(&item.name)
            .bind(&item.description)
            .bind(&item.category)
            .bind(item.price_cents)
            .fetch_one(&self.db.pool)
            .await?;
        Ok(row.into())
    }

    async fn update(&self, id: MenuItemId, update: MenuItemUpdate) -> Result<MenuItem> {
        let sql = format!(
            "UPDATE menu_items SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                price_cents = COALESCE($5, price_cents),
                is_available = COALESCE($6, is_available)
             WHERE id = $1
             RETURNING {MENU_COLUMNS}"
        );
        let row: Option<MenuItemRow> = sqlx::query_as(&sql)
            .bind(id.value())
            .bind(update.name)
            .bind(update.description)
            .bind(update.category)
            .bind(update.price_cents)
            .bind(update.is_available)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(row.ok_or_else(|| not_found("menu item", id))?.into())
    }
}

pub struct PostgresOrderRepository {
    db: Arc<Database>,
}

impl PostgresOrderRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Attach line items to a batch of order rows with a single query
    async fn hydrate(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let lines: Vec<OrderLineRow> = sqlx::query_as(
            "SELECT order_id, menu_item_id, name, quantity, unit_price_cents
             FROM order_items WHERE order_id = ANY($1)
             ORDER BY order_id, position",
        )
        .bind(&ids)
        .fetch_all(&self.db.pool)
        .await?;

        let mut by_order: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
        for line in lines {
            by_order.entry(line.order_id).or_default().push(line.into());
        }

        rows.into_iter()
            .map(|row| {
                let lines = by_order.remove(&row.id).unwrap_or_default();
                row.into_order(lines)
            })
            .collect()
    }

    async fn hydrate_one(&self, row: OrderRow) -> Result<Order> {
        self.hydrate(vec![row])
            .await?
            .pop()
            .ok_or_else(|| RepositoryError::Serialization("order hydration returned nothing".into()))
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn create(&self, order: NewOrder) -> Result<Order> {
        let mut tx = self.db.pool.begin().await?;

        let sql = format!(
            "INSERT INTO orders (id, user_id, status, subtotal_cents, discount_cents, fee_cents,
                 total_cents, payment_status, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {ORDER_COLUMNS}"
        );
        let row: OrderRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(order.user_id.value())
            .bind(OrderStatus::Pending.as_str())
            .bind(order.subtotal_cents)
            .bind(order.discount_cents)
            .bind(order.fee_cents)
            .bind(order.total_cents)
            .bind(order.payment_status.as_str())
            .bind(&order.notes)
            .fetch_one(&mut *tx)
            .await?;

        for (position, line) in order.lines.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_items
                     (id, order_id, menu_item_id, name, quantity, unit_price_cents, position)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(Uuid::new_v4())
            .bind(row.id)
            .bind(line.menu_item_id.value())
            .bind(&line.name)
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        row.into_order(order.lines)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row: Option<OrderRow> =
            sqlx::query_as(&sql).bind(id.value()).fetch_optional(&self.db.pool).await?;
        match row {
            Some(row) => Ok(Some(self.hydrate_one(row).await?)),
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: UserId, page: Page) -> Result<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(user_id.value())
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.db.pool)
            .await?;
        self.hydrate(rows).await
    }

    async fn list(&self, status: Option<OrderStatus>, page: Page) -> Result<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE ($1::TEXT IS NULL OR status = $1)
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(status.map(|s| s.as_str()))
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.db.pool)
            .await?;
        self.hydrate(rows).await
    }

    async fn update_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order> {
        let sql = format!(
            "UPDATE orders SET status = $3 WHERE id = $1 AND status = $2 RETURNING {ORDER_COLUMNS}"
        );
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id.value())
            .bind(expected.as_str())
            .bind(next.as_str())
            .fetch_optional(&self.db.pool)
            .await?;
        match row {
            Some(row) => self.hydrate_one(row).await,
            None => {
                let exists: Option<String> =
                    sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
                        .bind(id.value())
                        .fetch_optional(&self.db.pool)
                        .await?;
                Err(match exists {
                    Some(status) => RepositoryError::Conflict(format!("order {id} is already {status}")),
                    None => not_found("order", id),
                })
            },
        }
    }

    async fn set_payment(
        &self,
        id: OrderId,
        payment_status: PaymentStatus,
        payment_intent_id: Option<String>,
    ) -> Result<Order> {
        let sql = format!(
            "UPDATE orders
             SET payment_status = $2, payment_intent_id = COALESCE($3, payment_intent_id)
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        );
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id.value())
            .bind(payment_status.as_str())
            .bind(payment_intent_id)
            .fetch_optional(&self.db.pool)
            .await?;
        self.hydrate_one(row.ok_or_else(|| not_found("order", id))?).await
    }

    async fn count_with_status(&self, status: OrderStatus) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&self.db.pool)
            .await?;
        Ok(count)
    }

    async fn revenue_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Cents> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_cents), 0)::BIGINT FROM orders
             WHERE payment_status = 'paid' AND created_at >= $1 AND created_at < $2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(total)
    }
}

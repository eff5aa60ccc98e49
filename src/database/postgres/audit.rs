//! PostgreSQL audit log repository
use crate::core::repository::{AuditLogRepository, NewAuditLog, Page, Result};
use crate::core::types::AuditLog;
use crate::database::client::Database;
use crate::database::models::AuditLogRow;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

pub struct PostgresAuditLogRepository {
    db: Arc<Database>,
}

impl PostgresAuditLogRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn record(&self, entry: NewAuditLog) -> Result<()> {
        sqlx::query(
            "INSERT INTO audit_logs (id, actor_id, action, entity_type, entity_id, details, ip_address)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::new_v4())
        .bind(entry.actor_id.map(|id| id.value()))
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.details)
        .bind(&entry.ip_address)
        .execute(&self.db.pool)
        .await?;
        Ok(())
    }

    async fn list(&self, page: Page) -> Result<Vec<AuditLog>> {
        let rows: Vec<AuditLogRow> = sqlx::query_as(
            "SELECT id, actor_id, action, entity_type, entity_id, details, ip_address, created_at
             FROM audit_logs ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

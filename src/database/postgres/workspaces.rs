//! PostgreSQL workspace repository
use crate::core::repository::{NewWorkspace, Result, WorkspaceRepository, WorkspaceUpdate};
use crate::core::types::{Workspace, WorkspaceId};
use crate::database::client::Database;
use crate::database::models::{WorkspaceRow, convert_all};
use crate::database::postgres::not_found;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

const WORKSPACE_COLUMNS: &str =
    "id, name, kind, description, capacity, hourly_rate_cents, daily_rate_cents, is_active, created_at";

pub struct PostgresWorkspaceRepository {
    db: Arc<Database>,
}

impl PostgresWorkspaceRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WorkspaceRepository for PostgresWorkspaceRepository {
    async fn list(&self, active_only: bool) -> Result<Vec<Workspace>> {
        let sql = format!(
            "SELECT {WORKSPACE_COLUMNS} FROM workspaces
             WHERE ($1 = FALSE OR is_active)
             ORDER BY kind, name"
        );
        let rows: Vec<WorkspaceRow> =
            sqlx::query_as(&sql).bind(active_only).fetch_all(&self.db.pool).await?;
        convert_all(rows)
    }

    async fn get(&self, id: WorkspaceId) -> Result<Option<Workspace>> {
        let sql = format!("SELECT {WORKSPACE_COLUMNS} FROM workspaces WHERE id = $1");
        let row: Option<WorkspaceRow> =
            sqlx::query_as(&sql).bind(id.value()).fetch_optional(&self.db.pool).await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn create(&self, workspace: NewWorkspace) -> Result<Workspace> {
        let sql = format!(
            "INSERT INTO workspaces (id, name, kind, description, capacity, hourly_rate_cents, daily_rate_cents)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {WORKSPACE_COLUMNS}"
        );
        let row: WorkspaceRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(&workspace.name)
            .bind(workspace.kind.as_str())
            .bind(&workspace.description)
            .bind(workspace.capacity)
            .bind(workspace.hourly_rate_cents)
            .bind(workspace.daily_rate_cents)
            .fetch_one(&self.db.pool)
            .await?;
        row.try_into()
    }

    async fn update(&self, id: WorkspaceId, update: WorkspaceUpdate) -> Result<Workspace> {
        let sql = format!(
            "UPDATE workspaces SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                capacity = COALESCE($4, capacity),
                hourly_rate_cents = COALESCE($5, hourly_rate_cents),
                daily_rate_cents = COALESCE($6, daily_rate_cents),
                is_active = COALESCE($7, is_active)
             WHERE id = $1
             RETURNING {WORKSPACE_COLUMNS}"
        );
        let row: Option<WorkspaceRow> = sqlx::query_as(&sql)
            .bind(id.value())
            .bind(update.name)
            .bind(update.description)
            .bind(update.capacity)
            .bind(update.hourly_rate_cents)
            .bind(update.daily_rate_cents)
            .bind(update.is_active)
            .fetch_optional(&self.db.pool)
            .await?;
        row.ok_or_else(|| not_found("workspace", id))?.try_into()
    }
}

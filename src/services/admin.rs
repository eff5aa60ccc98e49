//! Admin dashboard, user listing and workspace management
use crate::config::BookingConfig;
use crate::core::repository::{NewWorkspace, Page, Repositories, WorkspaceUpdate};
use crate::core::types::*;
use crate::core::{DomainError, DomainResult};
use crate::services::{Actor, audit, local_now};
use chrono::{DateTime, Datelike, Duration, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_users: i64,
    pub bookings_today: i64,
    pub pending_orders: i64,
    pub revenue_month_cents: Cents,
    pub new_contacts: i64,
    pub active_subscribers: i64,
}

/// Start of the local calendar month, as a UTC instant
fn month_start(local: NaiveDateTime, utc_offset_minutes: i32) -> DateTime<Utc> {
    let first = local.date().with_day(1).unwrap_or(local.date());
    let start = first.and_hms_opt(0, 0, 0).unwrap_or(local);
    Utc.from_utc_datetime(&(start - Duration::minutes(utc_offset_minutes as i64)))
}

fn check_workspace(capacity: Option<i32>, hourly: Option<Cents>, daily: Option<Cents>) -> DomainResult<()> {
    if capacity.is_some_and(|c| c < 1) {
        return Err(DomainError::Validation("capacity must be at least 1".into()));
    }
    if hourly.is_some_and(|r| r < 0) || daily.is_some_and(|r| r < 0) {
        return Err(DomainError::Validation("rates cannot be negative".into()));
    }
    Ok(())
}

pub struct AdminService {
    repos: Repositories,
    config: BookingConfig,
}

impl AdminService {
    pub fn new(repos: Repositories, config: BookingConfig) -> Self {
        Self { repos, config }
    }

    pub async fn dashboard(&self) -> DomainResult<DashboardStats> {
        let now_local = local_now(&self.config);
        let from = month_start(now_local, self.config.utc_offset_minutes);
        let to = Utc::now();

        let (total_users, bookings_today, pending_orders, booking_revenue, order_revenue, new_contacts, active_subscribers) =
            tokio::try_join!(
                self.repos.users.count(),
                self.repos.bookings.count_on(now_local.date()),
                self.repos.orders.count_with_status(OrderStatus::Pending),
                self.repos.bookings.revenue_between(from, to),
                self.repos.orders.revenue_between(from, to),
                self.repos.contacts.count_with_status(ContactStatus::New),
                self.repos.newsletter.count_active(),
            )?;

        Ok(DashboardStats {
            total_users,
            bookings_today,
            pending_orders,
            revenue_month_cents: booking_revenue + order_revenue,
            new_contacts,
            active_subscribers,
        })
    }

    pub async fn users(&self, page: Page) -> DomainResult<Vec<User>> {
        Ok(self.repos.users.list(page.clamped()).await?)
    }

    pub async fn audit_log(&self, page: Page) -> DomainResult<Vec<AuditLog>> {
        Ok(self.repos.audit.list(page.clamped()).await?)
    }

    /// Every workspace, inactive ones included
    pub async fn workspaces(&self) -> DomainResult<Vec<Workspace>> {
        Ok(self.repos.workspaces.list(false).await?)
    }

    pub async fn create_workspace(&self, workspace: NewWorkspace, actor: &Actor) -> DomainResult<Workspace> {
        if workspace.name.trim().is_empty() {
            return Err(DomainError::Validation("name is required".into()));
        }
        check_workspace(Some(workspace.capacity), Some(workspace.hourly_rate_cents), workspace.daily_rate_cents)?;

        let created = self.repos.workspaces.create(workspace).await?;
        info!(workspace_id = %created.id, kind = %created.kind, "Workspace created");
        audit(
            self.repos.audit.as_ref(),
            actor,
            "workspace.create",
            "workspace",
            Some(created.id.to_string()),
            json!({ "name": created.name, "kind": created.kind }),
        )
        .await;
        Ok(created)
    }

    pub async fn update_workspace(
        &self,
        id: WorkspaceId,
        update: WorkspaceUpdate,
        actor: &Actor,
    ) -> DomainResult<Workspace> {
        if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(DomainError::Validation("name cannot be empty".into()));
        }
        check_workspace(update.capacity, update.hourly_rate_cents, update.daily_rate_cents)?;

        let updated = self.repos.workspaces.update(id, update).await?;
        audit(
            self.repos.audit.as_ref(),
            actor,
            "workspace.update",
            "workspace",
            Some(id.to_string()),
            json!({ "is_active": updated.is_active, "hourly_rate_cents": updated.hourly_rate_cents }),
        )
        .await;
        Ok(updated)
    }
}

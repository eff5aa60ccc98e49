//! Back-office endpoints; every handler requires the admin role
use super::{StatusChange, StatusFilter};
use crate::api::ApiState;
use crate::api::error::ApiResult;
use crate::api::extract::{AdminUser, Body, Id, Params};
use crate::core::repository::{
    BookingFilter, MenuItemUpdate, NewMenuItem, NewWorkspace, Page, PostUpdate, WorkspaceUpdate,
};
use crate::core::types::*;
use crate::services::content::PostDraft;
use crate::services::{CreditGrant, DashboardStats};
use axum::{Json, extract::State, http::StatusCode};
use uuid::Uuid;

pub async fn dashboard(State(state): State<ApiState>, _admin: AdminUser) -> ApiResult<Json<DashboardStats>> {
    Ok(Json(state.services.admin.dashboard().await?))
}

pub async fn bookings(
    State(state): State<ApiState>,
    _admin: AdminUser,
    Params(filter): Params<BookingFilter>,
    Params(page): Params<Page>,
) -> ApiResult<Json<Vec<Booking>>> {
    Ok(Json(state.services.bookings.list(filter, page).await?))
}

pub async fn update_booking(
    State(state): State<ApiState>,
    admin: AdminUser,
    Id(id): Id<BookingId>,
    Body(change): Body<StatusChange<BookingStatus>>,
) -> ApiResult<Json<Booking>> {
    Ok(Json(state.services.bookings.update_status(id, change.status, &admin.actor()).await?))
}

pub async fn orders(
    State(state): State<ApiState>,
    _admin: AdminUser,
    Params(filter): Params<StatusFilter<OrderStatus>>,
    Params(page): Params<Page>,
) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.services.cafe.list(filter.status, page).await?))
}

pub async fn update_order(
    State(state): State<ApiState>,
    admin: AdminUser,
    Id(id): Id<OrderId>,
    Body(change): Body<StatusChange<OrderStatus>>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.services.cafe.update_status(id, change.status, &admin.actor()).await?))
}

pub async fn grant_credits(
    State(state): State<ApiState>,
    admin: AdminUser,
    Body(grant): Body<CreditGrant>,
) -> ApiResult<(StatusCode, Json<MembershipCredit>)> {
    let credit = state.services.credits.grant(grant, &admin.actor()).await?;
    Ok((StatusCode::CREATED, Json(credit)))
}

pub async fn users(
    State(state): State<ApiState>,
    _admin: AdminUser,
    Params(page): Params<Page>,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.services.admin.users(page).await?))
}

pub async fn contacts(
    State(state): State<ApiState>,
    _admin: AdminUser,
    Params(filter): Params<StatusFilter<ContactStatus>>,
    Params(page): Params<Page>,
) -> ApiResult<Json<Vec<ContactSubmission>>> {
    Ok(Json(state.services.content.contacts(filter.status, page).await?))
}

pub async fn update_contact(
    State(state): State<ApiState>,
    admin: AdminUser,
    Id(id): Id<Uuid>,
    Body(change): Body<StatusChange<ContactStatus>>,
) -> ApiResult<Json<ContactSubmission>> {
    Ok(Json(state.services.content.update_contact(id, change.status, &admin.actor()).await?))
}

pub async fn audit_log(
    State(state): State<ApiState>,
    _admin: AdminUser,
    Params(page): Params<Page>,
) -> ApiResult<Json<Vec<AuditLog>>> {
    Ok(Json(state.services.admin.audit_log(page).await?))
}

pub async fn workspaces(State(state): State<ApiState>, _admin: AdminUser) -> ApiResult<Json<Vec<Workspace>>> {
    Ok(Json(state.services.admin.workspaces().await?))
}

pub async fn create_workspace(
    State(state): State<ApiState>,
    admin: AdminUser,
    Body(workspace): Body<NewWorkspace>,
) -> ApiResult<(StatusCode, Json<Workspace>)> {
    let created = state.services.admin.create_workspace(workspace, &admin.actor()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_workspace(
    State(state): State<ApiState>,
    admin: AdminUser,
    Id(id): Id<WorkspaceId>,
    Body(update): Body<WorkspaceUpdate>,
) -> ApiResult<Json<Workspace>> {
    Ok(Json(state.services.admin.update_workspace(id, update, &admin.actor()).await?))
}

pub async fn menu(State(state): State<ApiState>, _admin: AdminUser) -> ApiResult<Json<Vec<MenuItem>>> {
    Ok(Json(state.services.cafe.menu(false).await?))
}

pub async fn create_menu_item(
    State(state): State<ApiState>,
    admin: AdminUser,
    Body(item): Body<NewMenuItem>,
) -> ApiResult<(StatusCode, Json<MenuItem>)> {
    let created = state.services.cafe.create_item(item, &admin.actor()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_menu_item(
    State(state): State<ApiState>,
    admin: AdminUser,
    Id(id): Id<MenuItemId>,
    Body(update): Body<MenuItemUpdate>,
) -> ApiResult<Json<MenuItem>> {
    Ok(Json(state.services.cafe.update_item(id, update, &admin.actor()).await?))
}

pub async fn posts(
    State(state): State<ApiState>,
    _admin: AdminUser,
    Params(page): Params<Page>,
) -> ApiResult<Json<Vec<BlogPost>>> {
    Ok(Json(state.services.content.all_posts(page).await?))
}

pub async fn create_post(
    State(state): State<ApiState>,
    admin: AdminUser,
    Body(draft): Body<PostDraft>,
) -> ApiResult<(StatusCode, Json<BlogPost>)> {
    let post = state.services.content.create_post(draft, &admin.actor()).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post(
    State(state): State<ApiState>,
    admin: AdminUser,
    Id(id): Id<PostId>,
    Body(update): Body<PostUpdate>,
) -> ApiResult<Json<BlogPost>> {
    Ok(Json(state.services.content.update_post(id, update, &admin.actor()).await?))
}

pub async fn subscribers(
    State(state): State<ApiState>,
    _admin: AdminUser,
    Params(page): Params<Page>,
) -> ApiResult<Json<Vec<NewsletterSubscriber>>> {
    Ok(Json(state.services.content.subscribers(page).await?))
}

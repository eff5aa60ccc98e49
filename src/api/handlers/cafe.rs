use crate::api::ApiState;
use crate::api::error::ApiResult;
use crate::api::extract::{AuthUser, Body, Params};
use crate::core::repository::Page;
use crate::core::types::{MenuItem, Order};
use crate::services::cafe::OrderQuote;
use crate::services::{OrderPlaced, OrderRequest};
use axum::{Json, extract::State, http::StatusCode};

pub async fn menu(State(state): State<ApiState>) -> ApiResult<Json<Vec<MenuItem>>> {
    Ok(Json(state.services.cafe.menu(true).await?))
}

pub async fn quote(
    State(state): State<ApiState>,
    auth: AuthUser,
    Body(request): Body<OrderRequest>,
) -> ApiResult<Json<OrderQuote>> {
    Ok(Json(state.services.cafe.quote(&auth.user, request).await?))
}

pub async fn place(
    State(state): State<ApiState>,
    auth: AuthUser,
    Body(request): Body<OrderRequest>,
) -> ApiResult<(StatusCode, Json<OrderPlaced>)> {
    let placed = state.services.cafe.place(&auth.user, request, &auth.actor()).await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

pub async fn list(
    State(state): State<ApiState>,
    auth: AuthUser,
    Params(page): Params<Page>,
) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.services.cafe.list_for_user(&auth.user, page).await?))
}

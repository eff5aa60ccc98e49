use crate::api::ApiState;
use crate::api::error::ApiResult;
use crate::api::extract::{Id, Params};
use crate::core::types::{Workspace, WorkspaceId};
use crate::services::booking::DayAvailability;
use axum::{Json, extract::State};
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
}

pub async fn list(State(state): State<ApiState>) -> ApiResult<Json<Vec<Workspace>>> {
    Ok(Json(state.services.bookings.workspaces().await?))
}

pub async fn get(State(state): State<ApiState>, Id(id): Id<WorkspaceId>) -> ApiResult<Json<Workspace>> {
    Ok(Json(state.services.bookings.get_workspace(id).await?))
}

pub async fn availability(
    State(state): State<ApiState>,
    Id(id): Id<WorkspaceId>,
    Params(query): Params<AvailabilityQuery>,
) -> ApiResult<Json<DayAvailability>> {
    Ok(Json(state.services.bookings.availability(id, query.date).await?))
}

use crate::api::ApiState;
use crate::api::error::ApiResult;
use crate::api::extract::{AuthUser, Body, Id, Params};
use crate::core::repository::Page;
use crate::core::types::{Booking, BookingId};
use crate::services::{BookingCreated, BookingQuote, BookingRequest};
use axum::{Json, extract::State, http::StatusCode};

pub async fn quote(
    State(state): State<ApiState>,
    auth: AuthUser,
    Body(request): Body<BookingRequest>,
) -> ApiResult<Json<BookingQuote>> {
    Ok(Json(state.services.bookings.quote(&auth.user, request).await?))
}

pub async fn create(
    State(state): State<ApiState>,
    auth: AuthUser,
    Body(request): Body<BookingRequest>,
) -> ApiResult<(StatusCode, Json<BookingCreated>)> {
    let created = state.services.bookings.create(&auth.user, request, &auth.actor()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list(
    State(state): State<ApiState>,
    auth: AuthUser,
    Params(page): Params<Page>,
) -> ApiResult<Json<Vec<Booking>>> {
    Ok(Json(state.services.bookings.list_for_user(&auth.user, page).await?))
}

pub async fn get(
    State(state): State<ApiState>,
    auth: AuthUser,
    Id(id): Id<BookingId>,
) -> ApiResult<Json<Booking>> {
    Ok(Json(state.services.bookings.get_for(&auth.user, id).await?))
}

pub async fn cancel(
    State(state): State<ApiState>,
    auth: AuthUser,
    Id(id): Id<BookingId>,
) -> ApiResult<Json<Booking>> {
    Ok(Json(state.services.bookings.cancel(&auth.user, id, &auth.actor()).await?))
}

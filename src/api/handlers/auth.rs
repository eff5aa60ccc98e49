use crate::api::ApiState;
use crate::api::error::ApiResult;
use crate::api::extract::{AuthUser, Body};
use crate::auth::{Credentials, Registration, Session};
use crate::core::types::User;
use axum::{Json, extract::State, http::StatusCode};

pub async fn register(
    State(state): State<ApiState>,
    Body(registration): Body<Registration>,
) -> ApiResult<(StatusCode, Json<Session>)> {
    let session = state.services.auth.register(registration).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn login(
    State(state): State<ApiState>,
    Body(credentials): Body<Credentials>,
) -> ApiResult<Json<Session>> {
    Ok(Json(state.services.auth.login(credentials).await?))
}

pub async fn logout(State(state): State<ApiState>, auth: AuthUser) -> ApiResult<StatusCode> {
    state.services.auth.logout(&auth.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(auth: AuthUser) -> Json<User> {
    Json(auth.user)
}

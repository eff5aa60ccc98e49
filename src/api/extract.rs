//! Request extractors: bearer sessions, client address and JSON-error bodies
use crate::api::ApiState;
use crate::api::error::ApiError;
use crate::api::rate_limit::client_ip;
use crate::core::DomainError;
use crate::core::types::User;
use crate::services::Actor;
use axum::{
    Json, async_trait,
    extract::{ConnectInfo, FromRef, FromRequest, FromRequestParts, Path, Query, Request},
    http::{header, request::Parts},
};
use serde::de::DeserializeOwned;
use std::net::SocketAddr;

/// Caller address as seen through the proxy
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|info| info.0);
        Ok(ClientIp(client_ip(&parts.headers, peer)))
    }
}

fn bearer_token(parts: &Parts) -> Result<String, ApiError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| DomainError::Unauthorized("missing bearer token".into()))?;
    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| DomainError::Unauthorized("malformed authorization header".into()))?;
    Ok(token.to_string())
}

/// Signed-in user resolved from `Authorization: Bearer <token>`
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub token: String,
    pub ip: Option<String>,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user.id, self.ip.clone())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    ApiState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = ApiState::from_ref(state);
        let token = bearer_token(parts)?;
        let user = state.services.auth.authenticate(&token).await?;
        let peer = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|info| info.0);
        Ok(AuthUser { user, token, ip: client_ip(&parts.headers, peer) })
    }
}

/// Signed-in user with the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl AdminUser {
    pub fn actor(&self) -> Actor {
        self.0.actor()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    ApiState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        if !auth.user.is_admin() {
            return Err(DomainError::Forbidden("admin role required".into()).into());
        }
        Ok(AdminUser(auth))
    }
}

/// `Json` with rejections rendered as API errors
pub struct Body<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Body<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(Body(value))
    }
}

/// `Query` with rejections rendered as API errors
pub struct Params<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for Params<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(Params(value))
    }
}

/// `Path` with rejections rendered as API errors
pub struct Id<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for Id<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(Id(value))
    }
}

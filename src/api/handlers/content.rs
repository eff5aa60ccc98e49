//! Public forms and the blog
use crate::api::ApiState;
use crate::api::error::ApiResult;
use crate::api::extract::{Body, ClientIp, Id, Params};
use crate::core::repository::Page;
use crate::core::types::{BlogPost, NewsletterSubscriber};
use crate::services::Actor;
use crate::services::content::ContactRequest;
use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct EmailBody {
    pub email: String,
}

/// Only the submission id goes back to the visitor
#[derive(Debug, Serialize)]
pub struct Received {
    pub id: uuid::Uuid,
}

pub async fn contact(
    State(state): State<ApiState>,
    ClientIp(ip): ClientIp,
    Body(request): Body<ContactRequest>,
) -> ApiResult<(StatusCode, Json<Received>)> {
    let submission = state.services.content.submit_contact(request, &Actor::anonymous(ip)).await?;
    Ok((StatusCode::CREATED, Json(Received { id: submission.id })))
}

pub async fn subscribe(
    State(state): State<ApiState>,
    Body(body): Body<EmailBody>,
) -> ApiResult<Json<NewsletterSubscriber>> {
    Ok(Json(state.services.content.subscribe(&body.email).await?))
}

pub async fn unsubscribe(State(state): State<ApiState>, Body(body): Body<EmailBody>) -> ApiResult<StatusCode> {
    state.services.content.unsubscribe(&body.email).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn posts(State(state): State<ApiState>, Params(page): Params<Page>) -> ApiResult<Json<Vec<BlogPost>>> {
    Ok(Json(state.services.content.published_posts(page).await?))
}

pub async fn post(State(state): State<ApiState>, Id(slug): Id<String>) -> ApiResult<Json<BlogPost>> {
    Ok(Json(state.services.content.post(&slug).await?))
}

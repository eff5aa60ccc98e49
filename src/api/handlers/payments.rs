use crate::api::ApiState;
use crate::api::error::ApiResult;
use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use serde_json::{Value, json};

/// Raw body is required for signature verification
pub async fn webhook(State(state): State<ApiState>, headers: HeaderMap, body: Bytes) -> ApiResult<Json<Value>> {
    let signature = headers.get("stripe-signature").and_then(|v| v.to_str().ok());
    state.services.webhooks.handle(&body, signature).await?;
    Ok(Json(json!({ "received": true })))
}

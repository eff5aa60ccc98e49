//! Credits and wallet endpoints for the signed-in member
use crate::api::ApiState;
use crate::api::error::ApiResult;
use crate::api::extract::{AuthUser, Body, Params};
use crate::core::repository::Page;
use crate::core::types::{CreditTransaction, User};
use crate::services::nft::WalletChallenge;
use crate::services::{CreditBalances, WalletProof};
use axum::{Json, extract::State};

pub async fn credits(State(state): State<ApiState>, auth: AuthUser) -> ApiResult<Json<CreditBalances>> {
    Ok(Json(state.services.credits.balances(&auth.user).await?))
}

pub async fn transactions(
    State(state): State<ApiState>,
    auth: AuthUser,
    Params(page): Params<Page>,
) -> ApiResult<Json<Vec<CreditTransaction>>> {
    Ok(Json(state.services.credits.transactions(&auth.user, page).await?))
}

pub async fn nft_challenge(State(state): State<ApiState>, auth: AuthUser) -> Json<WalletChallenge> {
    Json(state.services.nft.challenge(&auth.user))
}

pub async fn nft_verify(
    State(state): State<ApiState>,
    auth: AuthUser,
    Body(proof): Body<WalletProof>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.services.nft.verify(&auth.user, proof, &auth.actor()).await?))
}

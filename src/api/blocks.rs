use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{now, SharedState};
use crate::error::{ApiError, ApiResult};

#[derive(Deserialize)]
pub struct TokenQuery {
    pub user_token: String,
}

pub async fn list(
    State(state): State<SharedState>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<Value>> {
    let blocks = state.db.list_blocks(&query.user_token).await?;
    Ok(Json(json!({ "success": true, "blocks": blocks })))
}

#[derive(Deserialize)]
pub struct BlockRequest {
    pub user_token: String,
    pub blocked_token: String,
    pub blocked_nickname: Option<String>,
}

pub async fn add(
    State(state): State<SharedState>,
    Json(req): Json<BlockRequest>,
) -> ApiResult<Json<Value>> {
    if req.user_token == req.blocked_token {
        return Err(ApiError::bad_request("Cannot block yourself"));
    }
    let nickname = req.blocked_nickname.as_deref().unwrap_or("Неизвестный");
    let added = state
        .db
        .block_user(&req.user_token, &req.blocked_token, nickname, now())
        .await?;
    Ok(Json(json!({ "success": true, "added": added })))
}

#[derive(Deserialize)]
pub struct UnblockRequest {
    pub user_token: String,
    pub blocked_token: String,
}

pub async fn remove(
    State(state): State<SharedState>,
    Json(req): Json<UnblockRequest>,
) -> ApiResult<Json<Value>> {
    let removed = state
        .db
        .unblock_user(&req.user_token, &req.blocked_token)
        .await?;
    if !removed {
        return Err(ApiError::not_found("No such block"));
    }
    Ok(Json(json!({ "success": true })))
}

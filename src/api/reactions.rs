use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{now, SharedState};
use crate::error::{ApiError, ApiResult};

#[derive(Deserialize)]
pub struct SetReaction {
    pub message_id: i64,
    pub user_token: String,
    pub emoji: String,
}

pub async fn set(
    State(state): State<SharedState>,
    Json(req): Json<SetReaction>,
) -> ApiResult<Json<Value>> {
    if req.emoji.is_empty() {
        return Err(ApiError::bad_request("emoji is required"));
    }
    state
        .db
        .set_reaction(req.message_id, &req.user_token, &req.emoji, now())
        .await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Deserialize)]
pub struct TokenQuery {
    pub user_token: String,
}

pub async fn remove(
    State(state): State<SharedState>,
    Path(message_id): Path<i64>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<Value>> {
    let removed = state
        .db
        .remove_reaction(message_id, &query.user_token)
        .await?;
    if !removed {
        return Err(ApiError::not_found("No reaction to remove"));
    }
    Ok(Json(json!({ "success": true })))
}

#[derive(Deserialize)]
pub struct ListQuery {
    /// Comma-separated message ids.
    pub message_ids: String,
}

pub async fn list(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Value>> {
    let ids: Vec<i64> = query
        .message_ids
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.trim().parse())
        .collect::<Result<_, _>>()
        .map_err(|_| ApiError::bad_request("message_ids must be a comma-separated id list"))?;
    let reactions = state.db.reactions_for(&ids).await?;
    Ok(Json(json!({ "success": true, "reactions": reactions })))
}

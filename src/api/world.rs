//! Public world chat, visible to everyone.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{now, SharedState};
use crate::error::{ApiError, ApiResult};
use crate::messages::DEFAULT_SENDER_NAME;

const DEFAULT_LIMIT: i64 = 100;
const MAX_MESSAGE_CHARS: usize = 1000;

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

pub async fn list(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Value>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 500);
    let messages = state.db.list_world_messages(limit).await?;
    Ok(Json(json!({ "success": true, "messages": messages })))
}

#[derive(Deserialize)]
pub struct SendMessage {
    pub user_token: String,
    pub text: String,
}

pub async fn send(
    State(state): State<SharedState>,
    Json(req): Json<SendMessage>,
) -> ApiResult<Json<Value>> {
    if req.user_token.is_empty() {
        return Err(ApiError::unauthorized("user_token is required"));
    }
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::bad_request("Message must not be empty"));
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::bad_request("Message is too long"));
    }

    let nickname = state
        .db
        .user_by_token(&req.user_token)
        .await?
        .and_then(|u| u.display_nickname)
        .unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string());
    let message = state
        .db
        .add_world_message(&req.user_token, &nickname, text, now())
        .await?;
    Ok(Json(json!({ "success": true, "message": message })))
}

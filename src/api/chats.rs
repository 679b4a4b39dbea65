//! Private chat lifecycle: request, accept or reject, block, unblock.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{now, SharedState};
use crate::db::{AdId, ChatKey};
use crate::error::{ApiError, ApiResult};

#[derive(Deserialize)]
pub struct CreateChat {
    pub ad_id: i64,
    pub user_token: String,
    /// Text shown to the owner together with the request.
    pub message: Option<String>,
}

/// Open a chat request against an ad, optionally carrying the first
/// message. At most one chat may exist per ad and pair of users,
/// whoever initiated it.
pub async fn create(
    State(state): State<SharedState>,
    Json(req): Json<CreateChat>,
) -> ApiResult<Json<Value>> {
    if req.user_token.is_empty() {
        return Err(ApiError::unauthorized("user_token is required"));
    }
    let ad = state
        .db
        .ad_by_id(AdId(req.ad_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Ad not found"))?;
    if ad.user_token == req.user_token {
        return Err(ApiError::bad_request("Cannot open a chat with your own ad"));
    }
    if state
        .db
        .is_blocked_between(&req.user_token, &ad.user_token)
        .await?
    {
        return Err(ApiError::forbidden("Chat is not available").with_code("BLOCKED"));
    }
    if let Some(existing) = state
        .db
        .find_chat(AdId(req.ad_id), &req.user_token, &ad.user_token)
        .await?
    {
        return Ok(Json(json!({
            "success": true,
            "chat": existing,
            "created": false,
        })));
    }

    let created_at = now();
    let chat = state
        .db
        .create_chat(AdId(req.ad_id), &req.user_token, &ad.user_token, created_at)
        .await?;
    tracing::info!(chat_id = chat.id, ad_id = ad.id, "Chat request created");

    let initiator = state.db.user_by_token(&req.user_token).await?;

    // The opening message rides along with the request; the accepted
    // gate applies only to messages sent afterwards.
    if let Some(text) = req.message.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let nickname = initiator
            .as_ref()
            .and_then(|u| u.display_nickname.clone())
            .unwrap_or_else(|| crate::messages::DEFAULT_SENDER_NAME.to_string());
        state
            .db
            .add_message(
                &crate::db::NewMessage {
                    chat_id: ChatKey(chat.id),
                    sender_token: &req.user_token,
                    text,
                    sender_nickname: &nickname,
                    photo_url: None,
                    telegram_file_id: None,
                    reply_to_message_id: None,
                },
                created_at,
            )
            .await?;
    }

    if let Some(owner_tg) = ad.tg_id {
        state.notifier.chat_request(owner_tg, &ad.text).await;
    }
    if let Some(initiator) = initiator {
        state.notifier.chat_requested_ack(initiator.id, &ad.text).await;
    }

    Ok(Json(json!({ "success": true, "chat": chat, "created": true })))
}

#[derive(Deserialize)]
pub struct TokenQuery {
    pub user_token: String,
}

pub async fn active(
    State(state): State<SharedState>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<Value>> {
    let chats = state.db.active_chats(&query.user_token).await?;
    Ok(Json(json!({ "success": true, "chats": chats })))
}

pub async fn pending(
    State(state): State<SharedState>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<Value>> {
    let chats = state.db.pending_chats(&query.user_token).await?;
    Ok(Json(json!({ "success": true, "chats": chats })))
}

pub async fn outgoing(
    State(state): State<SharedState>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<Value>> {
    let chats = state.db.outgoing_requests(&query.user_token).await?;
    Ok(Json(json!({ "success": true, "chats": chats })))
}

pub async fn count(
    State(state): State<SharedState>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<Value>> {
    let count = state.db.count_pending(&query.user_token).await?;
    Ok(Json(json!({ "success": true, "count": count })))
}

pub async fn by_id(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<Value>> {
    let chat = state
        .db
        .chat_by_id(ChatKey(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Chat not found"))?;
    if !chat.involves(&query.user_token) {
        return Err(ApiError::forbidden("Not a participant of this chat"));
    }
    Ok(Json(json!({ "success": true, "chat": chat })))
}

#[derive(Deserialize)]
pub struct Decision {
    pub user_token: String,
}

pub async fn accept(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<Decision>,
) -> ApiResult<Json<Value>> {
    let accepted = state.db.accept_chat(ChatKey(id), &req.user_token).await?;
    if !accepted {
        return Err(ApiError::not_found("No pending request to accept"));
    }
    tracing::info!(chat_id = id, "Chat request accepted");
    Ok(Json(json!({ "success": true })))
}

pub async fn reject(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<Decision>,
) -> ApiResult<Json<Value>> {
    let rejected = state.db.reject_chat(ChatKey(id), &req.user_token).await?;
    if !rejected {
        return Err(ApiError::not_found("No pending request to reject"));
    }
    tracing::info!(chat_id = id, "Chat request rejected");
    Ok(Json(json!({ "success": true })))
}

pub async fn block(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<Decision>,
) -> ApiResult<Json<Value>> {
    let blocked = state.db.block_chat(ChatKey(id), &req.user_token).await?;
    if !blocked {
        return Err(ApiError::not_found("Chat not found or already blocked"));
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn unblock(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<Decision>,
) -> ApiResult<Json<Value>> {
    let unblocked = state.db.unblock_chat(ChatKey(id), &req.user_token).await?;
    if !unblocked {
        return Err(ApiError::not_found("Chat not found or not blocked by you"));
    }
    Ok(Json(json!({ "success": true })))
}

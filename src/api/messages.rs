//! Messages inside a private chat.
//!
//! Sending checks the full gate: the sender participates, the chat is
//! accepted and unblocked, and nobody blocked anybody at the user
//! level. Photo messages additionally burn a daily quota.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{now, today, SharedState};
use crate::db::{ChatKey, NewMessage, PrivateChat};
use crate::error::{ApiError, ApiResult};
use crate::messages::DEFAULT_SENDER_NAME;

const DEFAULT_LIMIT: i64 = 100;
const MAX_MESSAGE_CHARS: usize = 1000;
pub const PHOTO_DAILY_LIMIT: i64 = 5;

#[derive(Deserialize)]
pub struct TokenQuery {
    pub user_token: String,
    pub limit: Option<i64>,
}

async fn load_chat_for(
    state: &SharedState,
    chat_id: i64,
    user_token: &str,
) -> ApiResult<PrivateChat> {
    let chat = state
        .db
        .chat_by_id(ChatKey(chat_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Chat not found"))?;
    if !chat.involves(user_token) {
        return Err(ApiError::forbidden("Not a participant of this chat"));
    }
    Ok(chat)
}

pub async fn list(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<Value>> {
    let chat = load_chat_for(&state, id, &query.user_token).await?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 500);
    let messages = state.db.list_messages(ChatKey(chat.id), limit).await?;
    Ok(Json(json!({ "success": true, "messages": messages })))
}

#[derive(Deserialize)]
pub struct SendMessage {
    pub user_token: String,
    #[serde(default)]
    pub text: String,
    pub photo_url: Option<String>,
    pub telegram_file_id: Option<String>,
    pub reply_to_message_id: Option<i64>,
    #[serde(default)]
    pub skip_notification: bool,
}

pub async fn send(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<SendMessage>,
) -> ApiResult<Json<Value>> {
    let chat = load_chat_for(&state, id, &req.user_token).await?;
    if !chat.accepted {
        return Err(ApiError::forbidden("Chat request is not accepted yet")
            .with_code("NOT_ACCEPTED"));
    }
    if chat.blocked_by.is_some() {
        return Err(ApiError::forbidden("Chat is blocked").with_code("CHAT_BLOCKED"));
    }
    let peer_token = chat.peer_of(&req.user_token).to_string();
    if state
        .db
        .is_blocked_between(&req.user_token, &peer_token)
        .await?
    {
        return Err(ApiError::forbidden("Chat is not available").with_code("BLOCKED"));
    }

    let text = req.text.trim();
    let has_photo = req.photo_url.is_some() || req.telegram_file_id.is_some();
    if text.is_empty() && !has_photo {
        return Err(ApiError::bad_request("Message must have text or a photo"));
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::bad_request("Message is too long"));
    }
    let sender = state.db.user_by_token(&req.user_token).await?;
    let sender_is_premium = sender
        .as_ref()
        .map(|u| u.premium_active(now()))
        .unwrap_or(false);

    // Free accounts get a daily photo budget; premium is unlimited.
    if has_photo && !sender_is_premium {
        let sent = state.db.photos_sent_today(&req.user_token, &today()).await?;
        if sent >= PHOTO_DAILY_LIMIT {
            return Err(ApiError::new(
                axum::http::StatusCode::TOO_MANY_REQUESTS,
                "Daily photo limit reached",
            )
            .with_code("PHOTO_LIMIT"));
        }
    }

    let sender_nickname = sender
        .as_ref()
        .and_then(|u| u.display_nickname.clone())
        .unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string());

    let sent_at = now();
    let message = state
        .db
        .add_message(
            &NewMessage {
                chat_id: ChatKey(chat.id),
                sender_token: &req.user_token,
                text,
                sender_nickname: &sender_nickname,
                photo_url: req.photo_url.as_deref(),
                telegram_file_id: req.telegram_file_id.as_deref(),
                reply_to_message_id: req.reply_to_message_id,
            },
            sent_at,
        )
        .await?;
    state.db.touch_chat(ChatKey(chat.id), sent_at).await?;
    if has_photo && !sender_is_premium {
        state
            .db
            .record_photo_sent(&req.user_token, &today(), sent_at)
            .await?;
    }

    // Skip the Telegram ping when the peer has the chat on screen.
    if !req.skip_notification && !state.activity.is_active(&peer_token, chat.id) {
        // A peer without a users row may still be reachable through the
        // tg_id they attached to their latest ad.
        let peer_tg_id = match state.db.user_by_token(&peer_token).await? {
            Some(peer) => Some(peer.id),
            None => state.db.tg_id_from_ads(&peer_token).await?,
        };
        if let Some(tg_id) = peer_tg_id {
            let preview = if text.is_empty() { "📷 Фото" } else { text };
            state
                .notifier
                .new_message(tg_id, Some(&sender_nickname), preview, chat.ad_id)
                .await;
        }
    }

    Ok(Json(json!({ "success": true, "message": message })))
}

#[derive(Deserialize)]
pub struct MarkRequest {
    pub user_token: String,
}

pub async fn mark_read(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<MarkRequest>,
) -> ApiResult<Json<Value>> {
    let chat = load_chat_for(&state, id, &req.user_token).await?;
    let updated = state.db.mark_read(ChatKey(chat.id), &req.user_token).await?;
    Ok(Json(json!({ "success": true, "updated": updated })))
}

pub async fn mark_delivered(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<MarkRequest>,
) -> ApiResult<Json<Value>> {
    let chat = load_chat_for(&state, id, &req.user_token).await?;
    let updated = state
        .db
        .mark_delivered(ChatKey(chat.id), &req.user_token)
        .await?;
    Ok(Json(json!({ "success": true, "updated": updated })))
}

#[derive(Deserialize)]
pub struct UnreadQuery {
    pub user_token: String,
}

pub async fn unread(
    State(state): State<SharedState>,
    Query(query): Query<UnreadQuery>,
) -> ApiResult<Json<Value>> {
    let counts = state.db.unread_counts(&query.user_token).await?;
    let total: i64 = counts.iter().map(|(_, n)| n).sum();
    let by_chat: Vec<Value> = counts
        .into_iter()
        .map(|(chat_id, unread)| json!({ "chat_id": chat_id, "unread": unread }))
        .collect();
    Ok(Json(json!({ "success": true, "total": total, "chats": by_chat })))
}

pub async fn remove(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Query(query): Query<UnreadQuery>,
) -> ApiResult<Json<Value>> {
    let deleted = state.db.delete_message(id, &query.user_token).await?;
    if !deleted {
        return Err(ApiError::not_found("Message not found or not yours"));
    }
    Ok(Json(json!({ "success": true })))
}

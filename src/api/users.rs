//! Display nicknames.
//!
//! Free accounts pick a nickname once; premium accounts may rename
//! once per day. Nicknames are unique case-insensitively.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{now, SharedState};
use crate::error::{ApiError, ApiResult};

const NICKNAME_COOLDOWN_SECS: i64 = 24 * 3600;
const MIN_NICKNAME_CHARS: usize = 2;
const MAX_NICKNAME_CHARS: usize = 20;

fn valid_nickname(nickname: &str) -> bool {
    let length = nickname.chars().count();
    (MIN_NICKNAME_CHARS..=MAX_NICKNAME_CHARS).contains(&length)
        && nickname.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || ('а'..='я').contains(&c)
                || ('А'..='Я').contains(&c)
                || c == 'ё'
                || c == 'Ё'
                || c == '_'
                || c == '-'
        })
}

#[derive(Deserialize)]
pub struct NicknameQuery {
    pub user_token: Option<String>,
    /// When set, check availability instead of returning the current
    /// nickname.
    pub nickname: Option<String>,
}

pub async fn nickname(
    State(state): State<SharedState>,
    Query(query): Query<NicknameQuery>,
) -> ApiResult<Json<Value>> {
    if let Some(candidate) = &query.nickname {
        let exclude = query.user_token.as_deref().unwrap_or("");
        let taken = state.db.nickname_taken(candidate, exclude).await?;
        return Ok(Json(json!({ "success": true, "available": !taken })));
    }

    let token = query
        .user_token
        .ok_or_else(|| ApiError::bad_request("user_token or nickname is required"))?;
    let user = state.db.user_by_token(&token).await?;
    Ok(Json(json!({
        "success": true,
        "nickname": user.and_then(|u| u.display_nickname),
    })))
}

#[derive(Deserialize)]
pub struct SetNickname {
    pub user_token: String,
    pub nickname: String,
}

pub async fn set_nickname(
    State(state): State<SharedState>,
    Json(req): Json<SetNickname>,
) -> ApiResult<Json<Value>> {
    let nickname = req.nickname.trim();
    if !valid_nickname(nickname) {
        return Err(ApiError::bad_request(format!(
            "Nickname must be {MIN_NICKNAME_CHARS}-{MAX_NICKNAME_CHARS} letters, \
             digits, '_' or '-'"
        )));
    }

    let user = state
        .db
        .user_by_token(&req.user_token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Unknown user"))?;
    if state.db.nickname_taken(nickname, &req.user_token).await? {
        return Err(ApiError::conflict("Nickname is taken").with_code("NICKNAME_TAKEN"));
    }

    let at = now();
    if let Some(changed_at) = user.nickname_changed_at {
        if !user.premium_active(at) {
            return Err(ApiError::forbidden("Free accounts can set a nickname once")
                .with_code("NICKNAME_LOCKED_FREE"));
        }
        let elapsed = at - changed_at;
        if elapsed < NICKNAME_COOLDOWN_SECS {
            let hours_left = ((NICKNAME_COOLDOWN_SECS - elapsed) as u64).div_ceil(3600);
            return Err(ApiError::new(
                StatusCode::TOO_MANY_REQUESTS,
                format!("Nickname can change again in {hours_left}h"),
            )
            .with_code("NICKNAME_COOLDOWN"));
        }
    }

    state.db.set_nickname(&req.user_token, nickname, at).await?;
    Ok(Json(json!({ "success": true, "nickname": nickname })))
}

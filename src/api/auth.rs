//! Login flows.
//!
//! Three ways in, all ending with the same user token:
//! - the bot pushes a session payload that the client polls for;
//! - a four-digit one-time code generated by the bot and typed into
//!   the web client;
//! - Telegram Mini App `initData`, verified by HMAC.

use axum::extract::{Query, State};
use axum::Json;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{now, SharedState};
use crate::db::CodeLookup;
use crate::error::{ApiError, ApiResult};
use crate::token::{derive_user_token, verify_init_data};

/// Lifetime of a one-time login code.
const CODE_TTL_SECS: i64 = 5 * 60;

#[derive(Deserialize)]
pub struct PushSession {
    pub auth_token: String,
    pub user: Value,
}

#[derive(Deserialize)]
pub struct PollSession {
    pub auth_token: String,
}

pub async fn push_web_session(
    State(state): State<SharedState>,
    Json(req): Json<PushSession>,
) -> ApiResult<Json<Value>> {
    if req.auth_token.is_empty() {
        return Err(ApiError::bad_request("auth_token is required"));
    }
    state.web_sessions.put(&req.auth_token, req.user);
    Ok(Json(json!({ "success": true })))
}

pub async fn poll_web_session(
    State(state): State<SharedState>,
    Query(req): Query<PollSession>,
) -> ApiResult<Json<Value>> {
    match state.web_sessions.take(&req.auth_token) {
        Some(user) => Ok(Json(json!({ "success": true, "user": user }))),
        None => Ok(Json(json!({ "success": false, "pending": true }))),
    }
}

pub async fn push_tg_session(
    State(state): State<SharedState>,
    Json(req): Json<PushSession>,
) -> ApiResult<Json<Value>> {
    if req.auth_token.is_empty() {
        return Err(ApiError::bad_request("auth_token is required"));
    }
    state.tg_sessions.put(&req.auth_token, req.user);
    Ok(Json(json!({ "success": true })))
}

pub async fn poll_tg_session(
    State(state): State<SharedState>,
    Query(req): Query<PollSession>,
) -> ApiResult<Json<Value>> {
    match state.tg_sessions.take(&req.auth_token) {
        Some(user) => Ok(Json(json!({ "success": true, "user": user }))),
        None => Ok(Json(json!({ "success": false, "pending": true }))),
    }
}

#[derive(Deserialize)]
pub struct InitDataRequest {
    pub init_data: String,
}

/// Authenticate a Mini App client from its signed `initData`.
pub async fn telegram_init(
    State(state): State<SharedState>,
    Json(req): Json<InitDataRequest>,
) -> ApiResult<Json<Value>> {
    let Some(bot_token) = &state.bot_token else {
        return Err(ApiError::new(
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "Telegram auth is not configured",
        ));
    };

    let valid = verify_init_data(&req.init_data, bot_token)
        .map_err(|err| ApiError::bad_request(format!("Malformed initData: {err}")))?;
    if !valid {
        return Err(ApiError::unauthorized("initData signature mismatch"));
    }

    let user = init_data_user(&req.init_data)
        .ok_or_else(|| ApiError::bad_request("initData has no user field"))?;
    let tg_id = user
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| ApiError::bad_request("user id missing from initData"))?;

    let user_token = derive_user_token(tg_id, &state.token_secret);
    state.db.upsert_user(tg_id, &user_token, now()).await?;
    tracing::info!(tg_id, "Mini App login");

    Ok(Json(json!({
        "success": true,
        "user_token": user_token,
        "user": user,
    })))
}

fn init_data_user(init_data: &str) -> Option<Value> {
    let raw = init_data
        .split('&')
        .find_map(|pair| pair.strip_prefix("user="))?;
    let decoded = urlencoding::decode(raw).ok()?;
    serde_json::from_str(&decoded).ok()
}

#[derive(Deserialize)]
pub struct GenerateCode {
    pub telegram_id: i64,
    #[serde(default)]
    pub user_data: Value,
}

/// Issue a one-time login code for the bot to show the user.
pub async fn generate_code(
    State(state): State<SharedState>,
    Json(req): Json<GenerateCode>,
) -> ApiResult<Json<Value>> {
    let code = format!("{:04}", rand::thread_rng().gen_range(0..10_000));
    let created_at = now();
    let expires_at = created_at + CODE_TTL_SECS;
    let user_data = serde_json::to_string(&req.user_data).unwrap_or_else(|_| "{}".to_string());

    state
        .db
        .store_auth_code(&code, req.telegram_id, &user_data, expires_at, created_at)
        .await?;
    tracing::info!(telegram_id = req.telegram_id, "Issued login code");

    Ok(Json(json!({
        "success": true,
        "code": code,
        "expires_at": expires_at,
    })))
}

#[derive(Deserialize)]
pub struct VerifyCode {
    pub code: String,
}

pub async fn verify_code(
    State(state): State<SharedState>,
    Json(req): Json<VerifyCode>,
) -> ApiResult<Json<Value>> {
    let found = match state.db.consume_auth_code(&req.code, now()).await? {
        CodeLookup::Valid(found) => found,
        CodeLookup::Expired => {
            return Err(ApiError::gone("Code has expired").with_code("CODE_EXPIRED"))
        }
        CodeLookup::Missing => {
            return Err(ApiError::unauthorized("Invalid code").with_code("BAD_CODE"))
        }
    };

    let user_token = derive_user_token(found.telegram_id, &state.token_secret);
    state
        .db
        .upsert_user(found.telegram_id, &user_token, now())
        .await?;
    let user_data: Value = serde_json::from_str(&found.user_data).unwrap_or(Value::Null);
    tracing::info!(telegram_id = found.telegram_id, "Code login");

    Ok(Json(json!({
        "success": true,
        "user_token": user_token,
        "telegram_id": found.telegram_id,
        "user": user_data,
    })))
}

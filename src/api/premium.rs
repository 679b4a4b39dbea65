//! PRO subscription pricing and activation.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{now, SharedState};
use crate::error::{ApiError, ApiResult};
use crate::premium;

#[derive(Deserialize)]
pub struct CalculateQuery {
    pub months: u32,
}

pub async fn calculate(Query(query): Query<CalculateQuery>) -> ApiResult<Json<Value>> {
    let quote = premium::quote(query.months)
        .ok_or_else(|| ApiError::bad_request("months must be between 1 and 12"))?;
    Ok(Json(json!({ "success": true, "price": quote })))
}

#[derive(Deserialize)]
pub struct ActivateRequest {
    pub user_token: Option<String>,
    /// Payment callbacks identify the buyer by Telegram id; the user
    /// row is created on the fly if it does not exist yet.
    pub telegram_id: Option<i64>,
    pub months: u32,
    pub transaction_id: Option<String>,
}

/// Activate or extend a subscription after a successful Stars payment.
/// An active term stacks; an expired one restarts from now.
pub async fn activate(
    State(state): State<SharedState>,
    Json(req): Json<ActivateRequest>,
) -> ApiResult<Json<Value>> {
    let quote = premium::quote(req.months)
        .ok_or_else(|| ApiError::bad_request("months must be between 1 and 12"))?;

    let at = now();
    let user = match (&req.user_token, req.telegram_id) {
        (_, Some(tg_id)) => {
            let token = crate::token::derive_user_token(tg_id, &state.token_secret);
            state.db.upsert_user(tg_id, &token, at).await?
        }
        (Some(token), None) => state
            .db
            .user_by_token(token)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Unknown user"))?,
        (None, None) => {
            return Err(ApiError::bad_request("user_token or telegram_id is required"))
        }
    };
    let token = user
        .user_token
        .clone()
        .ok_or_else(|| ApiError::internal("User has no token"))?;

    let until = premium::extended_until(user.premium_until, user.is_premium, at, req.months);
    state.db.activate_premium(&token, until, at).await?;
    state.db.increment_stat("premium_activations", at).await?;
    tracing::info!(
        months = req.months,
        transaction_id = req.transaction_id.as_deref().unwrap_or(""),
        "Premium activated",
    );

    Ok(Json(json!({
        "success": true,
        "premium_until": until,
        "price": quote,
    })))
}

#[derive(Deserialize)]
pub struct StatusQuery {
    pub user_token: String,
}

pub async fn status(
    State(state): State<SharedState>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<Value>> {
    let user = state.db.user_by_token(&query.user_token).await?;
    let (is_premium, premium_until) = match user {
        Some(user) => (user.premium_active(now()), user.premium_until),
        None => (false, None),
    };
    Ok(Json(json!({
        "success": true,
        "is_premium": is_premium,
        "premium_until": premium_until,
    })))
}

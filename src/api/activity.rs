//! Presence heartbeats. Used to suppress Telegram notifications while
//! the user already has the chat open.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::SharedState;
use crate::error::{ApiError, ApiResult};

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    Active,
    Inactive,
}

#[derive(Deserialize)]
pub struct ReportRequest {
    pub user_token: String,
    pub chat_id: Option<i64>,
    pub action: ActivityAction,
}

pub async fn report(
    State(state): State<SharedState>,
    Json(req): Json<ReportRequest>,
) -> ApiResult<Json<Value>> {
    match req.action {
        ActivityAction::Active => {
            let chat_id = req
                .chat_id
                .ok_or_else(|| ApiError::bad_request("chat_id is required when active"))?;
            state.activity.mark_active(&req.user_token, chat_id);
        }
        ActivityAction::Inactive => {
            state.activity.mark_inactive(&req.user_token);
        }
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn list(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let users = state.activity.active_users();
    Ok(Json(json!({ "success": true, "active_users": users })))
}

#[derive(Deserialize)]
pub struct CheckQuery {
    pub user_token: String,
    pub chat_id: i64,
}

pub async fn check(
    State(state): State<SharedState>,
    Query(query): Query<CheckQuery>,
) -> ApiResult<Json<Value>> {
    let active = state.activity.is_active(&query.user_token, query.chat_id);
    Ok(Json(json!({ "success": true, "active": active })))
}

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{now, SharedState};
use crate::error::{ApiError, ApiResult};

#[derive(Deserialize)]
pub struct VoteRequest {
    pub poll_id: String,
    pub user_token: String,
    pub answer: String,
}

/// One vote per user per poll. A repeat vote is a conflict, but the
/// body still carries the current tallies so the client can render
/// them.
pub async fn vote(
    State(state): State<SharedState>,
    Json(req): Json<VoteRequest>,
) -> ApiResult<Response> {
    if req.poll_id.is_empty() || req.answer.is_empty() {
        return Err(ApiError::bad_request("poll_id and answer are required"));
    }
    let recorded = state
        .db
        .record_vote(&req.poll_id, &req.user_token, &req.answer, now())
        .await?;
    let results = state.db.poll_results(&req.poll_id).await?;
    if !recorded {
        let body = json!({
            "success": false,
            "error": "Already voted",
            "code": "ALREADY_VOTED",
            "results": results,
        });
        return Ok((StatusCode::CONFLICT, Json(body)).into_response());
    }
    Ok(Json(json!({ "success": true, "results": results })).into_response())
}

#[derive(Deserialize)]
pub struct ResultsQuery {
    pub user_token: Option<String>,
}

pub async fn results(
    State(state): State<SharedState>,
    Path(poll_id): Path<String>,
    Query(query): Query<ResultsQuery>,
) -> ApiResult<Json<Value>> {
    let results = state.db.poll_results(&poll_id).await?;
    let own_vote = match &query.user_token {
        Some(token) => state.db.user_vote(&poll_id, token).await?,
        None => None,
    };
    Ok(Json(json!({
        "success": true,
        "results": results,
        "user_vote": own_vote,
    })))
}

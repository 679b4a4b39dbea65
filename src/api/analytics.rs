use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{now, SharedState};
use crate::error::ApiResult;

#[derive(Deserialize)]
pub struct VisitRequest {
    pub user_id: Option<String>,
    pub page: String,
    pub country: Option<String>,
    pub city: Option<String>,
}

pub async fn visit(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(req): Json<VisitRequest>,
) -> ApiResult<Json<Value>> {
    let user_agent = header_str(&headers, "user-agent");
    // behind a reverse proxy the client address arrives in a header
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .unwrap_or("unknown")
        .trim()
        .to_string();

    state
        .db
        .record_visit(
            req.user_id.as_deref(),
            &req.page,
            &user_agent,
            &ip,
            req.country.as_deref(),
            req.city.as_deref(),
            now(),
        )
        .await?;
    Ok(Json(json!({ "success": true })))
}

fn header_str(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

pub async fn summary(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let day_ago = now() - 24 * 3600;
    Ok(Json(json!({
        "success": true,
        "total_visits": state.db.total_visits().await?,
        "unique_visitors": state.db.unique_visitors().await?,
        "visits_last_24h": state.db.visits_since(day_ago).await?,
        "ads_created": state.db.stat("ads_created").await?,
        "premium_activations": state.db.stat("premium_activations").await?,
    })))
}

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{now, SharedState};
use crate::db::{AdId, NewAd};
use crate::error::{ApiError, ApiResult};

const DEFAULT_LIMIT: i64 = 100;
const MAX_AD_TEXT_CHARS: usize = 2000;

/// Premium perk: a pinned ad stays on top for this long.
const PIN_DURATION_SECS: i64 = 24 * 3600;

#[derive(Deserialize)]
pub struct ListQuery {
    pub city: Option<String>,
    pub country: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Value>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 500);
    let ads = state
        .db
        .list_ads(query.city.as_deref(), query.country.as_deref(), limit)
        .await?;
    Ok(Json(json!({ "success": true, "ads": ads })))
}

#[derive(Deserialize)]
pub struct CreateAd {
    pub user_token: String,
    pub tg_id: Option<i64>,
    pub gender: String,
    pub target: String,
    pub goal: String,
    pub age_from: Option<i64>,
    pub age_to: Option<i64>,
    pub my_age: Option<i64>,
    pub body_type: Option<String>,
    pub text: String,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: String,
}

pub async fn create(
    State(state): State<SharedState>,
    Json(req): Json<CreateAd>,
) -> ApiResult<Json<Value>> {
    if req.user_token.is_empty() {
        return Err(ApiError::unauthorized("user_token is required"));
    }
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::bad_request("Ad text must not be empty"));
    }
    if text.chars().count() > MAX_AD_TEXT_CHARS {
        return Err(ApiError::bad_request("Ad text is too long"));
    }
    if req.city.trim().is_empty() {
        return Err(ApiError::bad_request("City is required"));
    }

    let ad = state
        .db
        .create_ad(
            &NewAd {
                user_token: &req.user_token,
                tg_id: req.tg_id,
                gender: &req.gender,
                target: &req.target,
                goal: &req.goal,
                age_from: req.age_from,
                age_to: req.age_to,
                my_age: req.my_age,
                body_type: req.body_type.as_deref(),
                text,
                country: req.country.as_deref().unwrap_or("Россия"),
                region: req.region.as_deref().unwrap_or(""),
                city: req.city.trim(),
            },
            now(),
        )
        .await?;
    state.db.increment_stat("ads_created", now()).await?;

    Ok(Json(json!({ "success": true, "ad": ad })))
}

#[derive(Deserialize)]
pub struct TokenQuery {
    pub user_token: String,
}

pub async fn my(
    State(state): State<SharedState>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<Value>> {
    let ads = state.db.ads_by_user(&query.user_token).await?;
    Ok(Json(json!({ "success": true, "ads": ads })))
}

pub async fn by_id(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let ad = state
        .db
        .ad_by_id(AdId(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Ad not found"))?;
    Ok(Json(json!({ "success": true, "ad": ad })))
}

pub async fn remove(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<Value>> {
    let deleted = state.db.delete_ad(AdId(id), &query.user_token).await?;
    if !deleted {
        return Err(ApiError::not_found("Ad not found or not yours"));
    }
    Ok(Json(json!({ "success": true })))
}

#[derive(Deserialize)]
pub struct PinRequest {
    pub user_token: String,
}

/// Pinning is a premium feature; the subscription must be active.
pub async fn pin(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<PinRequest>,
) -> ApiResult<Json<Value>> {
    let user = state
        .db
        .user_by_token(&req.user_token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Unknown user"))?;
    if !user.premium_active(now()) {
        return Err(ApiError::forbidden("Pinning requires an active subscription")
            .with_code("PREMIUM_REQUIRED"));
    }

    let until = now() + PIN_DURATION_SECS;
    let pinned = state.db.pin_ad(AdId(id), &req.user_token, until).await?;
    if !pinned {
        return Err(ApiError::not_found("Ad not found or not yours"));
    }
    Ok(Json(json!({ "success": true, "pinned_until": until })))
}

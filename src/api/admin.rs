//! Operational endpoints: health probe and the retention sweep.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::{now, SharedState};
use crate::db::Database;
use crate::error::ApiResult;
use crate::system_info::get_system_info;

/// Content older than this is swept.
pub const RETENTION_SECS: i64 = 7 * 24 * 3600;

pub async fn health(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let db_ok = sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(state.db.pool())
        .await
        .is_ok();
    Ok(Json(json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "database": db_ok,
        "version": get_system_info(),
    })))
}

#[derive(Debug, Serialize)]
pub struct SweepReport {
    pub ads: u64,
    pub chats: u64,
    pub messages: u64,
    pub world_messages: u64,
    pub auth_codes: u64,
    pub unpinned_ads: u64,
    pub premium_expired: u64,
}

/// Expire everything past its retention window. Ads, chats, messages
/// and world chat all live for [`RETENTION_SECS`]; expired codes, pins
/// and premium flags are tidied alongside.
pub async fn run_sweep(db: &Database, at: i64) -> anyhow::Result<SweepReport> {
    let cutoff = at - RETENTION_SECS;
    let report = SweepReport {
        ads: db.delete_old_ads(cutoff).await?,
        chats: db.delete_inactive_chats(cutoff).await?,
        messages: db.delete_old_messages(cutoff).await?,
        world_messages: db.delete_old_world_messages(cutoff).await?,
        auth_codes: db.purge_expired_codes(at).await?,
        unpinned_ads: db.unpin_expired_ads(at).await?,
        premium_expired: db.expire_premium(at).await?,
    };
    tracing::info!(
        ads = report.ads,
        chats = report.chats,
        messages = report.messages,
        world_messages = report.world_messages,
        "Retention sweep finished",
    );
    Ok(report)
}

pub async fn cleanup(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let report = run_sweep(&state.db, now()).await?;
    Ok(Json(json!({ "success": true, "deleted": report })))
}

use std::sync::Arc;

use axum::Router;

use crate::api::{build_router, AppState, SharedState};
use crate::db::{connect_db, init_schema, Database};
use crate::notify::Notifier;
use crate::store::{ActivityTracker, SessionStore};

pub async fn init_test_db() -> Database {
    let pool = connect_db("sqlite::memory:", 1)
        .await
        .expect("failed to create in-memory database");
    init_schema(&pool)
        .await
        .expect("failed to create schema");
    Database::new(pool)
}

/// App state with no bot configured, for exercising routes directly.
pub fn test_state(db: Database) -> SharedState {
    Arc::new(AppState {
        db,
        web_sessions: SessionStore::new(),
        tg_sessions: SessionStore::new(),
        activity: ActivityTracker::new(),
        notifier: Notifier::new(None, "https://example.org/webapp"),
        token_secret: "test-secret".to_string(),
        bot_token: None,
    })
}

pub fn test_app(db: Database) -> Router {
    build_router(test_state(db))
}

//! HTTP API surface.
//!
//! Handlers live in the submodules, one per concern, and share
//! [`AppState`]. Authentication is a user token: a stable HMAC of the
//! Telegram id that clients obtain through one of the auth flows and
//! then attach to every request.

use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::db::Database;
use crate::notify::Notifier;
use crate::store::{ActivityTracker, SessionStore};

pub mod activity;
pub mod admin;
pub mod ads;
pub mod analytics;
pub mod auth;
pub mod blocks;
pub mod chats;
pub mod messages;
pub mod polls;
pub mod premium;
pub mod reactions;
pub mod users;
pub mod world;

pub struct AppState {
    pub db: Database,
    /// Login-widget sessions polled by the web client.
    pub web_sessions: SessionStore,
    /// Mini App sessions polled by the Telegram webview.
    pub tg_sessions: SessionStore,
    pub activity: ActivityTracker,
    pub notifier: Notifier,
    pub token_secret: String,
    pub bot_token: Option<String>,
}

pub type SharedState = Arc<AppState>;

/// Seconds since the Unix epoch. All persisted timestamps use this.
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Today's date as `YYYY-MM-DD`, used for daily quotas.
pub fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        // auth
        .route("/api/auth", post(auth::push_web_session).get(auth::poll_web_session))
        .route(
            "/api/telegram-auth",
            post(auth::push_tg_session).get(auth::poll_tg_session),
        )
        .route("/api/auth/telegram-init", post(auth::telegram_init))
        .route("/api/auth/code/generate", post(auth::generate_code))
        .route("/api/auth/code/verify", post(auth::verify_code))
        // ads
        .route("/api/ads", get(ads::list).post(ads::create))
        .route("/api/ads/my", get(ads::my))
        .route("/api/ads/{id}", get(ads::by_id).delete(ads::remove))
        .route("/api/ads/{id}/pin", post(ads::pin))
        // chats
        .route("/api/chats", post(chats::create))
        .route("/api/chats/active", get(chats::active))
        .route("/api/chats/pending", get(chats::pending))
        .route("/api/chats/requests", get(chats::outgoing))
        .route("/api/chats/count", get(chats::count))
        .route("/api/chats/{id}", get(chats::by_id))
        .route("/api/chats/{id}/accept", post(chats::accept))
        .route("/api/chats/{id}/reject", post(chats::reject))
        .route("/api/chats/{id}/block", post(chats::block))
        .route("/api/chats/{id}/unblock", post(chats::unblock))
        // messages
        .route(
            "/api/chats/{id}/messages",
            get(messages::list).post(messages::send),
        )
        .route("/api/chats/{id}/messages/read", post(messages::mark_read))
        .route(
            "/api/chats/{id}/messages/delivered",
            post(messages::mark_delivered),
        )
        .route("/api/messages/unread", get(messages::unread))
        .route("/api/messages/{id}", delete(messages::remove))
        // world chat
        .route("/api/world-chat", get(world::list).post(world::send))
        // polls and reactions
        .route("/api/poll/vote", post(polls::vote))
        .route("/api/poll/{id}", get(polls::results))
        .route(
            "/api/reactions",
            get(reactions::list).post(reactions::set),
        )
        .route("/api/reactions/{message_id}", delete(reactions::remove))
        // premium
        .route("/api/premium/calculate", get(premium::calculate))
        .route("/api/premium/activate", post(premium::activate))
        .route("/api/premium/status", get(premium::status))
        // profile and presence
        .route("/api/nickname", get(users::nickname).post(users::set_nickname))
        .route(
            "/api/user-activity",
            get(activity::list).post(activity::report),
        )
        .route("/api/user-activity/check", get(activity::check))
        .route("/api/blocks", get(blocks::list).post(blocks::add).delete(blocks::remove))
        // analytics and ops
        .route("/api/analytics/visit", post(analytics::visit))
        .route("/api/analytics/summary", get(analytics::summary))
        .route("/api/cleanup", post(admin::cleanup).get(admin::cleanup))
        .route("/api/health", get(admin::health))
        .layer(cors)
        .with_state(state)
}

// Database related types and functions

use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};

pub mod ads;
pub mod analytics;
pub mod auth_codes;
pub mod blocks;
pub mod chats;
pub mod database;
pub mod messages;
pub mod polls;
pub mod reactions;
pub mod types;
pub mod users;
pub mod world;

pub use ads::{Ad, NewAd};
pub use auth_codes::{AuthCode, CodeLookup};
pub use blocks::UserBlock;
pub use chats::PrivateChat;
pub use database::Database;
pub use messages::{ChatMessage, NewMessage};
pub use polls::AnswerCount;
pub use reactions::ReactionCount;
pub use types::{AdId, ChatKey};
pub use users::User;
pub use world::WorldMessage;

pub fn prepare_sqlite_url(url: &str) -> String {
    if url.starts_with("sqlite:") && !url.contains("mode=") && !url.contains(":memory:") {
        if url.contains('?') {
            format!("{url}&mode=rwc")
        } else {
            format!("{url}?mode=rwc")
        }
    } else {
        url.to_string()
    }
}

pub async fn connect_db(db_url: &str, max_connections: u32) -> Result<Pool<Sqlite>> {
    tracing::debug!(db_url = %db_url, "Connecting to database");
    Ok(SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(db_url)
        .await?)
}

/// Create every table the service needs. All statements are
/// idempotent, so this runs unconditionally at startup.
pub async fn init_schema(pool: &Pool<Sqlite>) -> Result<()> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS users(
            id                  INTEGER PRIMARY KEY,
            user_token          TEXT,
            display_nickname    TEXT,
            nickname_changed_at INTEGER,
            is_premium          BOOLEAN NOT NULL DEFAULT 0,
            premium_until       INTEGER,
            created_at          INTEGER NOT NULL,
            updated_at          INTEGER NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS ads(
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_token  TEXT    NOT NULL,
            tg_id       INTEGER,
            gender      TEXT    NOT NULL,
            target      TEXT    NOT NULL,
            goal        TEXT    NOT NULL,
            age_from    INTEGER,
            age_to      INTEGER,
            my_age      INTEGER,
            body_type   TEXT,
            text        TEXT    NOT NULL,
            country     TEXT    NOT NULL DEFAULT 'Россия',
            region      TEXT    NOT NULL DEFAULT '',
            city        TEXT    NOT NULL,
            is_pinned   BOOLEAN NOT NULL DEFAULT 0,
            pinned_until INTEGER,
            created_at  INTEGER NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS private_chats(
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            ad_id           INTEGER NOT NULL,
            user_token_1    TEXT    NOT NULL,
            user_token_2    TEXT    NOT NULL,
            accepted        BOOLEAN NOT NULL DEFAULT 0,
            blocked_by      TEXT,
            created_at      INTEGER NOT NULL,
            last_message_at INTEGER NOT NULL,
            UNIQUE(ad_id, user_token_1, user_token_2)
        )",
        "CREATE TABLE IF NOT EXISTS messages(
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            chat_id             INTEGER NOT NULL,
            sender_token        TEXT    NOT NULL,
            message             TEXT    NOT NULL DEFAULT '',
            sender_nickname     TEXT    NOT NULL DEFAULT 'Анонимный',
            photo_url           TEXT,
            telegram_file_id    TEXT,
            reply_to_message_id INTEGER,
            read                BOOLEAN NOT NULL DEFAULT 0,
            delivered           BOOLEAN NOT NULL DEFAULT 0,
            created_at          INTEGER NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS world_messages(
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_token  TEXT    NOT NULL,
            nickname    TEXT    NOT NULL,
            text        TEXT    NOT NULL,
            created_at  INTEGER NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS poll_votes(
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            poll_id     TEXT    NOT NULL,
            user_token  TEXT    NOT NULL,
            answer      TEXT    NOT NULL,
            created_at  INTEGER NOT NULL,
            UNIQUE(poll_id, user_token)
        )",
        "CREATE TABLE IF NOT EXISTS message_reactions(
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            message_id  INTEGER NOT NULL,
            user_token  TEXT    NOT NULL,
            emoji       TEXT    NOT NULL,
            created_at  INTEGER NOT NULL,
            UNIQUE(message_id, user_token)
        )",
        "CREATE TABLE IF NOT EXISTS user_blocks(
            id                       INTEGER PRIMARY KEY AUTOINCREMENT,
            blocker_token            TEXT NOT NULL,
            blocked_token            TEXT NOT NULL,
            blocked_display_nickname TEXT NOT NULL DEFAULT 'Неизвестный',
            created_at               INTEGER NOT NULL,
            UNIQUE(blocker_token, blocked_token)
        )",
        "CREATE TABLE IF NOT EXISTS auth_codes(
            code        TEXT PRIMARY KEY,
            telegram_id INTEGER NOT NULL,
            user_data   TEXT    NOT NULL,
            expires_at  INTEGER NOT NULL,
            created_at  INTEGER NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS user_limits(
            user_token        TEXT PRIMARY KEY,
            photos_sent_today INTEGER NOT NULL DEFAULT 0,
            photos_last_reset TEXT    NOT NULL,
            updated_at        INTEGER NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS page_visits(
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     TEXT,
            page        TEXT NOT NULL,
            user_agent  TEXT NOT NULL,
            ip_address  TEXT NOT NULL,
            country     TEXT,
            city        TEXT,
            created_at  INTEGER NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS site_stats(
            metric_name  TEXT PRIMARY KEY,
            metric_value INTEGER NOT NULL DEFAULT 0,
            updated_at   INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_ads_city ON ads(city, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_messages_chat ON messages(chat_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_chats_user2 ON private_chats(user_token_2, accepted)",
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

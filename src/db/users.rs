use super::Database;
use anyhow::Result;

/// Registered Telegram user. `id` is the Telegram user id.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub user_token: Option<String>,
    pub display_nickname: Option<String>,
    pub nickname_changed_at: Option<i64>,
    pub is_premium: bool,
    pub premium_until: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn premium_active(&self, now: i64) -> bool {
        self.is_premium && self.premium_until.map(|until| until > now).unwrap_or(true)
    }
}

impl Database {
    /// Register a user on first contact, refresh the token binding on
    /// every later one.
    pub async fn upsert_user(&self, tg_id: i64, user_token: &str, now: i64) -> Result<User> {
        tracing::debug!(tg_id, "Upserting user");
        sqlx::query_as(
            "INSERT INTO users (id, user_token, created_at, updated_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
               user_token = excluded.user_token, \
               updated_at = excluded.updated_at \
             RETURNING *",
        )
        .bind(tg_id)
        .bind(user_token)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(Into::into)
    }

    pub async fn user_by_token(&self, user_token: &str) -> Result<Option<User>> {
        sqlx::query_as("SELECT * FROM users WHERE user_token = ?")
            .bind(user_token)
            .fetch_optional(self.pool())
            .await
            .map_err(Into::into)
    }

    pub async fn user_by_id(&self, tg_id: i64) -> Result<Option<User>> {
        sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(tg_id)
            .fetch_optional(self.pool())
            .await
            .map_err(Into::into)
    }

    /// Case-insensitive nickname uniqueness check. The caller's own row
    /// does not count as a collision.
    pub async fn nickname_taken(&self, nickname: &str, exclude_token: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users \
             WHERE LOWER(display_nickname) = LOWER(?) \
               AND (user_token IS NULL OR user_token != ?)",
        )
        .bind(nickname)
        .bind(exclude_token)
        .fetch_one(self.pool())
        .await?;
        Ok(count > 0)
    }

    /// Unconditional rename. Cooldown and lock rules live in the API
    /// layer, which has the premium state at hand.
    pub async fn set_nickname(&self, user_token: &str, nickname: &str, now: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET display_nickname = ?, nickname_changed_at = ?, updated_at = ? \
             WHERE user_token = ?",
        )
        .bind(nickname)
        .bind(now)
        .bind(now)
        .bind(user_token)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn activate_premium(&self, user_token: &str, until: i64, now: i64) -> Result<bool> {
        tracing::debug!(until, "Activating premium");
        let result = sqlx::query(
            "UPDATE users SET is_premium = 1, premium_until = ?, updated_at = ? \
             WHERE user_token = ?",
        )
        .bind(until)
        .bind(now)
        .bind(user_token)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Flip the premium flag off for everyone whose term ran out.
    pub async fn expire_premium(&self, now: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE users SET is_premium = 0, updated_at = ? \
             WHERE is_premium = 1 AND premium_until IS NOT NULL AND premium_until < ?",
        )
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }
}

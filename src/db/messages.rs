use super::{ChatKey, Database};
use anyhow::Result;

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, serde::Serialize)]
pub struct ChatMessage {
    pub id: i64,
    pub chat_id: i64,
    pub sender_token: String,
    pub message: String,
    pub sender_nickname: String,
    pub photo_url: Option<String>,
    pub telegram_file_id: Option<String>,
    pub reply_to_message_id: Option<i64>,
    pub read: bool,
    pub delivered: bool,
    pub created_at: i64,
}

pub struct NewMessage<'a> {
    pub chat_id: ChatKey,
    pub sender_token: &'a str,
    pub text: &'a str,
    pub sender_nickname: &'a str,
    pub photo_url: Option<&'a str>,
    pub telegram_file_id: Option<&'a str>,
    pub reply_to_message_id: Option<i64>,
}

impl Database {
    pub async fn add_message(&self, new: &NewMessage<'_>, created_at: i64) -> Result<ChatMessage> {
        tracing::trace!(chat_id = new.chat_id.0, "Adding message");
        sqlx::query_as(
            "INSERT INTO messages \
             (chat_id, sender_token, message, sender_nickname, photo_url, \
              telegram_file_id, reply_to_message_id, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(new.chat_id.0)
        .bind(new.sender_token)
        .bind(new.text)
        .bind(new.sender_nickname)
        .bind(new.photo_url)
        .bind(new.telegram_file_id)
        .bind(new.reply_to_message_id)
        .bind(created_at)
        .fetch_one(self.pool())
        .await
        .map_err(Into::into)
    }

    pub async fn list_messages(&self, chat_id: ChatKey, limit: i64) -> Result<Vec<ChatMessage>> {
        sqlx::query_as(
            "SELECT * FROM \
             (SELECT * FROM messages WHERE chat_id = ? ORDER BY id DESC LIMIT ?) \
             ORDER BY id ASC",
        )
        .bind(chat_id.0)
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(Into::into)
    }

    /// Mark everything the peer sent as read. Returns how many rows
    /// flipped.
    pub async fn mark_read(&self, chat_id: ChatKey, reader_token: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE messages SET read = 1, delivered = 1 \
             WHERE chat_id = ? AND sender_token != ? AND read = 0",
        )
        .bind(chat_id.0)
        .bind(reader_token)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn mark_delivered(&self, chat_id: ChatKey, reader_token: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE messages SET delivered = 1 \
             WHERE chat_id = ? AND sender_token != ? AND delivered = 0",
        )
        .bind(chat_id.0)
        .bind(reader_token)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn unread_count(&self, chat_id: ChatKey, token: &str) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages \
             WHERE chat_id = ? AND sender_token != ? AND read = 0",
        )
        .bind(chat_id.0)
        .bind(token)
        .fetch_one(self.pool())
        .await
        .map_err(Into::into)
    }

    /// Unread counters for every accepted chat the user participates
    /// in, keyed by chat id.
    pub async fn unread_counts(&self, token: &str) -> Result<Vec<(i64, i64)>> {
        sqlx::query_as(
            "SELECT c.id, COUNT(m.id) FROM private_chats c \
             JOIN messages m ON m.chat_id = c.id \
             WHERE c.accepted = 1 AND (c.user_token_1 = ? OR c.user_token_2 = ?) \
               AND m.sender_token != ? AND m.read = 0 \
             GROUP BY c.id",
        )
        .bind(token)
        .bind(token)
        .bind(token)
        .fetch_all(self.pool())
        .await
        .map_err(Into::into)
    }

    /// Users delete only their own messages.
    pub async fn delete_message(&self, message_id: i64, sender_token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ? AND sender_token = ?")
            .bind(message_id)
            .bind(sender_token)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_old_messages(&self, cutoff: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM messages WHERE created_at < ?")
            .bind(cutoff)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }

    /// Photos sent today by this user. `today` is a `YYYY-MM-DD`
    /// string; a stored row from an earlier day counts as zero.
    pub async fn photos_sent_today(&self, user_token: &str, today: &str) -> Result<i64> {
        let row: Option<(i64, String)> = sqlx::query_as(
            "SELECT photos_sent_today, photos_last_reset FROM user_limits WHERE user_token = ?",
        )
        .bind(user_token)
        .fetch_optional(self.pool())
        .await?;
        Ok(match row {
            Some((count, last_reset)) if last_reset == today => count,
            _ => 0,
        })
    }

    pub async fn record_photo_sent(&self, user_token: &str, today: &str, now: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_limits (user_token, photos_sent_today, photos_last_reset, updated_at) \
             VALUES (?, 1, ?, ?) \
             ON CONFLICT(user_token) DO UPDATE SET \
               photos_sent_today = CASE \
                 WHEN photos_last_reset = excluded.photos_last_reset \
                 THEN photos_sent_today + 1 ELSE 1 END, \
               photos_last_reset = excluded.photos_last_reset, \
               updated_at = excluded.updated_at",
        )
        .bind(user_token)
        .bind(today)
        .bind(now)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}

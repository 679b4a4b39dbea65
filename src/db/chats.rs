use super::{AdId, ChatKey, Database};
use anyhow::Result;

/// One private conversation attached to an ad.
///
/// `user_token_1` is the initiator, `user_token_2` the ad owner. The
/// pair is unique per ad regardless of who initiated, which
/// [`Database::find_chat`] enforces by checking both orientations.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, serde::Serialize)]
pub struct PrivateChat {
    pub id: i64,
    pub ad_id: i64,
    pub user_token_1: String,
    pub user_token_2: String,
    pub accepted: bool,
    pub blocked_by: Option<String>,
    pub created_at: i64,
    pub last_message_at: i64,
}

impl PrivateChat {
    pub fn involves(&self, token: &str) -> bool {
        self.user_token_1 == token || self.user_token_2 == token
    }

    pub fn peer_of(&self, token: &str) -> &str {
        if self.user_token_1 == token {
            &self.user_token_2
        } else {
            &self.user_token_1
        }
    }

    /// Messages flow only through an accepted, unblocked chat.
    pub fn is_open(&self) -> bool {
        self.accepted && self.blocked_by.is_none()
    }
}

impl Database {
    /// Look up a chat between two tokens on an ad, in either
    /// orientation.
    pub async fn find_chat(
        &self,
        ad_id: AdId,
        token_a: &str,
        token_b: &str,
    ) -> Result<Option<PrivateChat>> {
        sqlx::query_as(
            "SELECT * FROM private_chats WHERE ad_id = ? \
             AND ((user_token_1 = ? AND user_token_2 = ?) \
               OR (user_token_1 = ? AND user_token_2 = ?))",
        )
        .bind(ad_id.0)
        .bind(token_a)
        .bind(token_b)
        .bind(token_b)
        .bind(token_a)
        .fetch_optional(self.pool())
        .await
        .map_err(Into::into)
    }

    pub async fn create_chat(
        &self,
        ad_id: AdId,
        initiator_token: &str,
        owner_token: &str,
        created_at: i64,
    ) -> Result<PrivateChat> {
        tracing::debug!(ad_id = ad_id.0, "Creating chat request");
        sqlx::query_as(
            "INSERT INTO private_chats \
             (ad_id, user_token_1, user_token_2, created_at, last_message_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(ad_id.0)
        .bind(initiator_token)
        .bind(owner_token)
        .bind(created_at)
        .bind(created_at)
        .fetch_one(self.pool())
        .await
        .map_err(Into::into)
    }

    pub async fn chat_by_id(&self, chat_id: ChatKey) -> Result<Option<PrivateChat>> {
        sqlx::query_as("SELECT * FROM private_chats WHERE id = ?")
            .bind(chat_id.0)
            .fetch_optional(self.pool())
            .await
            .map_err(Into::into)
    }

    /// Requests waiting for the ad owner's decision.
    pub async fn pending_chats(&self, owner_token: &str) -> Result<Vec<PrivateChat>> {
        sqlx::query_as(
            "SELECT * FROM private_chats \
             WHERE user_token_2 = ? AND accepted = 0 AND blocked_by IS NULL \
             ORDER BY created_at DESC",
        )
        .bind(owner_token)
        .fetch_all(self.pool())
        .await
        .map_err(Into::into)
    }

    /// Requests the user sent that are still undecided.
    pub async fn outgoing_requests(&self, initiator_token: &str) -> Result<Vec<PrivateChat>> {
        sqlx::query_as(
            "SELECT * FROM private_chats \
             WHERE user_token_1 = ? AND accepted = 0 AND blocked_by IS NULL \
             ORDER BY created_at DESC",
        )
        .bind(initiator_token)
        .fetch_all(self.pool())
        .await
        .map_err(Into::into)
    }

    pub async fn active_chats(&self, token: &str) -> Result<Vec<PrivateChat>> {
        sqlx::query_as(
            "SELECT * FROM private_chats \
             WHERE accepted = 1 AND blocked_by IS NULL \
               AND (user_token_1 = ? OR user_token_2 = ?) \
             ORDER BY last_message_at DESC",
        )
        .bind(token)
        .bind(token)
        .fetch_all(self.pool())
        .await
        .map_err(Into::into)
    }

    pub async fn count_pending(&self, owner_token: &str) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM private_chats \
             WHERE user_token_2 = ? AND accepted = 0 AND blocked_by IS NULL",
        )
        .bind(owner_token)
        .fetch_one(self.pool())
        .await
        .map_err(Into::into)
    }

    /// Only the ad owner can accept, and only while the request is
    /// still pending.
    pub async fn accept_chat(&self, chat_id: ChatKey, responder_token: &str) -> Result<bool> {
        tracing::debug!(chat_id = chat_id.0, "Accepting chat request");
        let result = sqlx::query(
            "UPDATE private_chats SET accepted = 1 \
             WHERE id = ? AND user_token_2 = ? AND accepted = 0 AND blocked_by IS NULL",
        )
        .bind(chat_id.0)
        .bind(responder_token)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Rejecting removes the pending chat and anything sent into it.
    pub async fn reject_chat(&self, chat_id: ChatKey, responder_token: &str) -> Result<bool> {
        tracing::debug!(chat_id = chat_id.0, "Rejecting chat request");
        let mut tx = self.pool().begin().await?;
        let result = sqlx::query(
            "DELETE FROM private_chats \
             WHERE id = ? AND user_token_2 = ? AND accepted = 0",
        )
        .bind(chat_id.0)
        .bind(responder_token)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        sqlx::query("DELETE FROM messages WHERE chat_id = ?")
            .bind(chat_id.0)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Either participant can block. A blocked chat keeps its history
    /// but rejects new messages until the same user unblocks.
    pub async fn block_chat(&self, chat_id: ChatKey, blocker_token: &str) -> Result<bool> {
        tracing::debug!(chat_id = chat_id.0, "Blocking chat");
        let result = sqlx::query(
            "UPDATE private_chats SET blocked_by = ? \
             WHERE id = ? AND (user_token_1 = ? OR user_token_2 = ?) AND blocked_by IS NULL",
        )
        .bind(blocker_token)
        .bind(chat_id.0)
        .bind(blocker_token)
        .bind(blocker_token)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Only the user who placed the block can lift it.
    pub async fn unblock_chat(&self, chat_id: ChatKey, blocker_token: &str) -> Result<bool> {
        tracing::debug!(chat_id = chat_id.0, "Unblocking chat");
        let result = sqlx::query(
            "UPDATE private_chats SET blocked_by = NULL WHERE id = ? AND blocked_by = ?",
        )
        .bind(chat_id.0)
        .bind(blocker_token)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn touch_chat(&self, chat_id: ChatKey, at: i64) -> Result<()> {
        sqlx::query("UPDATE private_chats SET last_message_at = ? WHERE id = ?")
            .bind(at)
            .bind(chat_id.0)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Drop chats idle since before `cutoff` together with their
    /// messages. Used by the retention sweep.
    pub async fn delete_inactive_chats(&self, cutoff: i64) -> Result<u64> {
        let mut tx = self.pool().begin().await?;
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM private_chats WHERE last_message_at < ?")
                .bind(cutoff)
                .fetch_all(&mut *tx)
                .await?;
        if ids.is_empty() {
            return Ok(0);
        }

        let mut builder = sqlx::QueryBuilder::new("DELETE FROM messages WHERE chat_id IN (");
        let mut separated = builder.separated(", ");
        for id in &ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");
        builder.build().execute(&mut *tx).await?;

        sqlx::query("DELETE FROM private_chats WHERE last_message_at < ?")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::debug!(deleted = ids.len(), "Removed inactive chats");
        Ok(ids.len() as u64)
    }
}

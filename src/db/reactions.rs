use super::Database;
use anyhow::Result;

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, serde::Serialize)]
pub struct ReactionCount {
    pub message_id: i64,
    pub emoji: String,
    pub count: i64,
}

impl Database {
    /// Set or replace the user's reaction on a message.
    pub async fn set_reaction(
        &self,
        message_id: i64,
        user_token: &str,
        emoji: &str,
        created_at: i64,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO message_reactions (message_id, user_token, emoji, created_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(message_id, user_token) DO UPDATE SET \
               emoji = excluded.emoji, created_at = excluded.created_at",
        )
        .bind(message_id)
        .bind(user_token)
        .bind(emoji)
        .bind(created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn remove_reaction(&self, message_id: i64, user_token: &str) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM message_reactions WHERE message_id = ? AND user_token = ?")
                .bind(message_id)
                .bind(user_token)
                .execute(self.pool())
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Aggregated reactions for a batch of messages.
    pub async fn reactions_for(&self, message_ids: &[i64]) -> Result<Vec<ReactionCount>> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder = sqlx::QueryBuilder::new(
            "SELECT message_id, emoji, COUNT(*) AS count FROM message_reactions \
             WHERE message_id IN (",
        );
        let mut separated = builder.separated(", ");
        for id in message_ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(") GROUP BY message_id, emoji ORDER BY message_id, emoji");
        builder
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::util::init_test_db;

    #[tokio::test]
    async fn reaction_is_replaced_not_duplicated() -> Result<()> {
        let db = init_test_db().await;
        db.set_reaction(1, "alice", "❤️", 10).await?;
        db.set_reaction(1, "alice", "🔥", 20).await?;
        db.set_reaction(1, "bob", "🔥", 30).await?;

        let counts = db.reactions_for(&[1]).await?;
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].emoji, "🔥");
        assert_eq!(counts[0].count, 2);
        Ok(())
    }

    #[tokio::test]
    async fn remove_reaction_only_for_owner() -> Result<()> {
        let db = init_test_db().await;
        db.set_reaction(1, "alice", "❤️", 10).await?;

        assert!(!db.remove_reaction(1, "bob").await?);
        assert!(db.remove_reaction(1, "alice").await?);
        assert!(db.reactions_for(&[1]).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn batch_lookup_spans_messages() -> Result<()> {
        let db = init_test_db().await;
        db.set_reaction(1, "alice", "❤️", 10).await?;
        db.set_reaction(2, "alice", "👍", 20).await?;

        let counts = db.reactions_for(&[1, 2, 3]).await?;
        assert_eq!(counts.len(), 2);
        assert!(db.reactions_for(&[]).await?.is_empty());
        Ok(())
    }
}

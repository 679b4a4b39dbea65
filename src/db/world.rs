use super::Database;
use anyhow::Result;

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, serde::Serialize)]
pub struct WorldMessage {
    pub id: i64,
    pub user_token: String,
    pub nickname: String,
    pub text: String,
    pub created_at: i64,
}

impl Database {
    pub async fn add_world_message(
        &self,
        user_token: &str,
        nickname: &str,
        text: &str,
        created_at: i64,
    ) -> Result<WorldMessage> {
        tracing::trace!("Adding world chat message");
        sqlx::query_as(
            "INSERT INTO world_messages (user_token, nickname, text, created_at) \
             VALUES (?, ?, ?, ?) RETURNING *",
        )
        .bind(user_token)
        .bind(nickname)
        .bind(text)
        .bind(created_at)
        .fetch_one(self.pool())
        .await
        .map_err(Into::into)
    }

    /// Latest `limit` messages in chronological order.
    pub async fn list_world_messages(&self, limit: i64) -> Result<Vec<WorldMessage>> {
        sqlx::query_as(
            "SELECT * FROM \
             (SELECT * FROM world_messages ORDER BY id DESC LIMIT ?) \
             ORDER BY id ASC",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(Into::into)
    }

    pub async fn delete_old_world_messages(&self, cutoff: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM world_messages WHERE created_at < ?")
            .bind(cutoff)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::util::init_test_db;

    #[tokio::test]
    async fn world_chat_keeps_order_and_limit() -> Result<()> {
        let db = init_test_db().await;
        for n in 0..5 {
            db.add_world_message("alice", "Кот", &format!("m{n}"), n)
                .await?;
        }

        let recent = db.list_world_messages(3).await?;
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].text, "m2");
        assert_eq!(recent[2].text, "m4");
        Ok(())
    }

    #[tokio::test]
    async fn world_chat_retention() -> Result<()> {
        let db = init_test_db().await;
        db.add_world_message("alice", "Кот", "old", 10).await?;
        db.add_world_message("alice", "Кот", "new", 900).await?;

        assert_eq!(db.delete_old_world_messages(500).await?, 1);
        let left = db.list_world_messages(10).await?;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].text, "new");
        Ok(())
    }
}

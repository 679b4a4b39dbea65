use super::Database;
use anyhow::Result;

/// User-level block list, independent of per-chat blocks.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, serde::Serialize)]
pub struct UserBlock {
    pub id: i64,
    pub blocker_token: String,
    pub blocked_token: String,
    pub blocked_display_nickname: String,
    pub created_at: i64,
}

impl Database {
    pub async fn block_user(
        &self,
        blocker_token: &str,
        blocked_token: &str,
        blocked_display_nickname: &str,
        created_at: i64,
    ) -> Result<bool> {
        tracing::debug!("Adding user block");
        let result = sqlx::query(
            "INSERT OR IGNORE INTO user_blocks \
             (blocker_token, blocked_token, blocked_display_nickname, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(blocker_token)
        .bind(blocked_token)
        .bind(blocked_display_nickname)
        .bind(created_at)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn unblock_user(&self, blocker_token: &str, blocked_token: &str) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM user_blocks WHERE blocker_token = ? AND blocked_token = ?")
                .bind(blocker_token)
                .bind(blocked_token)
                .execute(self.pool())
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_blocks(&self, blocker_token: &str) -> Result<Vec<UserBlock>> {
        sqlx::query_as(
            "SELECT * FROM user_blocks WHERE blocker_token = ? ORDER BY created_at DESC",
        )
        .bind(blocker_token)
        .fetch_all(self.pool())
        .await
        .map_err(Into::into)
    }

    /// True when either side has blocked the other.
    pub async fn is_blocked_between(&self, token_a: &str, token_b: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_blocks \
             WHERE (blocker_token = ? AND blocked_token = ?) \
                OR (blocker_token = ? AND blocked_token = ?)",
        )
        .bind(token_a)
        .bind(token_b)
        .bind(token_b)
        .bind(token_a)
        .fetch_one(self.pool())
        .await?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::util::init_test_db;

    #[tokio::test]
    async fn block_is_idempotent() -> Result<()> {
        let db = init_test_db().await;
        assert!(db.block_user("alice", "bob", "Боб", 100).await?);
        assert!(!db.block_user("alice", "bob", "Боб", 200).await?);

        let blocks = db.list_blocks("alice").await?;
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].created_at, 100);
        Ok(())
    }

    #[tokio::test]
    async fn block_works_in_either_direction() -> Result<()> {
        let db = init_test_db().await;
        db.block_user("alice", "bob", "Боб", 100).await?;

        assert!(db.is_blocked_between("alice", "bob").await?);
        assert!(db.is_blocked_between("bob", "alice").await?);
        assert!(!db.is_blocked_between("alice", "carol").await?);
        Ok(())
    }

    #[tokio::test]
    async fn unblock_removes_only_own_entry() -> Result<()> {
        let db = init_test_db().await;
        db.block_user("alice", "bob", "Боб", 100).await?;

        assert!(!db.unblock_user("bob", "alice").await?);
        assert!(db.unblock_user("alice", "bob").await?);
        assert!(!db.is_blocked_between("alice", "bob").await?);
        Ok(())
    }
}

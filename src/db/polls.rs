use super::Database;
use anyhow::Result;

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, serde::Serialize)]
pub struct AnswerCount {
    pub answer: String,
    pub votes: i64,
}

impl Database {
    /// One vote per user per poll. Returns false when the user voted
    /// before.
    pub async fn record_vote(
        &self,
        poll_id: &str,
        user_token: &str,
        answer: &str,
        created_at: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO poll_votes (poll_id, user_token, answer, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(poll_id)
        .bind(user_token)
        .bind(answer)
        .bind(created_at)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn poll_results(&self, poll_id: &str) -> Result<Vec<AnswerCount>> {
        sqlx::query_as(
            "SELECT answer, COUNT(*) AS votes FROM poll_votes \
             WHERE poll_id = ? GROUP BY answer ORDER BY votes DESC, answer ASC",
        )
        .bind(poll_id)
        .fetch_all(self.pool())
        .await
        .map_err(Into::into)
    }

    pub async fn user_vote(&self, poll_id: &str, user_token: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT answer FROM poll_votes WHERE poll_id = ? AND user_token = ?")
            .bind(poll_id)
            .bind(user_token)
            .fetch_optional(self.pool())
            .await
            .map_err(Into::into)
    }
}

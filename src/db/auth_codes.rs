use super::Database;
use anyhow::Result;

/// One-time login code handed out by the Telegram bot. `user_data` is
/// the serialized Telegram profile captured at generation time.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct AuthCode {
    pub code: String,
    pub telegram_id: i64,
    pub user_data: String,
    pub expires_at: i64,
    pub created_at: i64,
}

/// Outcome of a one-shot code lookup. Expired is distinct from missing
/// so the API can answer 410 instead of 401.
#[derive(Debug, Clone, PartialEq)]
pub enum CodeLookup {
    Valid(AuthCode),
    Expired,
    Missing,
}

impl Database {
    pub async fn store_auth_code(
        &self,
        code: &str,
        telegram_id: i64,
        user_data: &str,
        expires_at: i64,
        created_at: i64,
    ) -> Result<()> {
        tracing::debug!(telegram_id, "Storing auth code");
        sqlx::query(
            "INSERT OR REPLACE INTO auth_codes \
             (code, telegram_id, user_data, expires_at, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(code)
        .bind(telegram_id)
        .bind(user_data)
        .bind(expires_at)
        .bind(created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// One-shot lookup. The code is deleted whether it verified or
    /// expired, so a second attempt always misses.
    pub async fn consume_auth_code(&self, code: &str, now: i64) -> Result<CodeLookup> {
        let mut tx = self.pool().begin().await?;
        let found: Option<AuthCode> = sqlx::query_as("SELECT * FROM auth_codes WHERE code = ?")
            .bind(code)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(found) = found else {
            return Ok(CodeLookup::Missing);
        };
        sqlx::query("DELETE FROM auth_codes WHERE code = ?")
            .bind(code)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        if found.expires_at < now {
            tracing::debug!(telegram_id = found.telegram_id, "Auth code expired");
            return Ok(CodeLookup::Expired);
        }
        Ok(CodeLookup::Valid(found))
    }

    pub async fn purge_expired_codes(&self, now: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM auth_codes WHERE expires_at < ?")
            .bind(now)
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
    async fn code_is_single_use() -> Result<()> {
        let db = init_test_db().await;
        db.store_auth_code("1234", 42, "{}", 1000, 500).await?;

        match db.consume_auth_code("1234", 600).await? {
            CodeLookup::Valid(found) => assert_eq!(found.telegram_id, 42),
            other => panic!("expected valid code, got {other:?}"),
        }
        assert_eq!(db.consume_auth_code("1234", 600).await?, CodeLookup::Missing);
        Ok(())
    }

    #[tokio::test]
    async fn expired_code_is_reported_and_burned() -> Result<()> {
        let db = init_test_db().await;
        db.store_auth_code("1234", 42, "{}", 1000, 500).await?;

        assert_eq!(db.consume_auth_code("1234", 2000).await?, CodeLookup::Expired);
        // the row is gone even though verification failed
        assert_eq!(db.consume_auth_code("1234", 600).await?, CodeLookup::Missing);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_code() -> Result<()> {
        let db = init_test_db().await;
        assert_eq!(db.consume_auth_code("0000", 0).await?, CodeLookup::Missing);
        Ok(())
    }

    #[tokio::test]
    async fn purge_removes_only_expired() -> Result<()> {
        let db = init_test_db().await;
        db.store_auth_code("old", 1, "{}", 100, 50).await?;
        db.store_auth_code("new", 2, "{}", 9000, 50).await?;

        assert_eq!(db.purge_expired_codes(500).await?, 1);
        assert!(matches!(
            db.consume_auth_code("new", 500).await?,
            CodeLookup::Valid(_)
        ));
        Ok(())
    }
}

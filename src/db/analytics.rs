use super::Database;
use anyhow::Result;

impl Database {
    pub async fn record_visit(
        &self,
        user_id: Option<&str>,
        page: &str,
        user_agent: &str,
        ip_address: &str,
        country: Option<&str>,
        city: Option<&str>,
        created_at: i64,
    ) -> Result<()> {
        tracing::trace!(page, "Recording page visit");
        sqlx::query(
            "INSERT INTO page_visits \
             (user_id, page, user_agent, ip_address, country, city, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(page)
        .bind(user_agent)
        .bind(ip_address)
        .bind(country)
        .bind(city)
        .bind(created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn increment_stat(&self, metric_name: &str, now: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO site_stats (metric_name, metric_value, updated_at) VALUES (?, 1, ?) \
             ON CONFLICT(metric_name) DO UPDATE SET \
               metric_value = metric_value + 1, updated_at = excluded.updated_at",
        )
        .bind(metric_name)
        .bind(now)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn stat(&self, metric_name: &str) -> Result<i64> {
        let value: Option<i64> =
            sqlx::query_scalar("SELECT metric_value FROM site_stats WHERE metric_name = ?")
                .bind(metric_name)
                .fetch_optional(self.pool())
                .await?;
        Ok(value.unwrap_or(0))
    }

    pub async fn total_visits(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM page_visits")
            .fetch_one(self.pool())
            .await
            .map_err(Into::into)
    }

    pub async fn unique_visitors(&self) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(DISTINCT user_id) FROM page_visits WHERE user_id IS NOT NULL",
        )
        .fetch_one(self.pool())
        .await
        .map_err(Into::into)
    }

    pub async fn visits_since(&self, cutoff: i64) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM page_visits WHERE created_at >= ?")
            .bind(cutoff)
            .fetch_one(self.pool())
            .await
            .map_err(Into::into)
    }
}

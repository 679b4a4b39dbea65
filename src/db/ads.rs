use super::{AdId, Database};
use anyhow::Result;

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, serde::Serialize)]
pub struct Ad {
    pub id: i64,
    pub user_token: String,
    pub tg_id: Option<i64>,
    pub gender: String,
    pub target: String,
    pub goal: String,
    pub age_from: Option<i64>,
    pub age_to: Option<i64>,
    pub my_age: Option<i64>,
    pub body_type: Option<String>,
    pub text: String,
    pub country: String,
    pub region: String,
    pub city: String,
    pub is_pinned: bool,
    pub pinned_until: Option<i64>,
    pub created_at: i64,
}

pub struct NewAd<'a> {
    pub user_token: &'a str,
    pub tg_id: Option<i64>,
    pub gender: &'a str,
    pub target: &'a str,
    pub goal: &'a str,
    pub age_from: Option<i64>,
    pub age_to: Option<i64>,
    pub my_age: Option<i64>,
    pub body_type: Option<&'a str>,
    pub text: &'a str,
    pub country: &'a str,
    pub region: &'a str,
    pub city: &'a str,
}

impl Database {
    pub async fn create_ad(&self, new: &NewAd<'_>, created_at: i64) -> Result<Ad> {
        tracing::debug!(city = %new.city, "Creating ad");
        sqlx::query_as(
            "INSERT INTO ads \
             (user_token, tg_id, gender, target, goal, age_from, age_to, my_age, \
              body_type, text, country, region, city, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(new.user_token)
        .bind(new.tg_id)
        .bind(new.gender)
        .bind(new.target)
        .bind(new.goal)
        .bind(new.age_from)
        .bind(new.age_to)
        .bind(new.my_age)
        .bind(new.body_type)
        .bind(new.text)
        .bind(new.country)
        .bind(new.region)
        .bind(new.city)
        .bind(created_at)
        .fetch_one(self.pool())
        .await
        .map_err(Into::into)
    }

    /// Feed listing. Pinned ads float to the top, the rest sort by
    /// recency.
    pub async fn list_ads(
        &self,
        city: Option<&str>,
        country: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Ad>> {
        let mut builder = sqlx::QueryBuilder::new("SELECT * FROM ads WHERE 1 = 1");
        if let Some(city) = city {
            builder.push(" AND city = ").push_bind(city);
        }
        if let Some(country) = country {
            builder.push(" AND country = ").push_bind(country);
        }
        builder
            .push(" ORDER BY is_pinned DESC, created_at DESC LIMIT ")
            .push_bind(limit);
        builder
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(Into::into)
    }

    pub async fn ad_by_id(&self, ad_id: AdId) -> Result<Option<Ad>> {
        sqlx::query_as("SELECT * FROM ads WHERE id = ?")
            .bind(ad_id.0)
            .fetch_optional(self.pool())
            .await
            .map_err(Into::into)
    }

    pub async fn ads_by_user(&self, user_token: &str) -> Result<Vec<Ad>> {
        sqlx::query_as("SELECT * FROM ads WHERE user_token = ? ORDER BY created_at DESC")
            .bind(user_token)
            .fetch_all(self.pool())
            .await
            .map_err(Into::into)
    }

    /// Telegram id from the user's most recent ad. Notification
    /// fallback for ad owners who never went through an auth flow.
    pub async fn tg_id_from_ads(&self, user_token: &str) -> Result<Option<i64>> {
        sqlx::query_scalar(
            "SELECT tg_id FROM ads \
             WHERE user_token = ? AND tg_id IS NOT NULL \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_token)
        .fetch_optional(self.pool())
        .await
        .map_err(Into::into)
    }

    /// Delete an ad the caller owns, cascading to its chats and their
    /// messages.
    pub async fn delete_ad(&self, ad_id: AdId, user_token: &str) -> Result<bool> {
        tracing::debug!(ad_id = ad_id.0, "Deleting ad");
        let mut tx = self.pool().begin().await?;
        let deleted = sqlx::query("DELETE FROM ads WHERE id = ? AND user_token = ?")
            .bind(ad_id.0)
            .bind(user_token)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Ok(false);
        }

        let chat_ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM private_chats WHERE ad_id = ?")
            .bind(ad_id.0)
            .fetch_all(&mut *tx)
            .await?;
        if !chat_ids.is_empty() {
            let mut builder = sqlx::QueryBuilder::new("DELETE FROM messages WHERE chat_id IN (");
            let mut separated = builder.separated(", ");
            for id in &chat_ids {
                separated.push_bind(id);
            }
            separated.push_unseparated(")");
            builder.build().execute(&mut *tx).await?;
        }
        sqlx::query("DELETE FROM private_chats WHERE ad_id = ?")
            .bind(ad_id.0)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Premium feature: keep the ad at the top of the feed until
    /// `until`.
    pub async fn pin_ad(&self, ad_id: AdId, user_token: &str, until: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE ads SET is_pinned = 1, pinned_until = ? WHERE id = ? AND user_token = ?",
        )
        .bind(until)
        .bind(ad_id.0)
        .bind(user_token)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn unpin_expired_ads(&self, now: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE ads SET is_pinned = 0, pinned_until = NULL \
             WHERE is_pinned = 1 AND pinned_until IS NOT NULL AND pinned_until < ?",
        )
        .bind(now)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }

    /// Retention sweep. Removes ads created before `cutoff` with
    /// everything hanging off them.
    pub async fn delete_old_ads(&self, cutoff: i64) -> Result<u64> {
        let mut tx = self.pool().begin().await?;
        let ad_ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM ads WHERE created_at < ?")
            .bind(cutoff)
            .fetch_all(&mut *tx)
            .await?;
        if ad_ids.is_empty() {
            return Ok(0);
        }

        let chat_ids: Vec<i64> = {
            let mut builder =
                sqlx::QueryBuilder::new("SELECT id FROM private_chats WHERE ad_id IN (");
            let mut separated = builder.separated(", ");
            for id in &ad_ids {
                separated.push_bind(id);
            }
            separated.push_unseparated(")");
            builder
                .build_query_scalar()
                .fetch_all(&mut *tx)
                .await?
        };

        if !chat_ids.is_empty() {
            let mut builder = sqlx::QueryBuilder::new("DELETE FROM messages WHERE chat_id IN (");
            let mut separated = builder.separated(", ");
            for id in &chat_ids {
                separated.push_bind(id);
            }
            separated.push_unseparated(")");
            builder.build().execute(&mut *tx).await?;

            let mut builder =
                sqlx::QueryBuilder::new("DELETE FROM private_chats WHERE id IN (");
            let mut separated = builder.separated(", ");
            for id in &chat_ids {
                separated.push_bind(id);
            }
            separated.push_unseparated(")");
            builder.build().execute(&mut *tx).await?;
        }

        let mut builder = sqlx::QueryBuilder::new("DELETE FROM ads WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in &ad_ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");
        builder.build().execute(&mut *tx).await?;
        tx.commit().await?;
        tracing::debug!(deleted = ad_ids.len(), "Removed expired ads");
        Ok(ad_ids.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ChatKey;
    use crate::tests::util::init_test_db;

    fn sample_ad<'a>(user_token: &'a str, city: &'a str) -> NewAd<'a> {
        NewAd {
            user_token,
            tg_id: Some(42),
            gender: "Парень",
            target: "Девушку",
            goal: "Отношения",
            age_from: Some(20),
            age_to: Some(30),
            my_age: Some(25),
            body_type: None,
            text: "Привет, ищу собеседника",
            country: "Россия",
            region: "Московская область",
            city,
        }
    }

    #[tokio::test]
    async fn ad_create_and_fetch() -> Result<()> {
        let db = init_test_db().await;
        let ad = db.create_ad(&sample_ad("alice", "Москва"), 100).await?;
        assert_eq!(ad.city, "Москва");
        assert!(!ad.is_pinned);

        let fetched = db.ad_by_id(AdId(ad.id)).await?;
        assert_eq!(fetched, Some(ad));
        Ok(())
    }

    #[tokio::test]
    async fn listing_filters_by_city() -> Result<()> {
        let db = init_test_db().await;
        db.create_ad(&sample_ad("alice", "Москва"), 100).await?;
        db.create_ad(&sample_ad("bob", "Казань"), 200).await?;

        let moscow = db.list_ads(Some("Москва"), None, 50).await?;
        assert_eq!(moscow.len(), 1);
        assert_eq!(moscow[0].user_token, "alice");

        let all = db.list_ads(None, None, 50).await?;
        assert_eq!(all.len(), 2);
        // newest first
        assert_eq!(all[0].user_token, "bob");
        Ok(())
    }

    #[tokio::test]
    async fn pinned_ads_come_first() -> Result<()> {
        let db = init_test_db().await;
        let old = db.create_ad(&sample_ad("alice", "Москва"), 100).await?;
        db.create_ad(&sample_ad("bob", "Москва"), 200).await?;
        assert!(db.pin_ad(AdId(old.id), "alice", 10_000).await?);

        let ads = db.list_ads(Some("Москва"), None, 50).await?;
        assert_eq!(ads[0].id, old.id);

        let unpinned = db.unpin_expired_ads(20_000).await?;
        assert_eq!(unpinned, 1);
        let ads = db.list_ads(Some("Москва"), None, 50).await?;
        assert_eq!(ads[0].user_token, "bob");
        Ok(())
    }

    #[tokio::test]
    async fn tg_id_comes_from_latest_ad() -> Result<()> {
        let db = init_test_db().await;
        assert_eq!(db.tg_id_from_ads("alice").await?, None);

        db.create_ad(&sample_ad("alice", "Москва"), 100).await?;
        let mut newer = sample_ad("alice", "Казань");
        newer.tg_id = Some(777);
        db.create_ad(&newer, 200).await?;

        assert_eq!(db.tg_id_from_ads("alice").await?, Some(777));
        Ok(())
    }

    #[tokio::test]
    async fn delete_ad_cascades() -> Result<()> {
        let db = init_test_db().await;
        let ad = db.create_ad(&sample_ad("alice", "Москва"), 100).await?;
        let chat = db.create_chat(AdId(ad.id), "bob", "alice", 100).await?;
        sqlx::query("INSERT INTO messages (chat_id, sender_token, message, created_at) VALUES (?, 'bob', 'hi', 1)")
            .bind(chat.id)
            .execute(db.pool())
            .await?;

        assert!(!db.delete_ad(AdId(ad.id), "bob").await?);
        assert!(db.delete_ad(AdId(ad.id), "alice").await?);

        assert!(db.ad_by_id(AdId(ad.id)).await?.is_none());
        assert!(db.chat_by_id(ChatKey(chat.id)).await?.is_none());
        let messages: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(db.pool())
            .await?;
        assert_eq!(messages, 0);
        Ok(())
    }

    #[tokio::test]
    async fn retention_cascades_from_ads() -> Result<()> {
        let db = init_test_db().await;
        let old = db.create_ad(&sample_ad("alice", "Москва"), 100).await?;
        let fresh = db.create_ad(&sample_ad("bob", "Москва"), 900).await?;
        let chat = db.create_chat(AdId(old.id), "bob", "alice", 100).await?;

        let removed = db.delete_old_ads(500).await?;
        assert_eq!(removed, 1);
        assert!(db.ad_by_id(AdId(old.id)).await?.is_none());
        assert!(db.ad_by_id(AdId(fresh.id)).await?.is_some());
        assert!(db.chat_by_id(ChatKey(chat.id)).await?.is_none());
        Ok(())
    }
}

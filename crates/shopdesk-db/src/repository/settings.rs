//! # Settings Repository
//!
//! JSON documents stored by key. Missing keys read as defaults.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use shopdesk_core::BusinessSettings;

pub const BUSINESS_KEY: &str = "business";
pub const APP_KEY: &str = "app";

pub(crate) async fn put_json<T: Serialize>(
    conn: &mut SqliteConnection,
    key: &str,
    value: &T,
) -> DbResult<()> {
    let json = serde_json::to_string(value)?;

    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
        ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(json)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        let raw: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(raw.map(|r| serde_json::from_str(&r)).transpose()?)
    }

    async fn put<T: Serialize>(&self, key: &str, value: &T) -> DbResult<()> {
        debug!(key = %key, "Saving settings");
        let mut conn = self.pool.acquire().await?;
        put_json(&mut conn, key, value).await
    }

    pub async fn business(&self) -> DbResult<BusinessSettings> {
        Ok(self.get_json(BUSINESS_KEY).await?.unwrap_or_default())
    }

    pub async fn put_business(&self, settings: &BusinessSettings) -> DbResult<()> {
        self.put(BUSINESS_KEY, settings).await
    }

    /// UI preferences. An empty object until something is saved.
    pub async fn app(&self) -> DbResult<serde_json::Value> {
        Ok(self
            .get_json(APP_KEY)
            .await?
            .unwrap_or_else(|| serde_json::json!({})))
    }

    pub async fn put_app(&self, settings: &serde_json::Value) -> DbResult<()> {
        self.put(APP_KEY, settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::db;
    use serde_json::json;

    #[tokio::test]
    async fn test_defaults_then_round_trip() {
        let db = db().await;
        let repo = db.settings();

        assert_eq!(repo.business().await.unwrap(), BusinessSettings::default());
        assert_eq!(repo.app().await.unwrap(), json!({}));

        let mut business = BusinessSettings::default();
        business.business_name = "Corner Shop".into();
        business.low_stock_threshold = 3;
        repo.put_business(&business).await.unwrap();
        repo.put_business(&business).await.unwrap();
        assert_eq!(repo.business().await.unwrap().business_name, "Corner Shop");

        repo.put_app(&json!({"theme": "dark"})).await.unwrap();
        assert_eq!(repo.app().await.unwrap()["theme"], "dark");
    }
}

//! SQLite-based durable tier
//!
//! Stores one row per cache key with the serialized payload and its
//! freshness window. Quota is enforced on the summed payload sizes.

use crate::cache::traits::TierStore;
use crate::cache::{CacheEntry, CacheKey, TierKind};
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;

/// SQLite-backed cache tier
pub struct SqliteTier {
    pool: SqlitePool,
    quota_bytes: Option<u64>,
}

impl SqliteTier {
    /// Open (or create) the database at `db_path`
    pub async fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::io("durable", format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let connect_options =
            SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
                .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await
            .map_err(|e| {
                StorageError::io("durable", format!("Failed to connect to cache database: {e}"))
            })?;

        Self::initialize_schema(&pool).await?;

        Ok(Self {
            pool,
            quota_bytes: None,
        })
    }

    /// In-memory database, mostly for tests
    pub async fn in_memory() -> Result<Self> {
        // A single connection, otherwise every pooled connection gets its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::initialize_schema(&pool).await?;
        Ok(Self {
            pool,
            quota_bytes: None,
        })
    }

    /// Limit the total serialized size of stored entries
    pub fn with_quota(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
        let schema = r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                cache_key TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                data TEXT NOT NULL,
                stored_at INTEGER NOT NULL,
                ttl INTEGER NOT NULL,
                size_bytes INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cache_collection
                ON cache_entries(collection);

            CREATE INDEX IF NOT EXISTS idx_cache_stored_at
                ON cache_entries(stored_at);
        "#;

        sqlx::raw_sql(schema).execute(pool).await.map_err(|e| {
            StorageError::io("durable", format!("Failed to initialize cache schema: {e}"))
        })?;

        Ok(())
    }

    async fn used_bytes_excluding(&self, key: &CacheKey) -> Result<u64> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(size_bytes), 0) AS used FROM cache_entries WHERE cache_key != ?",
        )
        .bind(key.as_str())
        .fetch_one(&self.pool)
        .await?;

        let used: i64 = row.try_get("used")?;
        Ok(used.max(0) as u64)
    }
}

#[async_trait]
impl TierStore for SqliteTier {
    fn kind(&self) -> TierKind {
        TierKind::Durable
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let row = sqlx::query("SELECT data, stored_at, ttl FROM cache_entries WHERE cache_key = ?")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let data: String = row.try_get("data")?;
        let stored_at: i64 = row.try_get("stored_at")?;
        let ttl: i64 = row.try_get("ttl")?;

        let data = serde_json::from_str(&data)
            .map_err(|e| StorageError::corrupt(key.as_str(), e.to_string()))?;
        let ttl = u64::try_from(ttl)
            .map_err(|_| StorageError::corrupt(key.as_str(), format!("negative ttl {ttl}")))?;

        Ok(Some(CacheEntry::new(data, stored_at, ttl)))
    }

    async fn set(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()> {
        let data = serde_json::to_string(entry.data())?;
        let size = (key.as_str().len() + data.len()) as u64;

        if let Some(quota) = self.quota_bytes {
            let required = self.used_bytes_excluding(key).await? + size;
            if required > quota {
                return Err(StorageError::quota_exceeded("durable", quota, required).into());
            }
        }

        sqlx::query(
            r#"
            INSERT INTO cache_entries (cache_key, collection, data, stored_at, ttl, size_bytes)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(cache_key) DO UPDATE SET
                data = excluded.data,
                stored_at = excluded.stored_at,
                ttl = excluded.ttl,
                size_bytes = excluded.size_bytes
            "#,
        )
        .bind(key.as_str())
        .bind(key.collection())
        .bind(data)
        .bind(entry.stored_at())
        .bind(i64::try_from(entry.ttl()).unwrap_or(i64::MAX))
        .bind(size as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<()> {
        sqlx::query("DELETE FROM cache_entries WHERE cache_key = ?")
            .bind(key.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_collection(&self, collection: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE collection = ?")
            .bind(collection)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn clear_oldest_entries(&self, fraction: f64) -> Result<u64> {
        let count = self.len().await?;
        if count == 0 {
            return Ok(0);
        }
        let evict = ((count as f64) * fraction).ceil().max(1.0) as i64;

        let result = sqlx::query(
            r#"
            DELETE FROM cache_entries WHERE cache_key IN (
                SELECT cache_key FROM cache_entries ORDER BY stored_at ASC LIMIT ?
            )
            "#,
        )
        .bind(evict)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM cache_entries")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM cache_entries")
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = row.try_get("total")?;
        Ok(total.max(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_round_trip_and_collection_delete() {
        let tier = SqliteTier::in_memory().await.unwrap();
        let zeus = CacheKey::document("deities", "zeus").unwrap();
        let moly = CacheKey::document("herbs", "moly").unwrap();
        let entry = CacheEntry::new(json!({"name": "Zeus"}), 7, 1000);

        tier.set(&zeus, &entry).await.unwrap();
        tier.set(&moly, &entry).await.unwrap();
        assert_eq!(tier.get(&zeus).await.unwrap(), Some(entry));

        assert_eq!(tier.delete_collection("deities").await.unwrap(), 1);
        assert!(tier.get(&zeus).await.unwrap().is_none());
        assert_eq!(tier.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_quota_then_evict_oldest() {
        let tier = SqliteTier::in_memory().await.unwrap().with_quota(120);
        let old = CacheKey::document("texts", "old").unwrap();
        let new = CacheKey::document("texts", "new").unwrap();

        tier.set(&old, &CacheEntry::new(json!("x".repeat(60)), 1, 10))
            .await
            .unwrap();
        let err = tier
            .set(&new, &CacheEntry::new(json!("y".repeat(60)), 2, 10))
            .await
            .unwrap_err();
        assert!(err.is_quota_exceeded());

        assert_eq!(tier.clear_oldest_entries(0.1).await.unwrap(), 1);
        tier.set(&new, &CacheEntry::new(json!("y".repeat(60)), 2, 10))
            .await
            .unwrap();
        assert!(tier.get(&old).await.unwrap().is_none());
    }
}

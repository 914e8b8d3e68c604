//! Search result cache persistence

use chordvault_common::time::{from_epoch_millis, to_epoch_millis};
use chordvault_common::{Result, SearchHit};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

/// Stored search cache entry
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCacheEntry {
    pub key: String,
    pub query: String,
    pub results: Vec<SearchHit>,
    pub timestamp: DateTime<Utc>,
    pub access_count: i64,
}

pub async fn load_entry(pool: &SqlitePool, key: &str) -> Result<Option<SearchCacheEntry>> {
    let row = sqlx::query(
        "SELECT key, query, results, timestamp, access_count FROM search_cache WHERE key = ?",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let results: String = row.try_get("results")?;
            Ok(Some(SearchCacheEntry {
                key: row.try_get("key")?,
                query: row.try_get("query")?,
                results: serde_json::from_str(&results)?,
                timestamp: from_epoch_millis(row.try_get("timestamp")?),
                access_count: row.try_get("access_count")?,
            }))
        }
        None => Ok(None),
    }
}

/// Insert or replace results for `key`; repeat writes count as accesses
pub async fn upsert_entry(
    pool: &SqlitePool,
    key: &str,
    query: &str,
    results: &[SearchHit],
    now: DateTime<Utc>,
) -> Result<()> {
    let results = serde_json::to_string(results)?;

    sqlx::query(
        r#"
        INSERT INTO search_cache (key, query, results, timestamp, access_count)
        VALUES (?, ?, ?, ?, 0)
        ON CONFLICT(key) DO UPDATE SET
            query = excluded.query,
            results = excluded.results,
            timestamp = excluded.timestamp,
            access_count = search_cache.access_count + 1
        "#,
    )
    .bind(key)
    .bind(query)
    .bind(results)
    .bind(to_epoch_millis(now))
    .execute(pool)
    .await?;

    Ok(())
}

/// Refresh timestamp and bump access count after a hit
pub async fn touch_entry(pool: &SqlitePool, key: &str, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE search_cache SET timestamp = ?, access_count = access_count + 1 WHERE key = ?",
    )
    .bind(to_epoch_millis(now))
    .bind(key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn delete_entry(pool: &SqlitePool, key: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM search_cache WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn count_entries(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM search_cache")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Delete the `excess` lowest-scoring entries
///
/// Score is `access_count * 0.7 + (timestamp / now) * 0.3`; ties go to the
/// older entry.
pub async fn evict_lowest(pool: &SqlitePool, excess: i64, now: DateTime<Utc>) -> Result<u64> {
    if excess <= 0 {
        return Ok(0);
    }

    let now_millis = to_epoch_millis(now).max(1) as f64;
    let result = sqlx::query(
        r#"
        DELETE FROM search_cache
        WHERE key IN (
            SELECT key FROM search_cache
            ORDER BY (access_count * 0.7 + (CAST(timestamp AS REAL) / ?) * 0.3) ASC,
                     timestamp ASC
            LIMIT ?
        )
        "#,
    )
    .bind(now_millis)
    .bind(excess)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn clear_entries(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM search_cache").execute(pool).await?;
    Ok(result.rows_affected())
}

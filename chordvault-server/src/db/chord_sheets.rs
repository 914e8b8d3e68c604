//! Chord sheet persistence
//!
//! Timestamps are stored as epoch milliseconds; `saved` as the TEXT values
//! `saved` / `unsaved`.

use chordvault_common::time::{from_epoch_millis, to_epoch_millis};
use chordvault_common::{ChordSheetRecord, Result, SavedState};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const SELECT_COLUMNS: &str = r#"
    SELECT path, artist, title, content, saved, timestamp, last_accessed,
           access_count, data_source, version, expires_at, deleted_at
    FROM chord_sheets
"#;

fn row_to_record(row: &SqliteRow) -> Result<ChordSheetRecord> {
    let saved: String = row.try_get("saved")?;
    let data_source: String = row.try_get("data_source")?;
    let expires_at: Option<i64> = row.try_get("expires_at")?;
    let deleted_at: Option<i64> = row.try_get("deleted_at")?;

    Ok(ChordSheetRecord {
        path: row.try_get("path")?,
        artist: row.try_get("artist")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        saved: saved.parse()?,
        timestamp: from_epoch_millis(row.try_get("timestamp")?),
        last_accessed: from_epoch_millis(row.try_get("last_accessed")?),
        access_count: row.try_get("access_count")?,
        data_source: data_source.parse()?,
        version: row.try_get("version")?,
        expires_at: expires_at.map(from_epoch_millis),
        deleted_at: deleted_at.map(from_epoch_millis),
    })
}

/// Load a chord sheet by normalized path, expired or not
pub async fn load_sheet(pool: &SqlitePool, path: &str) -> Result<Option<ChordSheetRecord>> {
    let row = sqlx::query(&format!("{} WHERE path = ?", SELECT_COLUMNS))
        .bind(path)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_record).transpose()
}

/// Insert or replace a chord sheet
///
/// An existing row keeps its `access_count`; `version` is bumped only when
/// the content changed.
pub async fn upsert_sheet(pool: &SqlitePool, record: &ChordSheetRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO chord_sheets (
            path, artist, title, content, saved, timestamp, last_accessed,
            access_count, data_source, version, expires_at, deleted_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(path) DO UPDATE SET
            artist = excluded.artist,
            title = excluded.title,
            content = excluded.content,
            saved = excluded.saved,
            timestamp = excluded.timestamp,
            last_accessed = excluded.last_accessed,
            data_source = excluded.data_source,
            version = CASE
                WHEN chord_sheets.content <> excluded.content THEN chord_sheets.version + 1
                ELSE chord_sheets.version
            END,
            expires_at = excluded.expires_at,
            deleted_at = excluded.deleted_at
        "#,
    )
    .bind(&record.path)
    .bind(&record.artist)
    .bind(&record.title)
    .bind(&record.content)
    .bind(record.saved.as_str())
    .bind(to_epoch_millis(record.timestamp))
    .bind(to_epoch_millis(record.last_accessed))
    .bind(record.access_count)
    .bind(record.data_source.as_str())
    .bind(record.version)
    .bind(record.expires_at.map(to_epoch_millis))
    .bind(record.deleted_at.map(to_epoch_millis))
    .execute(pool)
    .await?;

    Ok(())
}

/// Set the saved flag together with its lifecycle columns
///
/// Returns the number of rows touched.
pub async fn update_saved_state(
    pool: &SqlitePool,
    path: &str,
    saved: SavedState,
    expires_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE chord_sheets SET saved = ?, expires_at = ?, deleted_at = ? WHERE path = ?",
    )
    .bind(saved.as_str())
    .bind(expires_at.map(to_epoch_millis))
    .bind(deleted_at.map(to_epoch_millis))
    .bind(path)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Bump access statistics
pub async fn record_access(pool: &SqlitePool, path: &str, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE chord_sheets SET access_count = access_count + 1, last_accessed = ? WHERE path = ?",
    )
    .bind(to_epoch_millis(now))
    .bind(path)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Replace content, bumping `version`
pub async fn update_content(
    pool: &SqlitePool,
    path: &str,
    content: &str,
    timestamp: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE chord_sheets
        SET content = ?, version = version + 1, timestamp = ?, expires_at = ?
        WHERE path = ?
        "#,
    )
    .bind(content)
    .bind(to_epoch_millis(timestamp))
    .bind(expires_at.map(to_epoch_millis))
    .bind(path)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Delete one sheet if it is still expired at `now`
///
/// The expiry re-check keeps a purge from racing a concurrent save.
pub async fn delete_if_expired(pool: &SqlitePool, path: &str, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM chord_sheets
        WHERE path = ? AND saved = 'unsaved' AND expires_at IS NOT NULL AND expires_at <= ?
        "#,
    )
    .bind(path)
    .bind(to_epoch_millis(now))
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Delete every unsaved sheet whose expiry has passed
pub async fn delete_expired(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM chord_sheets
        WHERE saved = 'unsaved' AND expires_at IS NOT NULL AND expires_at < ?
        "#,
    )
    .bind(to_epoch_millis(now))
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn count_sheets(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chord_sheets")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

//! Database schema migrations
//!
//! Versioned, idempotent migrations tracked in the `schema_version` table.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the field depend on them
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Keep them idempotent** - safe to run on any database state
//! 4. **Prefer ALTER TABLE** over DROP/CREATE to preserve data

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Seven days in milliseconds, frozen for migration v2
const LEGACY_SHEET_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    if !table_exists(pool, "schema_version").await? {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?)",
    )
    .bind(table)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

async fn has_column(pool: &SqlitePool, table: &str, column: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?")
            .bind(table)
            .bind(column)
            .fetch_one(pool)
            .await?;

    Ok(count > 0)
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    Ok(())
}

/// Migration v1: add lifecycle columns missing from early chord_sheets tables
///
/// Early builds stored only path/artist/title/content/saved/timestamp.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v1: chord_sheets lifecycle columns");

    if !table_exists(pool, "chord_sheets").await? {
        info!("  chord_sheets table doesn't exist yet - skipping migration");
        return Ok(());
    }

    let columns = [
        ("last_accessed", "INTEGER NOT NULL DEFAULT 0"),
        ("access_count", "INTEGER NOT NULL DEFAULT 0"),
        ("data_source", "TEXT NOT NULL DEFAULT 'scrape'"),
        ("version", "INTEGER NOT NULL DEFAULT 1"),
        ("expires_at", "INTEGER"),
        ("deleted_at", "INTEGER"),
    ];

    for (column, ddl) in columns {
        if has_column(pool, "chord_sheets", column).await? {
            continue;
        }
        let sql = format!("ALTER TABLE chord_sheets ADD COLUMN {} {}", column, ddl);
        sqlx::query(&sql).execute(pool).await?;
        info!("  ✓ Added {} column to chord_sheets", column);
    }

    Ok(())
}

/// Migration v2: canonicalize the saved flag
///
/// Older data stored `saved` as a boolean, a 0/1 number or assorted strings.
/// Every row is rewritten to `'saved'`/`'unsaved'`, saved rows lose any
/// expiry, and unsaved rows without one get the 7-day TTL.
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v2: canonical saved flag");

    if !table_exists(pool, "chord_sheets").await? {
        info!("  chord_sheets table doesn't exist yet - skipping migration");
        return Ok(());
    }

    let rewritten = sqlx::query(
        r#"
        UPDATE chord_sheets
        SET saved = CASE
            WHEN lower(trim(CAST(saved AS TEXT))) IN ('1', 'true', 'yes', 'y', 'saved') THEN 'saved'
            ELSE 'unsaved'
        END
        WHERE saved IS NULL OR CAST(saved AS TEXT) NOT IN ('saved', 'unsaved')
        "#,
    )
    .execute(pool)
    .await?
    .rows_affected();

    sqlx::query(
        "UPDATE chord_sheets SET expires_at = NULL, deleted_at = NULL WHERE saved = 'saved'",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "UPDATE chord_sheets SET expires_at = timestamp + ? WHERE saved = 'unsaved' AND expires_at IS NULL",
    )
    .bind(LEGACY_SHEET_TTL_MS)
    .execute(pool)
    .await?;

    info!("  ✓ Canonicalized saved flag on {} rows", rewritten);
    Ok(())
}

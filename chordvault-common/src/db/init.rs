//! Database initialization
//!
//! Creates the SQLite database on first run, creates tables idempotently and
//! then applies versioned migrations.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// Every connection to `sqlite::memory:` is a separate database, so the pool
/// is pinned to one connection that never idles out.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables (idempotent) and run pending migrations
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_chord_sheets_table(pool).await?;
    create_search_cache_table(pool).await?;
    create_artists_table(pool).await?;

    // Migrations run after CREATE TABLE IF NOT EXISTS so that they only
    // have to deal with tables created by older builds
    crate::db::migrations::run_migrations(pool).await?;

    // Indexes last: legacy tables only gain the indexed columns in migration v1
    create_indexes(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Local record store table
///
/// Timestamps are epoch milliseconds. `saved` holds the canonical
/// `'saved'`/`'unsaved'` values only.
pub async fn create_chord_sheets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chord_sheets (
            path TEXT PRIMARY KEY,
            artist TEXT NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            saved TEXT NOT NULL DEFAULT 'unsaved' CHECK (saved IN ('saved', 'unsaved')),
            timestamp INTEGER NOT NULL,
            last_accessed INTEGER NOT NULL,
            access_count INTEGER NOT NULL DEFAULT 0,
            data_source TEXT NOT NULL DEFAULT 'scrape' CHECK (data_source IN ('scrape', 'upload', 'api')),
            version INTEGER NOT NULL DEFAULT 1,
            expires_at INTEGER,
            deleted_at INTEGER,
            CHECK (saved = 'unsaved' OR expires_at IS NULL)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<()> {
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chord_sheets_saved ON chord_sheets(saved)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chord_sheets_expires_at ON chord_sheets(expires_at)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_artists_name ON artists(name COLLATE NOCASE)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Query result cache table
pub async fn create_search_cache_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS search_cache (
            key TEXT PRIMARY KEY,
            query TEXT NOT NULL,
            results TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            access_count INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Relational artist directory table
pub async fn create_artists_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artists (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            path TEXT NOT NULL UNIQUE,
            song_count INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

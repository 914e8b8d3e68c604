//! Artist directory persistence

use chordvault_common::Result;
use sqlx::{Row, SqlitePool};

/// Row of the relational artist directory
///
/// `id` is internal to the directory and never leaves normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistRow {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub song_count: Option<i64>,
}

/// Insert or update an artist keyed by path; returns its id
pub async fn save_artist(
    pool: &SqlitePool,
    name: &str,
    path: &str,
    song_count: Option<i64>,
) -> Result<i64> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO artists (name, path, song_count)
        VALUES (?, ?, ?)
        ON CONFLICT(path) DO UPDATE SET
            name = excluded.name,
            song_count = excluded.song_count
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(path)
    .bind(song_count)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Case-insensitive substring match on artist name
pub async fn search_artists(pool: &SqlitePool, query: &str, limit: i64) -> Result<Vec<ArtistRow>> {
    let pattern = format!(
        "%{}%",
        query.trim().replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
    );

    let rows = sqlx::query(
        r#"
        SELECT id, name, path, song_count
        FROM artists
        WHERE name LIKE ? ESCAPE '\'
        ORDER BY song_count IS NULL, song_count DESC, name COLLATE NOCASE
        LIMIT ?
        "#,
    )
    .bind(pattern)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(ArtistRow {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                path: row.try_get("path")?,
                song_count: row.try_get("song_count")?,
            })
        })
        .collect()
}

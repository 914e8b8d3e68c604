//! Relational artist directory boundary

use async_trait::async_trait;
use chordvault_common::Result;
use sqlx::SqlitePool;

use crate::db::artists::{self, ArtistRow};

/// Default number of rows a directory lookup returns
pub const DEFAULT_SEARCH_LIMIT: i64 = 50;

/// First tier consulted for artist searches
#[async_trait]
pub trait ArtistDirectory: Send + Sync {
    async fn search_artists(&self, query: &str) -> Result<Vec<ArtistRow>>;
}

/// [`ArtistDirectory`] over the `artists` table
pub struct SqliteArtistDirectory {
    pool: SqlitePool,
    limit: i64,
}

impl SqliteArtistDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit.max(1);
        self
    }
}

#[async_trait]
impl ArtistDirectory for SqliteArtistDirectory {
    async fn search_artists(&self, query: &str) -> Result<Vec<ArtistRow>> {
        artists::search_artists(&self.pool, query, self.limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chordvault_common::db::init::connect_in_memory;

    #[tokio::test]
    async fn test_limit_applies() {
        let pool = connect_in_memory().await.unwrap();
        for i in 0..5 {
            artists::save_artist(&pool, &format!("Band {}", i), &format!("band-{}", i), None)
                .await
                .unwrap();
        }

        let directory = SqliteArtistDirectory::new(pool).with_limit(3);
        assert_eq!(directory.search_artists("band").await.unwrap().len(), 3);
    }
}

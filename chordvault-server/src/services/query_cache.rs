//! Query result cache
//!
//! Bounded cache of search results keyed by the normalized `"artist|song"`
//! pair. Reads refresh the entry (timestamp and access count), and
//! eviction removes the lowest `access_count * 0.7 + (timestamp / now) * 0.3`
//! scores first, so frequently repeated queries outlive one-off recent ones.
//!
//! All storage errors are logged and presented as a miss or a no-op.

use std::sync::Arc;

use chordvault_common::config::CacheConfig;
use chordvault_common::{Clock, SearchHit};
use chrono::Duration;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::db::search_cache;

/// Separator between the artist and song parts of a key
pub const KEY_SEPARATOR: char = '|';

/// Cache key for an `(artist, song)` query; `None` when both parts are blank
pub fn build_key(artist: Option<&str>, song: Option<&str>) -> Option<String> {
    let artist = artist.unwrap_or("").trim().to_lowercase();
    let song = song.unwrap_or("").trim().to_lowercase();
    if artist.is_empty() && song.is_empty() {
        return None;
    }
    Some(format!("{}{}{}", artist, KEY_SEPARATOR, song))
}

/// Search-result tier over the `search_cache` table
#[derive(Clone)]
pub struct QueryCache {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    max_items: usize,
}

impl QueryCache {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>, config: &CacheConfig) -> Self {
        Self {
            pool,
            clock,
            ttl: config.query_ttl(),
            max_items: config.query_max_items.max(1),
        }
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Upsert results, then evict down to `max_items`
    pub async fn cache_results(&self, artist: Option<&str>, song: Option<&str>, results: &[SearchHit]) {
        let Some(key) = build_key(artist, song) else {
            debug!("Skipping cache write for empty query");
            return;
        };
        let query = [artist.unwrap_or("").trim(), song.unwrap_or("").trim()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        let now = self.clock.now();

        if let Err(e) = search_cache::upsert_entry(&self.pool, &key, &query, results, now).await {
            warn!(key = %key, error = %e, "Search cache write failed");
            return;
        }

        let count = match search_cache::count_entries(&self.pool).await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "Search cache count failed");
                return;
            }
        };

        let excess = count - self.max_items as i64;
        if excess > 0 {
            match search_cache::evict_lowest(&self.pool, excess, now).await {
                Ok(evicted) => debug!(evicted, "Search cache evicted entries"),
                Err(e) => warn!(error = %e, "Search cache eviction failed"),
            }
        }
    }

    /// Cached results for the query, or `None` on miss or expiry
    pub async fn get_results(&self, artist: Option<&str>, song: Option<&str>) -> Option<Vec<SearchHit>> {
        let key = build_key(artist, song)?;

        let entry = match search_cache::load_entry(&self.pool, &key).await {
            Ok(entry) => entry?,
            Err(e) => {
                warn!(key = %key, error = %e, "Search cache read failed");
                return None;
            }
        };

        let now = self.clock.now();
        if entry.timestamp + self.ttl <= now {
            debug!(key = %key, "Search cache entry expired");
            if let Err(e) = search_cache::delete_entry(&self.pool, &key).await {
                warn!(key = %key, error = %e, "Expired search cache delete failed");
            }
            return None;
        }

        if let Err(e) = search_cache::touch_entry(&self.pool, &key, now).await {
            warn!(key = %key, error = %e, "Search cache refresh failed");
        }
        debug!(key = %key, hits = entry.results.len(), "Search cache hit");
        Some(entry.results)
    }

    pub async fn clear(&self) -> u64 {
        search_cache::clear_entries(&self.pool).await.unwrap_or_else(|e| {
            warn!(error = %e, "Search cache clear failed");
            0
        })
    }

    pub async fn len(&self) -> usize {
        match search_cache::count_entries(&self.pool).await {
            Ok(count) => count.max(0) as usize,
            Err(e) => {
                warn!(error = %e, "Search cache count failed");
                0
            }
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

//! Local record store
//!
//! Persistent chord-sheet tier with the save / expire / soft-delete
//! lifecycle:
//!
//! - saved sheets never expire
//! - unsaved sheets expire `sheet_ttl` after their timestamp
//! - un-saving starts a `soft_delete_grace` countdown from that moment
//!
//! Storage errors never leave this type: reads degrade to `None`, writes
//! to `false`, and both are logged.

use std::sync::Arc;

use chordvault_common::config::CacheConfig;
use chordvault_common::{normalize_path, ChordSheetRecord, Clock, SavedState};
use chrono::Duration;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::db::chord_sheets;

/// Chord-sheet tier over the `chord_sheets` table
#[derive(Clone)]
pub struct RecordStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    sheet_ttl: Duration,
    soft_delete_grace: Duration,
}

impl RecordStore {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>, config: &CacheConfig) -> Self {
        Self {
            pool,
            clock,
            sheet_ttl: config.sheet_ttl(),
            soft_delete_grace: config.soft_delete_grace(),
        }
    }

    /// Non-expired record at `path`
    ///
    /// An expired record is reported absent and purged in the background.
    pub async fn get(&self, path: &str) -> Option<ChordSheetRecord> {
        let path = normalize_path(path);
        let record = match chord_sheets::load_sheet(&self.pool, &path).await {
            Ok(record) => record?,
            Err(e) => {
                warn!(path = %path, error = %e, "Chord sheet read failed");
                return None;
            }
        };

        let now = self.clock.now();
        if record.is_expired(now) {
            debug!(path = %path, "Chord sheet expired, scheduling purge");
            let pool = self.pool.clone();
            tokio::spawn(async move {
                if let Err(e) = chord_sheets::delete_if_expired(&pool, &path, now).await {
                    warn!(path = %path, error = %e, "Expired chord sheet purge failed");
                }
            });
            return None;
        }

        Some(record)
    }

    /// Upsert `record` under `path` with the given saved state
    ///
    /// Expiry is derived from `saved`; any soft-delete marker is cleared.
    pub async fn store(&self, path: &str, mut record: ChordSheetRecord, saved: SavedState) -> bool {
        record.path = normalize_path(path);
        if record.path.is_empty() {
            warn!("Refusing to store chord sheet with empty path");
            return false;
        }

        record.saved = saved;
        record.deleted_at = None;
        record.expires_at = match saved {
            SavedState::Saved => None,
            SavedState::Unsaved => Some(record.timestamp + self.sheet_ttl),
        };

        match chord_sheets::upsert_sheet(&self.pool, &record).await {
            Ok(()) => {
                debug!(path = %record.path, saved = %saved, "Chord sheet stored");
                true
            }
            Err(e) => {
                warn!(path = %record.path, error = %e, "Chord sheet write failed");
                false
            }
        }
    }

    /// Toggle the saved flag; returns whether a live record existed
    pub async fn set_saved_status(&self, path: &str, saved: SavedState) -> bool {
        let path = normalize_path(path);
        let Some(record) = self.get(&path).await else {
            return false;
        };

        if record.saved == saved {
            return true;
        }

        let now = self.clock.now();
        let (expires_at, deleted_at) = match saved {
            SavedState::Saved => (None, None),
            SavedState::Unsaved => (Some(now + self.soft_delete_grace), Some(now)),
        };

        match chord_sheets::update_saved_state(&self.pool, &path, saved, expires_at, deleted_at).await
        {
            Ok(rows) => {
                info!(path = %path, saved = %saved, "Chord sheet saved state changed");
                rows > 0
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Saved state update failed");
                false
            }
        }
    }

    /// Sweep unsaved records whose expiry has passed
    pub async fn remove_expired(&self) -> u64 {
        match chord_sheets::delete_expired(&self.pool, self.clock.now()).await {
            Ok(removed) => {
                info!(removed, "Expired chord sheets removed");
                removed
            }
            Err(e) => {
                warn!(error = %e, "Expiry sweep failed");
                0
            }
        }
    }

    /// Count a hit against `path`
    pub async fn record_access(&self, path: &str) -> bool {
        let path = normalize_path(path);
        match chord_sheets::record_access(&self.pool, &path, self.clock.now()).await {
            Ok(rows) => rows > 0,
            Err(e) => {
                warn!(path = %path, error = %e, "Access bookkeeping failed");
                false
            }
        }
    }

    /// Replace the content of a live record, returning the updated record
    pub async fn update_content(&self, path: &str, content: &str) -> Option<ChordSheetRecord> {
        let path = normalize_path(path);
        let record = self.get(&path).await?;

        let now = self.clock.now();
        let expires_at = match (record.saved, record.deleted_at) {
            (SavedState::Saved, _) => None,
            (SavedState::Unsaved, Some(_)) => record.expires_at,
            (SavedState::Unsaved, None) => Some(now + self.sheet_ttl),
        };

        if let Err(e) = chord_sheets::update_content(&self.pool, &path, content, now, expires_at).await {
            warn!(path = %path, error = %e, "Content update failed");
            return None;
        }

        self.get(&path).await
    }

    pub async fn count(&self) -> i64 {
        chord_sheets::count_sheets(&self.pool).await.unwrap_or_else(|e| {
            warn!(error = %e, "Chord sheet count failed");
            0
        })
    }
}

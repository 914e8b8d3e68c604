//! Remote (shared) tier client
//!
//! Read-through / write-back access to artist song lists kept in a shared
//! blob store. Entries have no TTL. Every failure, including timeouts and
//! undecodable payloads, is logged and turned into a miss or a no-op.

use std::sync::Arc;
use std::time::Duration;

use chordvault_common::{normalize_path, Song};
use tracing::{debug, warn};

use super::blob_store::BlobStore;
use super::normalizer::{normalize_song_results, SongRecord, SongSource};

/// Blob key for an artist's song list
pub fn artist_key(artist_path: &str) -> String {
    format!("artists/{}.json", normalize_path(artist_path))
}

pub struct RemoteTierClient {
    store: Arc<dyn BlobStore>,
    timeout: Duration,
}

impl RemoteTierClient {
    pub fn new(store: Arc<dyn BlobStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Cached song list, or `None` on miss, empty list or any failure
    pub async fn get_artist_songs(&self, artist_path: &str) -> Option<Vec<Song>> {
        let key = artist_key(artist_path);

        let bytes = match tokio::time::timeout(self.timeout, self.store.get(&key)).await {
            Ok(Ok(Some(bytes))) => bytes,
            Ok(Ok(None)) => {
                debug!(key = %key, "Remote tier miss");
                return None;
            }
            Ok(Err(e)) => {
                warn!(key = %key, backend = self.store.backend_name(), error = %e, "Remote tier read failed");
                return None;
            }
            Err(_) => {
                warn!(key = %key, timeout_ms = self.timeout.as_millis() as u64, "Remote tier read timed out");
                return None;
            }
        };

        let records: Vec<SongRecord> = match serde_json::from_slice(&bytes) {
            Ok(records) => records,
            Err(e) => {
                warn!(key = %key, error = %e, "Remote tier payload undecodable");
                return None;
            }
        };

        let songs = normalize_song_results(records.into_iter().map(SongSource::Canonical).collect());
        if songs.is_empty() {
            debug!(key = %key, "Remote tier entry empty");
            return None;
        }

        debug!(key = %key, songs = songs.len(), "Remote tier hit");
        Some(songs)
    }

    /// Write-back; returns whether the write landed
    pub async fn store_artist_songs(&self, artist_path: &str, songs: &[Song]) -> bool {
        let key = artist_key(artist_path);

        let payload = match serde_json::to_vec(songs) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, error = %e, "Remote tier payload encode failed");
                return false;
            }
        };

        match tokio::time::timeout(self.timeout, self.store.put(&key, payload)).await {
            Ok(Ok(())) => {
                debug!(key = %key, songs = songs.len(), "Remote tier write-back");
                true
            }
            Ok(Err(e)) => {
                warn!(key = %key, error = %e, "Remote tier write failed");
                false
            }
            Err(_) => {
                warn!(key = %key, "Remote tier write timed out");
                false
            }
        }
    }
}

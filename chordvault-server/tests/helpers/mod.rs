//! Shared test doubles for chordvault-server integration tests
//!
//! Every tier boundary gets an in-memory double that counts calls, so tests
//! can assert which tiers a request touched.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use chordvault_common::config::CacheConfig;
use chordvault_common::db::init::connect_in_memory;
use chordvault_common::time::from_epoch_millis;
use chordvault_common::{Artist, ManualClock, SearchHit, Song};
use chordvault_server::db::artists::ArtistRow;
use chordvault_server::services::blob_store::{BlobResult, BlobStore, BlobStoreError};
use chordvault_server::services::normalizer::RawChordSheet;
use chordvault_server::services::{
    ArtistDirectory, FallbackError, QueryCache, RecordStore, RemoteTierClient,
    ResolutionOrchestrator, ScrapingFallback, SearchKind, TierSet,
};
use chordvault_server::{build_router, AppState};
use chrono::Utc;

pub fn song(artist: &str, artist_slug: &str, title: &str, slug: &str) -> Song {
    Song {
        title: title.to_string(),
        artist: artist.to_string(),
        path: format!("{}/{}", artist_slug, slug),
        display_name: title.to_string(),
    }
}

pub fn ed_sheeran_songs() -> Vec<Song> {
    vec![
        song("Ed Sheeran", "ed-sheeran", "Perfect", "perfect"),
        song("Ed Sheeran", "ed-sheeran", "Shape of You", "shape-of-you"),
        song("Ed Sheeran", "ed-sheeran", "Thinking Out Loud", "thinking-out-loud"),
    ]
}

pub fn artist(name: &str, path: &str) -> Artist {
    Artist {
        display_name: name.to_string(),
        path: path.to_string(),
        song_count: None,
    }
}

pub fn wonderwall_sheet() -> RawChordSheet {
    RawChordSheet {
        page_title: Some("Wonderwall - Oasis - Cifra Club".to_string()),
        content: "[Intro] Em7 G Dsus4 A7sus4".to_string(),
        ..Default::default()
    }
}

// ============================================================================
// Scraping fallback
// ============================================================================

/// Scripted [`ScrapingFallback`] that counts every call
pub struct MockFallback {
    songs: Mutex<Result<Vec<Song>, String>>,
    sheet: Mutex<Result<Option<RawChordSheet>, String>>,
    hits: Mutex<Result<Vec<SearchHit>, String>>,
    delay: Mutex<Duration>,
    pub artist_song_calls: AtomicUsize,
    pub sheet_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub searches: Mutex<Vec<(String, SearchKind)>>,
}

impl Default for MockFallback {
    fn default() -> Self {
        Self {
            songs: Mutex::new(Ok(Vec::new())),
            sheet: Mutex::new(Ok(None)),
            hits: Mutex::new(Ok(Vec::new())),
            delay: Mutex::new(Duration::ZERO),
            artist_song_calls: AtomicUsize::new(0),
            sheet_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            searches: Mutex::new(Vec::new()),
        }
    }
}

impl MockFallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_songs(self, songs: Vec<Song>) -> Self {
        *self.songs.lock().unwrap() = Ok(songs);
        self
    }

    pub fn with_sheet(self, sheet: RawChordSheet) -> Self {
        *self.sheet.lock().unwrap() = Ok(Some(sheet));
        self
    }

    pub fn with_hits(self, hits: Vec<SearchHit>) -> Self {
        *self.hits.lock().unwrap() = Ok(hits);
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = delay;
        self
    }

    /// Every operation fails with `message`
    pub fn failing(self, message: &str) -> Self {
        *self.songs.lock().unwrap() = Err(message.to_string());
        *self.sheet.lock().unwrap() = Err(message.to_string());
        *self.hits.lock().unwrap() = Err(message.to_string());
        self
    }

    pub fn set_failing(&self, message: &str) {
        *self.songs.lock().unwrap() = Err(message.to_string());
        *self.sheet.lock().unwrap() = Err(message.to_string());
        *self.hits.lock().unwrap() = Err(message.to_string());
    }

    pub fn total_calls(&self) -> usize {
        self.artist_song_calls.load(Ordering::SeqCst)
            + self.sheet_calls.load(Ordering::SeqCst)
            + self.search_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn scripted<T: Clone>(slot: &Mutex<Result<T, String>>) -> Result<T, FallbackError> {
    slot.lock()
        .unwrap()
        .clone()
        .map_err(|message| FallbackError::Fetch(anyhow::anyhow!(message)))
}

#[async_trait]
impl ScrapingFallback for MockFallback {
    async fn search(&self, query: &str, kind: SearchKind) -> Result<Vec<SearchHit>, FallbackError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.searches.lock().unwrap().push((query.to_string(), kind));
        self.pause().await;
        scripted(&self.hits)
    }

    async fn get_artist_songs(&self, _artist_path: &str) -> Result<Vec<Song>, FallbackError> {
        self.artist_song_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        scripted(&self.songs)
    }

    async fn get_chord_sheet(&self, _path: &str) -> Result<Option<RawChordSheet>, FallbackError> {
        self.sheet_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        scripted(&self.sheet)
    }
}

// ============================================================================
// Remote tier blob store
// ============================================================================

/// In-memory [`BlobStore`] with switchable failures
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_reads(self) -> Self {
        self.fail_reads.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_writes(self) -> Self {
        self.fail_writes.store(true, Ordering::SeqCst);
        self
    }

    pub fn seed_songs(&self, artist_path: &str, songs: &[Song]) {
        self.objects.lock().unwrap().insert(
            format!("artists/{}.json", artist_path),
            serde_json::to_vec(songs).unwrap(),
        );
    }

    pub fn stored_songs(&self, artist_path: &str) -> Option<Vec<Song>> {
        self.objects
            .lock()
            .unwrap()
            .get(&format!("artists/{}.json", artist_path))
            .map(|bytes| serde_json::from_slice(bytes).unwrap())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> BlobResult<Option<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(BlobStoreError::Unavailable("remote read refused".to_string()));
        }
        Ok(self.objects.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> BlobResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BlobStoreError::Unavailable("remote write refused".to_string()));
        }
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

// ============================================================================
// Artist directory
// ============================================================================

/// Scripted [`ArtistDirectory`]
pub struct MockDirectory {
    rows: Mutex<Result<Vec<ArtistRow>, String>>,
    pub calls: AtomicUsize,
}

impl Default for MockDirectory {
    fn default() -> Self {
        Self {
            rows: Mutex::new(Ok(Vec::new())),
            calls: AtomicUsize::new(0),
        }
    }
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(self, rows: Vec<ArtistRow>) -> Self {
        *self.rows.lock().unwrap() = Ok(rows);
        self
    }

    pub fn failing(self) -> Self {
        *self.rows.lock().unwrap() = Err("directory offline".to_string());
        self
    }
}

#[async_trait]
impl ArtistDirectory for MockDirectory {
    async fn search_artists(&self, _query: &str) -> chordvault_common::Result<Vec<ArtistRow>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rows
            .lock()
            .unwrap()
            .clone()
            .map_err(chordvault_common::Error::Internal)
    }
}

// ============================================================================
// Assembled service
// ============================================================================

/// Orchestrator wired to test doubles, with handles on each double
pub struct Harness {
    pub orchestrator: Arc<ResolutionOrchestrator>,
    pub fallback: Arc<MockFallback>,
    pub blobs: Arc<MemoryBlobStore>,
    pub directory: Arc<MockDirectory>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with(MockFallback::new(), MemoryBlobStore::new(), MockDirectory::new()).await
    }

    pub async fn with_fallback(fallback: MockFallback) -> Self {
        Self::with(fallback, MemoryBlobStore::new(), MockDirectory::new()).await
    }

    pub async fn with(fallback: MockFallback, blobs: MemoryBlobStore, directory: MockDirectory) -> Self {
        let pool = connect_in_memory().await.expect("in-memory database");
        // Millisecond precision matches what the tables store
        let clock = Arc::new(ManualClock::new(from_epoch_millis(Utc::now().timestamp_millis())));
        let config = CacheConfig::default();

        let fallback = Arc::new(fallback);
        let blobs = Arc::new(blobs);
        let directory = Arc::new(directory);

        let tiers = TierSet {
            records: RecordStore::new(pool.clone(), clock.clone(), &config),
            queries: QueryCache::new(pool, clock.clone(), &config),
            remote: RemoteTierClient::new(blobs.clone(), Duration::from_millis(500)),
            directory: directory.clone(),
            fallback: fallback.clone(),
        };
        let orchestrator = Arc::new(ResolutionOrchestrator::new(
            tiers,
            clock.clone(),
            Duration::from_secs(2),
        ));

        Self {
            orchestrator,
            fallback,
            blobs,
            directory,
            clock,
        }
    }

    pub fn app(&self) -> Router {
        build_router(AppState::new(self.orchestrator.clone()))
    }
}

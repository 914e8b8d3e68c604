//! Resolution orchestrator
//!
//! Walks the tier chain for each request:
//!
//! | Request        | Chain                                             |
//! |----------------|---------------------------------------------------|
//! | chord sheet    | record store → scraper (write-back to store)      |
//! | artist songs   | remote tier → scraper (write-back to remote tier) |
//! | artist search  | query cache → directory → scraper                 |
//! | free search    | query cache → scraper                             |
//!
//! Cache tiers never fail; they report a miss. Only the scraper can fail,
//! and only then does the caller see [`ResolveError::UpstreamUnavailable`].
//! Identical concurrent requests share one resolution through [`InFlight`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chordvault_common::paths::{segment_count, sheet_path, slugify};
use chordvault_common::{
    normalize_path, Artist, ChordSheetRecord, Clock, DataSource, SavedState, SearchHit, Song,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::artist_directory::ArtistDirectory;
use super::in_flight::InFlight;
use super::normalizer::{normalize_artist_results, normalize_chord_sheet, ArtistSource};
use super::page_fetcher::SearchKind;
use super::query_cache::{build_key, QueryCache};
use super::record_store::RecordStore;
use super::remote_tier::RemoteTierClient;
use super::scraper_client::{FallbackError, ScrapingFallback};

/// Errors a resolution can end in
///
/// Not-found is not an error: it resolves to `Ok(None)` or an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Missing or malformed input; never retried
    #[error("{0}")]
    Validation(String),

    /// Every tier in the chain failed
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

pub type ResolveResult<T> = Result<T, ResolveError>;

/// Tiers the orchestrator walks, injected at construction
pub struct TierSet {
    pub records: RecordStore,
    pub queries: QueryCache,
    pub remote: RemoteTierClient,
    pub directory: Arc<dyn ArtistDirectory>,
    pub fallback: Arc<dyn ScrapingFallback>,
}

/// Chord sheet submitted by a client
///
/// Missing fields deserialize empty and are rejected by validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewChordSheet {
    pub artist: String,
    pub title: String,
    pub content: String,
    pub path: Option<String>,
}

pub struct ResolutionOrchestrator {
    tiers: Arc<TierSet>,
    clock: Arc<dyn Clock>,
    fallback_timeout: Duration,
    sheets: InFlight<ResolveResult<Option<ChordSheetRecord>>>,
    artist_songs: InFlight<ResolveResult<Vec<Song>>>,
    artist_searches: InFlight<ResolveResult<Vec<Artist>>>,
    searches: InFlight<ResolveResult<Vec<SearchHit>>>,
}

/// Call the scraper under a deadline, mapping its failures
async fn call_fallback<T>(
    timeout: Duration,
    operation: &str,
    call: impl Future<Output = Result<T, FallbackError>>,
) -> ResolveResult<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(FallbackError::InvalidRequest(message))) => Err(ResolveError::Validation(message)),
        Ok(Err(e)) => {
            warn!(operation, error = %e, "Scraper call failed");
            Err(ResolveError::UpstreamUnavailable(e.to_string()))
        }
        Err(_) => {
            warn!(operation, timeout_ms = timeout.as_millis() as u64, "Scraper call timed out");
            Err(ResolveError::UpstreamUnavailable(format!(
                "{} timed out after {} ms",
                operation,
                timeout.as_millis()
            )))
        }
    }
}

fn artists_only(hits: Vec<SearchHit>) -> Vec<Artist> {
    hits.into_iter()
        .filter_map(|hit| match hit {
            SearchHit::Artist(artist) => Some(artist),
            SearchHit::Song(_) => None,
        })
        .collect()
}

fn required(value: &str, message: &str) -> ResolveResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ResolveError::Validation(message.to_string()));
    }
    Ok(value.to_string())
}

impl ResolutionOrchestrator {
    pub fn new(tiers: TierSet, clock: Arc<dyn Clock>, fallback_timeout: Duration) -> Self {
        Self {
            tiers: Arc::new(tiers),
            clock,
            fallback_timeout,
            sheets: InFlight::new(),
            artist_songs: InFlight::new(),
            artist_searches: InFlight::new(),
            searches: InFlight::new(),
        }
    }

    pub fn records(&self) -> &RecordStore {
        &self.tiers.records
    }

    pub fn queries(&self) -> &QueryCache {
        &self.tiers.queries
    }

    /// Resolutions currently pending across all request kinds
    pub fn in_flight_count(&self) -> usize {
        self.sheets.len() + self.artist_songs.len() + self.artist_searches.len() + self.searches.len()
    }

    /// Chord sheet at `path`: local store, then scraper
    ///
    /// Expired records are never served, even when the scraper is down.
    pub async fn get_chord_sheet(&self, path: &str) -> ResolveResult<Option<ChordSheetRecord>> {
        let path = normalize_path(path);
        if path.is_empty() {
            return Err(ResolveError::Validation("Missing chord sheet path".to_string()));
        }

        if let Some(record) = self.tiers.records.get(&path).await {
            debug!(path = %path, "Chord sheet served from record store");
            self.tiers.records.record_access(&path).await;
            return Ok(Some(record));
        }

        let tiers = Arc::clone(&self.tiers);
        let clock = Arc::clone(&self.clock);
        let timeout = self.fallback_timeout;
        let key = format!("sheet:{}", path);

        self.sheets
            .run(key, move || async move {
                info!(path = %path, "Fetching chord sheet from scraper");
                let raw = call_fallback(timeout, "get_chord_sheet", tiers.fallback.get_chord_sheet(&path))
                    .await?;

                let Some(record) = raw.and_then(|raw| normalize_chord_sheet(raw, &path, clock.now()))
                else {
                    debug!(path = %path, "Chord sheet not found upstream");
                    return Ok(None);
                };

                if !tiers.records.store(&path, record.clone(), SavedState::Unsaved).await {
                    return Ok(Some(record));
                }
                Ok(Some(tiers.records.get(&path).await.unwrap_or(record)))
            })
            .await
    }

    /// Songs of an artist: remote tier, then scraper with write-back
    pub async fn get_artist_songs(&self, artist_path: &str) -> ResolveResult<Vec<Song>> {
        let path = normalize_path(artist_path);
        if path.is_empty() {
            return Err(ResolveError::Validation("Missing artist path".to_string()));
        }

        let tiers = Arc::clone(&self.tiers);
        let timeout = self.fallback_timeout;
        let key = format!("artist:{}", path);

        self.artist_songs
            .run(key, move || async move {
                if let Some(songs) = tiers.remote.get_artist_songs(&path).await {
                    return Ok(songs);
                }

                info!(artist_path = %path, "Fetching artist songs from scraper");
                let songs = call_fallback(
                    timeout,
                    "get_artist_songs",
                    tiers.fallback.get_artist_songs(&path),
                )
                .await?;

                if songs.is_empty() {
                    debug!(artist_path = %path, "Scraper returned no songs, skipping write-back");
                } else {
                    tiers.remote.store_artist_songs(&path, &songs).await;
                }
                Ok(songs)
            })
            .await
    }

    /// Artists matching `query`: query cache, directory, then scraper
    pub async fn search_artists(&self, query: &str) -> ResolveResult<Vec<Artist>> {
        let query = required(query, "Missing artist query")?;
        let Some(cache_key) = build_key(Some(&query), None) else {
            return Err(ResolveError::Validation("Missing artist query".to_string()));
        };

        let tiers = Arc::clone(&self.tiers);
        let timeout = self.fallback_timeout;
        let key = format!("artists:{}", cache_key);

        self.artist_searches
            .run(key, move || async move {
                if let Some(hits) = tiers.queries.get_results(Some(&query), None).await {
                    return Ok(artists_only(hits));
                }

                let directory_failed = match tiers.directory.search_artists(&query).await {
                    Ok(rows) => {
                        let artists = normalize_artist_results(
                            rows.into_iter().map(ArtistSource::Directory).collect(),
                        );
                        if !artists.is_empty() {
                            let hits: Vec<SearchHit> =
                                artists.iter().cloned().map(SearchHit::Artist).collect();
                            tiers.queries.cache_results(Some(&query), None, &hits).await;
                            return Ok(artists);
                        }
                        false
                    }
                    Err(e) => {
                        warn!(query = %query, error = %e, "Artist directory lookup failed");
                        true
                    }
                };

                info!(query = %query, "Searching artists through scraper");
                let artists = match call_fallback(
                    timeout,
                    "search",
                    tiers.fallback.search(&query, SearchKind::Artist),
                )
                .await
                {
                    Ok(hits) => artists_only(hits),
                    Err(e) if directory_failed => return Err(e),
                    Err(e) => {
                        warn!(query = %query, error = %e, "Scraper search failed after empty directory answer");
                        return Ok(Vec::new());
                    }
                };

                if !artists.is_empty() {
                    let hits: Vec<SearchHit> = artists.iter().cloned().map(SearchHit::Artist).collect();
                    tiers.queries.cache_results(Some(&query), None, &hits).await;
                }
                Ok(artists)
            })
            .await
    }

    /// Combined artist/song search: query cache, then scraper
    pub async fn search(&self, artist: Option<&str>, song: Option<&str>) -> ResolveResult<Vec<SearchHit>> {
        let artist = artist.unwrap_or("").trim().to_string();
        let song = song.unwrap_or("").trim().to_string();
        let Some(cache_key) = build_key(Some(&artist), Some(&song)) else {
            return Err(ResolveError::Validation("Missing search query".to_string()));
        };

        let tiers = Arc::clone(&self.tiers);
        let timeout = self.fallback_timeout;
        let key = format!("search:{}", cache_key);

        self.searches
            .run(key, move || async move {
                if let Some(hits) = tiers.queries.get_results(Some(&artist), Some(&song)).await {
                    return Ok(hits);
                }

                let (query, kind) = if song.is_empty() {
                    (artist.clone(), SearchKind::Artist)
                } else {
                    (format!("{} {}", artist, song).trim().to_string(), SearchKind::Song)
                };

                info!(query = %query, kind = kind.as_str(), "Searching through scraper");
                let hits = call_fallback(timeout, "search", tiers.fallback.search(&query, kind)).await?;

                if !hits.is_empty() {
                    tiers.queries.cache_results(Some(&artist), Some(&song), &hits).await;
                }
                Ok(hits)
            })
            .await
    }

    /// Explicit save of a client-supplied sheet
    pub async fn save_chord_sheet(&self, sheet: NewChordSheet) -> ResolveResult<ChordSheetRecord> {
        let artist = required(&sheet.artist, "Missing artist")?;
        let title = required(&sheet.title, "Missing title")?;
        if sheet.content.trim().is_empty() {
            return Err(ResolveError::Validation("Missing content".to_string()));
        }

        let path = match sheet.path.as_deref().map(normalize_path) {
            Some(path) if !path.is_empty() => path,
            _ => sheet_path(&slugify(&artist), &slugify(&title)),
        };
        if segment_count(&path) != 2 {
            return Err(ResolveError::Validation(format!("Invalid chord sheet path: {}", path)));
        }

        let record = ChordSheetRecord::new(
            path.clone(),
            artist,
            title,
            sheet.content,
            DataSource::Upload,
            self.clock.now(),
        );

        if !self.tiers.records.store(&path, record, SavedState::Saved).await {
            return Err(ResolveError::UpstreamUnavailable(
                "chord sheet store unavailable".to_string(),
            ));
        }
        info!(path = %path, "Chord sheet saved by client");

        self.tiers.records.get(&path).await.ok_or_else(|| {
            ResolveError::UpstreamUnavailable("chord sheet store unavailable".to_string())
        })
    }

    /// Toggle the saved flag; `Ok(false)` when no live record exists
    pub async fn set_saved(&self, path: &str, saved: bool) -> ResolveResult<bool> {
        let path = required(path, "Missing chord sheet path")?;
        Ok(self
            .tiers
            .records
            .set_saved_status(&path, SavedState::from(saved))
            .await)
    }

    /// Replace content; `Ok(None)` when no live record exists
    pub async fn edit_content(&self, path: &str, content: &str) -> ResolveResult<Option<ChordSheetRecord>> {
        let path = required(path, "Missing chord sheet path")?;
        if content.trim().is_empty() {
            return Err(ResolveError::Validation("Missing content".to_string()));
        }
        Ok(self.tiers.records.update_content(&path, content).await)
    }

    /// Remove expired unsaved sheets
    pub async fn sweep_expired(&self) -> u64 {
        self.tiers.records.remove_expired().await
    }
}

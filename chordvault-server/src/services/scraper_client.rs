//! Scraping fallback client
//!
//! Terminal tier of every resolution chain. Wraps a [`PageFetcher`],
//! filters the raw links it yields down to well-formed artist/song pages
//! and hands back canonical records. This is the only tier whose errors
//! propagate.

use std::sync::Arc;

use async_trait::async_trait;
use chordvault_common::{normalize_path, Artist, SearchHit, Song};
use thiserror::Error;
use tracing::{debug, info};

use super::normalizer::{
    normalize_artist_results, normalize_song_results, ArtistSource, RawChordSheet, SongSource,
};
use super::page_fetcher::{PageFetcher, RawLink, SearchKind};

/// Scraping fallback errors
#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Scraper failure: {0:#}")]
    Fetch(#[from] anyhow::Error),
}

/// Live source consulted when every cache tier misses
#[async_trait]
pub trait ScrapingFallback: Send + Sync {
    async fn search(&self, query: &str, kind: SearchKind) -> Result<Vec<SearchHit>, FallbackError>;

    async fn get_artist_songs(&self, artist_path: &str) -> Result<Vec<Song>, FallbackError>;

    /// `Ok(None)` when the site reports no such sheet
    async fn get_chord_sheet(&self, path: &str) -> Result<Option<RawChordSheet>, FallbackError>;
}

/// Site-relative path of a link, or `None` if it is not a page path
///
/// Accepts absolute URLs, protocol-relative `//host/...` links and
/// site-relative paths; query strings and fragments are dropped.
pub fn link_path(url: &str) -> Option<String> {
    let url = url.trim();
    let authority = match (url.find("://"), url.strip_prefix("//")) {
        (Some(scheme_end), _) => Some(&url[scheme_end + 3..]),
        (None, Some(rest)) => Some(rest),
        (None, None) => None,
    };
    let without_origin = match authority {
        Some(rest) => rest.find('/').map(|i| &rest[i..]).unwrap_or(""),
        None => url,
    };
    let end = without_origin
        .find(|c: char| c == '?' || c == '#')
        .unwrap_or(without_origin.len());

    let path = normalize_path(&without_origin[..end]);
    if path.is_empty() || has_file_extension(&path) {
        return None;
    }
    Some(path)
}

/// Suffixes of pages and assets that are never artist or song pages
const FILE_EXTENSIONS: &[&str] = &[
    "html", "htm", "php", "asp", "aspx", "jsp", "xml", "json", "txt", "pdf", "js", "css", "png",
    "jpg", "jpeg", "gif", "svg", "webp", "ico", "mp3",
];

fn has_file_extension(path: &str) -> bool {
    let last = path.rsplit('/').next().unwrap_or(path);
    match last.rsplit_once('.') {
        Some((stem, ext)) => !stem.is_empty() && FILE_EXTENSIONS.contains(&ext),
        None => false,
    }
}

/// Number of path segments a link of each kind must have
fn expected_segments(kind: SearchKind) -> usize {
    match kind {
        SearchKind::Artist => 1,
        SearchKind::Song => 2,
    }
}

/// Keep only links whose path has the shape of `kind`
pub fn validate_links(links: Vec<RawLink>, kind: SearchKind) -> Vec<(String, String)> {
    let total = links.len();
    let valid: Vec<(String, String)> = links
        .into_iter()
        .filter_map(|link| {
            let path = link_path(&link.url)?;
            if path.split('/').count() != expected_segments(kind) {
                return None;
            }
            Some((link.title, path))
        })
        .collect();

    if valid.len() < total {
        debug!(
            kind = kind.as_str(),
            kept = valid.len(),
            dropped = total - valid.len(),
            "Filtered scraped links"
        );
    }
    valid
}

fn artist_hint(path: &str) -> Option<String> {
    path.split('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// [`ScrapingFallback`] backed by a [`PageFetcher`]
pub struct ScraperClient {
    fetcher: Arc<dyn PageFetcher>,
}

impl ScraperClient {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    fn songs_from_links(links: Vec<RawLink>) -> Vec<Song> {
        let sources = validate_links(links, SearchKind::Song)
            .into_iter()
            .map(|(title, path)| {
                let artist_hint = artist_hint(&path);
                SongSource::Scraped {
                    title,
                    path,
                    artist_hint,
                }
            })
            .collect();
        normalize_song_results(sources)
    }

    fn artists_from_links(links: Vec<RawLink>) -> Vec<Artist> {
        let sources = validate_links(links, SearchKind::Artist)
            .into_iter()
            .map(|(title, path)| ArtistSource::Scraped { title, path })
            .collect();
        normalize_artist_results(sources)
    }
}

#[async_trait]
impl ScrapingFallback for ScraperClient {
    async fn search(&self, query: &str, kind: SearchKind) -> Result<Vec<SearchHit>, FallbackError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(FallbackError::InvalidRequest("empty search query".to_string()));
        }

        info!(query = %query, kind = kind.as_str(), "Scraping search results");
        let links = self.fetcher.search(query, kind).await?;

        let hits = match kind {
            SearchKind::Artist => Self::artists_from_links(links)
                .into_iter()
                .map(SearchHit::Artist)
                .collect(),
            SearchKind::Song => Self::songs_from_links(links)
                .into_iter()
                .map(SearchHit::Song)
                .collect(),
        };
        Ok(hits)
    }

    async fn get_artist_songs(&self, artist_path: &str) -> Result<Vec<Song>, FallbackError> {
        let path = link_path(artist_path)
            .filter(|p| p.split('/').count() == 1)
            .ok_or_else(|| FallbackError::InvalidRequest(format!("not an artist path: {}", artist_path)))?;

        info!(artist_path = %path, "Scraping artist song list");
        let links = self.fetcher.artist_links(&path).await?;
        Ok(Self::songs_from_links(links)
            .into_iter()
            .filter(|song| song.path.starts_with(&format!("{}/", path)))
            .collect())
    }

    async fn get_chord_sheet(&self, path: &str) -> Result<Option<RawChordSheet>, FallbackError> {
        let path = link_path(path)
            .filter(|p| p.split('/').count() == 2)
            .ok_or_else(|| FallbackError::InvalidRequest(format!("not a song path: {}", path)))?;

        info!(path = %path, "Scraping chord sheet");
        Ok(self.fetcher.chord_sheet(&path).await?)
    }
}

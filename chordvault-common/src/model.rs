//! Canonical model shared by every tier
//!
//! All sources are normalized into [`Artist`] and [`Song`] before they leave
//! the resolution core; chord sheets are persisted as [`ChordSheetRecord`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Canonical artist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub display_name: String,
    pub path: String,
    pub song_count: Option<i64>,
}

/// Canonical song
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub title: String,
    pub artist: String,
    pub path: String,
    pub display_name: String,
}

/// One entry of a cached search result list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SearchHit {
    Artist(Artist),
    Song(Song),
}

impl SearchHit {
    pub fn path(&self) -> &str {
        match self {
            SearchHit::Artist(a) => &a.path,
            SearchHit::Song(s) => &s.path,
        }
    }
}

/// Canonical form of the "saved" flag
///
/// Stored as the TEXT values `saved` / `unsaved`; legacy boolean, numeric
/// and string forms are rewritten by schema migration v2. On the wire it is
/// a plain JSON boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "bool", into = "bool")]
pub enum SavedState {
    Saved,
    Unsaved,
}

impl SavedState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SavedState::Saved => "saved",
            SavedState::Unsaved => "unsaved",
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, SavedState::Saved)
    }
}

impl From<bool> for SavedState {
    fn from(saved: bool) -> Self {
        if saved {
            SavedState::Saved
        } else {
            SavedState::Unsaved
        }
    }
}

impl From<SavedState> for bool {
    fn from(saved: SavedState) -> Self {
        saved.is_saved()
    }
}

impl FromStr for SavedState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "saved" => Ok(SavedState::Saved),
            "unsaved" => Ok(SavedState::Unsaved),
            other => Err(Error::InvalidInput(format!("unknown saved state: {}", other))),
        }
    }
}

impl fmt::Display for SavedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a chord sheet came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Scrape,
    Upload,
    Api,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Scrape => "scrape",
            DataSource::Upload => "upload",
            DataSource::Api => "api",
        }
    }
}

impl FromStr for DataSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scrape" => Ok(DataSource::Scrape),
            "upload" => Ok(DataSource::Upload),
            "api" => Ok(DataSource::Api),
            other => Err(Error::InvalidInput(format!("unknown data source: {}", other))),
        }
    }
}

/// Persisted chord sheet
///
/// `saved == Saved` implies `expires_at.is_none()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChordSheetRecord {
    /// Normalized "artist/title" key
    pub path: String,
    pub artist: String,
    pub title: String,
    /// Chords and lyrics
    pub content: String,
    pub saved: SavedState,
    pub timestamp: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: i64,
    pub data_source: DataSource,
    pub version: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ChordSheetRecord {
    /// Fresh record; the store fills in expiry on write
    pub fn new(
        path: impl Into<String>,
        artist: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        data_source: DataSource,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            path: crate::normalize_path(&path.into()),
            artist: artist.into(),
            title: title.into(),
            content: content.into(),
            saved: SavedState::Unsaved,
            timestamp: now,
            last_accessed: now,
            access_count: 0,
            data_source,
            version: 1,
            expires_at: None,
            deleted_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_saved_state_parse() {
        assert_eq!("saved".parse::<SavedState>().unwrap(), SavedState::Saved);
        assert_eq!("unsaved".parse::<SavedState>().unwrap(), SavedState::Unsaved);
        assert!("1".parse::<SavedState>().is_err());
        assert_eq!(SavedState::from(true), SavedState::Saved);
    }

    #[test]
    fn test_saved_state_json_is_boolean() {
        assert_eq!(serde_json::to_value(SavedState::Saved).unwrap(), serde_json::json!(true));
        assert_eq!(serde_json::to_value(SavedState::Unsaved).unwrap(), serde_json::json!(false));
        assert_eq!(serde_json::from_str::<SavedState>("true").unwrap(), SavedState::Saved);
        assert!(serde_json::from_str::<SavedState>("\"saved\"").is_err());
    }

    #[test]
    fn test_data_source_round_trip() {
        for source in [DataSource::Scrape, DataSource::Upload, DataSource::Api] {
            assert_eq!(source.as_str().parse::<DataSource>().unwrap(), source);
        }
    }

    #[test]
    fn test_search_hit_json_is_tagged() {
        let hit = SearchHit::Artist(Artist {
            display_name: "Oasis".to_string(),
            path: "oasis".to_string(),
            song_count: Some(12),
        });
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["kind"], "artist");
        assert_eq!(json["displayName"], "Oasis");
        assert_eq!(json["songCount"], 12);
    }

    #[test]
    fn test_record_expiry() {
        let now = Utc::now();
        let mut record =
            ChordSheetRecord::new("/Oasis/Wonderwall/", "Oasis", "Wonderwall", "Em G", DataSource::Scrape, now);
        assert_eq!(record.path, "oasis/wonderwall");
        assert!(!record.is_expired(now));

        record.expires_at = Some(now + Duration::days(7));
        assert!(!record.is_expired(now + Duration::days(6)));
        assert!(record.is_expired(now + Duration::days(7)));
    }
}

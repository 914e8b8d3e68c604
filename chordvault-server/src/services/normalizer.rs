//! Normalization layer
//!
//! Maps heterogeneous source records onto the canonical [`Artist`] / [`Song`]
//! / [`ChordSheetRecord`] shapes. Each source shape is a variant of a tagged
//! union; there is one normalization function per entity kind. Records that
//! fail validation are dropped, never errored.

use chordvault_common::{normalize_path, Artist, ChordSheetRecord, DataSource, Song};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::artists::ArtistRow;

/// Site suffix appended to scraped page titles
pub const SITE_SUFFIX: &str = " - Cifra Club";

/// Separator between title and artist in scraped page titles
pub const TITLE_SEPARATOR: &str = " - ";

/// Loosely-typed artist as found in stored JSON or API payloads
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistRecord {
    #[serde(default)]
    pub display_name: Option<String>,
    /// Raw page title, used when `display_name` is absent
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub song_count: Option<i64>,
}

/// Loosely-typed song as found in stored JSON or API payloads
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl From<Song> for SongRecord {
    fn from(song: Song) -> Self {
        Self {
            title: song.title,
            artist: song.artist,
            path: song.path,
            display_name: Some(song.display_name),
        }
    }
}

/// Artist-shaped input, tagged by where it came from
#[derive(Debug, Clone)]
pub enum ArtistSource {
    /// Row from the relational artist directory
    Directory(ArtistRow),
    /// Validated `{title, path}` pair from the scraping collaborator
    Scraped { title: String, path: String },
    /// Stored or client-supplied record
    Canonical(ArtistRecord),
}

/// Song-shaped input, tagged by where it came from
#[derive(Debug, Clone)]
pub enum SongSource {
    /// Validated `{title, path}` pair; `artist_hint` names the artist page
    /// the link was found on
    Scraped {
        title: String,
        path: String,
        artist_hint: Option<String>,
    },
    /// Stored or client-supplied record
    Canonical(SongRecord),
}

/// Title and artist split out of a scraped page title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleArtist {
    pub title: String,
    pub artist: String,
}

/// Scraped chord sheet before normalization
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChordSheet {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    /// Full `<title>` of the page, e.g. "Wonderwall - Oasis - Cifra Club"
    #[serde(default)]
    pub page_title: Option<String>,
    #[serde(default)]
    pub content: String,
}

/// Remove a trailing site suffix, then surrounding whitespace
pub fn strip_site_suffix(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_suffix(SITE_SUFFIX)
        .unwrap_or(trimmed)
        .trim()
}

/// Split a scraped page title into song title and artist
///
/// The last `" - "` segment is the artist; everything before it is the
/// title, so titles that themselves contain the separator survive intact.
/// Without a separator the whole cleaned string is the title.
pub fn extract_title_and_artist(raw_title: &str) -> TitleArtist {
    let cleaned = strip_site_suffix(raw_title);
    let segments: Vec<&str> = cleaned.split(TITLE_SEPARATOR).collect();

    if segments.len() >= 2 {
        let (artist, title) = segments
            .split_last()
            .map(|(last, rest)| (last.trim(), rest.join(TITLE_SEPARATOR)))
            .unwrap_or_default();
        TitleArtist {
            title: title.trim().to_string(),
            artist: artist.to_string(),
        }
    } else {
        TitleArtist {
            title: cleaned.to_string(),
            artist: String::new(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Normalize artist inputs, dropping entries without a name or path
pub fn normalize_artist_results(list: Vec<ArtistSource>) -> Vec<Artist> {
    let total = list.len();
    let artists: Vec<Artist> = list
        .into_iter()
        .filter_map(|source| {
            let (display_name, path, song_count) = match source {
                ArtistSource::Directory(row) => (row.name.trim().to_string(), row.path, row.song_count),
                ArtistSource::Scraped { title, path } => {
                    (strip_site_suffix(&title).to_string(), path, None)
                }
                ArtistSource::Canonical(record) => {
                    let display_name = non_empty(record.display_name.as_deref())
                        .or_else(|| {
                            record
                                .title
                                .as_deref()
                                .map(|t| strip_site_suffix(t).to_string())
                        })
                        .unwrap_or_default();
                    (display_name, record.path, record.song_count)
                }
            };

            let path = normalize_path(&path);
            if display_name.is_empty() || path.is_empty() {
                return None;
            }
            Some(Artist {
                display_name,
                path,
                song_count,
            })
        })
        .collect();

    if artists.len() < total {
        debug!(kept = artists.len(), dropped = total - artists.len(), "Dropped invalid artist records");
    }
    artists
}

/// Normalize song inputs, dropping entries missing title, artist or path
pub fn normalize_song_results(list: Vec<SongSource>) -> Vec<Song> {
    let total = list.len();
    let songs: Vec<Song> = list
        .into_iter()
        .filter_map(|source| {
            let record = match source {
                SongSource::Scraped {
                    title,
                    path,
                    artist_hint,
                } => {
                    let split = extract_title_and_artist(&title);
                    let artist = if split.artist.is_empty() {
                        artist_hint.unwrap_or_default()
                    } else {
                        split.artist
                    };
                    SongRecord {
                        title: split.title,
                        artist,
                        path,
                        display_name: None,
                    }
                }
                SongSource::Canonical(record) => record,
            };

            let title = record.title.trim().to_string();
            let artist = record.artist.trim().to_string();
            let path = normalize_path(&record.path);
            if title.is_empty() || artist.is_empty() || path.is_empty() {
                return None;
            }
            let display_name = non_empty(record.display_name.as_deref()).unwrap_or_else(|| title.clone());
            Some(Song {
                title,
                artist,
                path,
                display_name,
            })
        })
        .collect();

    if songs.len() < total {
        debug!(kept = songs.len(), dropped = total - songs.len(), "Dropped invalid song records");
    }
    songs
}

/// Build a chord-sheet record from a scraped sheet
///
/// Returns `None` when the sheet has no content or no usable title.
pub fn normalize_chord_sheet(
    raw: RawChordSheet,
    requested_path: &str,
    now: DateTime<Utc>,
) -> Option<ChordSheetRecord> {
    let path = normalize_path(requested_path);
    if path.is_empty() || raw.content.trim().is_empty() {
        return None;
    }

    let from_page = raw
        .page_title
        .as_deref()
        .map(extract_title_and_artist)
        .unwrap_or(TitleArtist {
            title: String::new(),
            artist: String::new(),
        });

    let title = non_empty(raw.title.as_deref()).unwrap_or(from_page.title);
    let artist = non_empty(raw.artist.as_deref())
        .or_else(|| non_empty(Some(from_page.artist.as_str())))
        .or_else(|| path.split('/').next().map(str::to_string))
        .unwrap_or_default();

    if title.is_empty() {
        return None;
    }

    Some(ChordSheetRecord::new(
        path,
        artist,
        title,
        raw.content,
        DataSource::Scrape,
        now,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_title_and_artist() {
        assert_eq!(
            extract_title_and_artist("Wonderwall - Oasis - Cifra Club"),
            TitleArtist {
                title: "Wonderwall".to_string(),
                artist: "Oasis".to_string()
            }
        );
    }

    #[test]
    fn test_extract_title_with_embedded_separators() {
        let split = extract_title_and_artist(
            "Song - With - Multiple - Hyphens - Artist Name - Cifra Club",
        );
        assert_eq!(split.title, "Song - With - Multiple - Hyphens");
        assert_eq!(split.artist, "Artist Name");
    }

    #[test]
    fn test_extract_title_without_artist() {
        let split = extract_title_and_artist("Instrumental Track - Cifra Club");
        assert_eq!(split.title, "Instrumental Track");
        assert_eq!(split.artist, "");

        let empty = extract_title_and_artist("");
        assert_eq!(empty.title, "");
        assert_eq!(empty.artist, "");
    }

    #[test]
    fn test_extract_preserves_unicode() {
        let split = extract_title_and_artist("Garota de Ipanema - Tom Jobim - Cifra Club");
        assert_eq!(split.title, "Garota de Ipanema");
        assert_eq!(split.artist, "Tom Jobim");

        let split = extract_title_and_artist("Ça plane pour moi - Plastic Bertrand");
        assert_eq!(split.title, "Ça plane pour moi");
        assert_eq!(split.artist, "Plastic Bertrand");

        let split = extract_title_and_artist("夜に駆ける - YOASOBI - Cifra Club");
        assert_eq!(split.title, "夜に駆ける");
        assert_eq!(split.artist, "YOASOBI");
    }

    #[test]
    fn test_hyphen_without_spaces_is_not_a_separator() {
        let split = extract_title_and_artist("Ob-La-Di, Ob-La-Da - The Beatles");
        assert_eq!(split.title, "Ob-La-Di, Ob-La-Da");
        assert_eq!(split.artist, "The Beatles");
    }

    #[test]
    fn test_normalize_artist_drops_empty_display_name() {
        let result = normalize_artist_results(vec![
            ArtistSource::Canonical(ArtistRecord {
                display_name: Some(String::new()),
                path: "x".to_string(),
                ..Default::default()
            }),
            ArtistSource::Canonical(ArtistRecord {
                display_name: Some("Valid".to_string()),
                path: "y".to_string(),
                song_count: Some(5),
                ..Default::default()
            }),
        ]);

        assert_eq!(
            result,
            vec![Artist {
                display_name: "Valid".to_string(),
                path: "y".to_string(),
                song_count: Some(5),
            }]
        );
    }

    #[test]
    fn test_normalize_artist_from_title_and_sources() {
        let result = normalize_artist_results(vec![
            ArtistSource::Canonical(ArtistRecord {
                title: Some("Legião Urbana - Cifra Club".to_string()),
                path: "/legiao-urbana/".to_string(),
                ..Default::default()
            }),
            ArtistSource::Scraped {
                title: "Oasis - Cifra Club".to_string(),
                path: "oasis".to_string(),
            },
            ArtistSource::Directory(ArtistRow {
                id: 42,
                name: "Ed Sheeran".to_string(),
                path: "ed-sheeran".to_string(),
                song_count: Some(180),
            }),
            ArtistSource::Directory(ArtistRow {
                id: 43,
                name: "No Path".to_string(),
                path: "  ".to_string(),
                song_count: None,
            }),
        ]);

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].display_name, "Legião Urbana");
        assert_eq!(result[0].path, "legiao-urbana");
        assert_eq!(result[1].display_name, "Oasis");
        assert_eq!(result[2].display_name, "Ed Sheeran");
        assert_eq!(result[2].song_count, Some(180));
    }

    #[test]
    fn test_normalize_songs_validates_and_defaults() {
        let result = normalize_song_results(vec![
            SongSource::Canonical(SongRecord {
                title: "Wonderwall".to_string(),
                artist: "Oasis".to_string(),
                path: "oasis/wonderwall/".to_string(),
                display_name: None,
            }),
            SongSource::Canonical(SongRecord {
                title: "No Artist".to_string(),
                artist: String::new(),
                path: "x/y".to_string(),
                display_name: None,
            }),
            SongSource::Canonical(SongRecord {
                title: String::new(),
                artist: "Oasis".to_string(),
                path: "oasis/untitled".to_string(),
                display_name: Some("Untitled".to_string()),
            }),
        ]);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].display_name, "Wonderwall");
        assert_eq!(result[0].path, "oasis/wonderwall");
    }

    #[test]
    fn test_normalize_scraped_songs_use_artist_hint() {
        let result = normalize_song_results(vec![
            SongSource::Scraped {
                title: "Perfect".to_string(),
                path: "ed-sheeran/perfect".to_string(),
                artist_hint: Some("Ed Sheeran".to_string()),
            },
            SongSource::Scraped {
                title: "Shape of You - Ed Sheeran - Cifra Club".to_string(),
                path: "ed-sheeran/shape-of-you".to_string(),
                artist_hint: Some("ignored".to_string()),
            },
            SongSource::Scraped {
                title: "Orphan".to_string(),
                path: "unknown/orphan".to_string(),
                artist_hint: None,
            },
        ]);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].artist, "Ed Sheeran");
        assert_eq!(result[1].title, "Shape of You");
        assert_eq!(result[1].artist, "Ed Sheeran");
    }

    #[test]
    fn test_normalize_chord_sheet() {
        let now = Utc::now();
        let record = normalize_chord_sheet(
            RawChordSheet {
                page_title: Some("Wonderwall - Oasis - Cifra Club".to_string()),
                content: "[Intro] Em7 G Dsus4 A7sus4".to_string(),
                ..Default::default()
            },
            "/Oasis/Wonderwall/",
            now,
        )
        .expect("valid sheet");

        assert_eq!(record.path, "oasis/wonderwall");
        assert_eq!(record.title, "Wonderwall");
        assert_eq!(record.artist, "Oasis");
        assert_eq!(record.data_source, DataSource::Scrape);
        assert_eq!(record.timestamp, now);
    }

    #[test]
    fn test_normalize_chord_sheet_rejects_empty_content() {
        let sheet = RawChordSheet {
            title: Some("Wonderwall".to_string()),
            content: "   ".to_string(),
            ..Default::default()
        };
        assert!(normalize_chord_sheet(sheet, "oasis/wonderwall", Utc::now()).is_none());
    }

    #[test]
    fn test_normalize_chord_sheet_artist_falls_back_to_path() {
        let record = normalize_chord_sheet(
            RawChordSheet {
                page_title: Some("Instrumental Track - Cifra Club".to_string()),
                content: "Am F C G".to_string(),
                ..Default::default()
            },
            "some-band/instrumental-track",
            Utc::now(),
        )
        .unwrap();

        assert_eq!(record.title, "Instrumental Track");
        assert_eq!(record.artist, "some-band");
    }
}

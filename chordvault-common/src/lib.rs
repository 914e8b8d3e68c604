//! # ChordVault Common Library
//!
//! Shared code for the ChordVault crates:
//! - Canonical Artist/Song/ChordSheet model
//! - Path normalization
//! - Clock abstraction used by expiry logic
//! - Configuration loading and root folder resolution
//! - SQLite bootstrap and schema migrations

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod paths;
pub mod time;

pub use error::{Error, Result};
pub use model::{Artist, ChordSheetRecord, DataSource, SavedState, SearchHit, Song};
pub use paths::normalize_path;
pub use time::{Clock, ManualClock, SystemClock};

//! HTTP API handlers for chordvault-server

pub mod artist_songs;
pub mod chord_sheets;
pub mod health;
pub mod maintenance;
pub mod search;

pub use artist_songs::artist_song_routes;
pub use chord_sheets::chord_sheet_routes;
pub use health::health_routes;
pub use maintenance::maintenance_routes;
pub use search::search_routes;

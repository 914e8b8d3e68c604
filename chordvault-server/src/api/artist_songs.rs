//! Artist song list endpoint

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chordvault_common::Song;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ArtistSongsQuery {
    #[serde(rename = "artistPath")]
    pub artist_path: Option<String>,
}

/// GET /artist-songs?artistPath=<slug>
///
/// A missing or blank `artistPath` is rejected before any tier is touched.
pub async fn get_artist_songs(
    State(state): State<AppState>,
    Query(query): Query<ArtistSongsQuery>,
) -> ApiResult<Json<Vec<Song>>> {
    let artist_path = query
        .artist_path
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing artist path".to_string()))?;

    let songs = state.orchestrator.get_artist_songs(&artist_path).await?;
    Ok(Json(songs))
}

pub fn artist_song_routes() -> Router<AppState> {
    Router::new().route("/artist-songs", get(get_artist_songs))
}

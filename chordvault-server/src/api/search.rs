//! Artist and free-form search endpoints

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chordvault_common::{Artist, SearchHit};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ArtistQuery {
    pub artist: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub artist: Option<String>,
    pub song: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// GET /artists?artist=<query>
pub async fn search_artists(
    State(state): State<AppState>,
    Query(query): Query<ArtistQuery>,
) -> ApiResult<Json<Vec<Artist>>> {
    let artist = non_blank(query.artist)
        .ok_or_else(|| ApiError::BadRequest("Missing artist query".to_string()))?;

    Ok(Json(state.orchestrator.search_artists(&artist).await?))
}

/// GET /search?artist=&song=
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<SearchHit>>> {
    let artist = non_blank(query.artist);
    let song = non_blank(query.song);
    if artist.is_none() && song.is_none() {
        return Err(ApiError::BadRequest("Missing search query".to_string()));
    }

    let hits = state
        .orchestrator
        .search(artist.as_deref(), song.as_deref())
        .await?;
    Ok(Json(hits))
}

pub fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/artists", get(search_artists))
        .route("/search", get(search))
}

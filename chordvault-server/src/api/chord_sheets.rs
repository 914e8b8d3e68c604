//! Chord sheet endpoints
//!
//! - `GET /chord-sheets/*path` resolves through the tier chain
//! - `POST /chord-sheets` stores a client upload as saved
//! - `PUT /chord-sheets/saved` toggles the saved flag
//! - `PUT /chord-sheets/content` edits content
//!
//! The PUT actions share the catch-all route with GET and dispatch on the
//! action segment.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chordvault_common::ChordSheetRecord;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::services::NewChordSheet;
use crate::AppState;

/// Body of `PUT /chord-sheets/saved`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SetSavedRequest {
    pub path: String,
    pub saved: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetSavedResponse {
    pub path: String,
    pub saved: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EditContentRequest {
    pub path: String,
    pub content: String,
}

/// GET /chord-sheets/*path
pub async fn get_chord_sheet(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> ApiResult<Json<ChordSheetRecord>> {
    state
        .orchestrator
        .get_chord_sheet(&path)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// POST /chord-sheets
pub async fn save_chord_sheet(
    State(state): State<AppState>,
    Json(sheet): Json<NewChordSheet>,
) -> ApiResult<(StatusCode, Json<ChordSheetRecord>)> {
    let record = state.orchestrator.save_chord_sheet(sheet).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// PUT /chord-sheets/{saved|content}
pub async fn update_chord_sheet(
    State(state): State<AppState>,
    Path(action): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<Response> {
    let parse_error = |e: serde_json::Error| ApiError::BadRequest(format!("Invalid request body: {}", e));
    match action.trim_matches('/') {
        "saved" => {
            let request = serde_json::from_value(body).map_err(parse_error)?;
            Ok(set_saved(&state, request).await?.into_response())
        }
        "content" => {
            let request = serde_json::from_value(body).map_err(parse_error)?;
            Ok(edit_content(&state, request).await?.into_response())
        }
        _ => Err(ApiError::NotFound),
    }
}

async fn set_saved(state: &AppState, request: SetSavedRequest) -> ApiResult<Json<SetSavedResponse>> {
    if !state.orchestrator.set_saved(&request.path, request.saved).await? {
        return Err(ApiError::NotFound);
    }

    Ok(Json(SetSavedResponse {
        path: chordvault_common::normalize_path(&request.path),
        saved: request.saved,
    }))
}

async fn edit_content(state: &AppState, request: EditContentRequest) -> ApiResult<Json<ChordSheetRecord>> {
    state
        .orchestrator
        .edit_content(&request.path, &request.content)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

pub fn chord_sheet_routes() -> Router<AppState> {
    Router::new()
        .route("/chord-sheets", post(save_chord_sheet))
        .route("/chord-sheets/*path", get(get_chord_sheet).put(update_chord_sheet))
}

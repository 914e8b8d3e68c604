//! HTTP API Integration Tests
//!
//! Drives the router with `oneshot` against an orchestrator wired to the
//! doubles in `helpers`.

mod helpers;

use std::sync::atomic::Ordering;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use chordvault_common::SearchHit;
use helpers::{artist, ed_sheeran_songs, wonderwall_sheet, Harness, MockFallback};

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn with_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ============================================================================
// GET /artist-songs
// ============================================================================

#[tokio::test]
async fn artist_songs_without_path_is_rejected_before_any_tier() {
    // Given: a service whose tiers count every call
    let harness = Harness::new().await;

    // When: artistPath is absent or blank
    let (missing_status, missing_body) = send(harness.app(), get("/artist-songs")).await;
    let (blank_status, blank_body) = send(harness.app(), get("/artist-songs?artistPath=%20")).await;

    // Then: 400 and no tier was contacted
    assert_eq!(missing_status, StatusCode::BAD_REQUEST);
    assert_eq!(missing_body, json!({ "error": "Missing artist path" }));
    assert_eq!(blank_status, StatusCode::BAD_REQUEST);
    assert_eq!(blank_body, json!({ "error": "Missing artist path" }));
    assert_eq!(harness.fallback.total_calls(), 0);
    assert_eq!(harness.blobs.reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn artist_songs_returns_song_list() {
    let harness = Harness::with_fallback(MockFallback::new().with_songs(ed_sheeran_songs())).await;

    let (status, body) = send(harness.app(), get("/artist-songs?artistPath=ed-sheeran")).await;

    assert_eq!(status, StatusCode::OK);
    let songs = body.as_array().expect("song array");
    assert_eq!(songs.len(), 3);
    assert_eq!(songs[0]["path"], "ed-sheeran/perfect");
    assert_eq!(songs[0]["displayName"], "Perfect");
}

#[tokio::test]
async fn artist_songs_upstream_failure_is_bad_gateway() {
    let harness = Harness::with_fallback(MockFallback::new().failing("sidecar offline")).await;

    let (status, body) = send(harness.app(), get("/artist-songs?artistPath=ed-sheeran")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Bad Gateway");
    assert!(body["details"].as_str().unwrap().contains("sidecar offline"));
}

// ============================================================================
// GET /artists, GET /search
// ============================================================================

#[tokio::test]
async fn artist_search_requires_query() {
    let harness = Harness::new().await;

    let (status, body) = send(harness.app(), get("/artists")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Missing artist query" }));
    assert_eq!(harness.directory.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn artist_search_returns_canonical_artists() {
    let harness = Harness::with_fallback(
        MockFallback::new().with_hits(vec![SearchHit::Artist(artist("Oasis", "oasis"))]),
    )
    .await;

    let (status, body) = send(harness.app(), get("/artists?artist=oasis")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{ "displayName": "Oasis", "path": "oasis", "songCount": null }])
    );
}

#[tokio::test]
async fn search_requires_artist_or_song() {
    let harness = Harness::new().await;

    let (status, body) = send(harness.app(), get("/search?artist=&song=")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Missing search query" }));
    assert_eq!(harness.fallback.total_calls(), 0);
}

#[tokio::test]
async fn search_returns_tagged_hits() {
    let harness = Harness::with_fallback(
        MockFallback::new().with_hits(vec![SearchHit::Song(helpers::song(
            "Oasis",
            "oasis",
            "Wonderwall",
            "wonderwall",
        ))]),
    )
    .await;

    let (status, body) = send(harness.app(), get("/search?artist=oasis&song=wonderwall")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["kind"], "song");
    assert_eq!(body[0]["path"], "oasis/wonderwall");
}

// ============================================================================
// Chord sheets
// ============================================================================

#[tokio::test]
async fn chord_sheet_found_and_not_found() {
    let harness = Harness::with_fallback(MockFallback::new().with_sheet(wonderwall_sheet())).await;

    let (status, body) = send(harness.app(), get("/chord-sheets/oasis/wonderwall")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Wonderwall");
    assert_eq!(body["artist"], "Oasis");
    assert_eq!(body["saved"], false);
    assert_eq!(body["dataSource"], "scrape");

    let empty = Harness::new().await;
    let (status, body) = send(empty.app(), get("/chord-sheets/oasis/unreleased")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Not Found" }));
}

#[tokio::test]
async fn upload_then_toggle_and_edit() {
    let harness = Harness::new().await;

    // Given: a client upload
    let (status, body) = send(
        harness.app(),
        with_json(
            "POST",
            "/chord-sheets",
            json!({ "artist": "Ed Sheeran", "title": "Perfect", "content": "G Em C D" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["path"], "ed-sheeran/perfect");
    assert_eq!(body["saved"], true);
    assert_eq!(body["expiresAt"], Value::Null);

    // When: the saved flag is cleared
    let (status, body) = send(
        harness.app(),
        with_json("PUT", "/chord-sheets/saved", json!({ "path": "Ed-Sheeran/Perfect", "saved": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "path": "ed-sheeran/perfect", "saved": false }));

    // Then: content can still be edited during the grace period
    let (status, body) = send(
        harness.app(),
        with_json(
            "PUT",
            "/chord-sheets/content",
            json!({ "path": "ed-sheeran/perfect", "content": "Capo 1: G Em C D" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "Capo 1: G Em C D");
    assert_eq!(body["version"], 2);
    assert_eq!(harness.fallback.total_calls(), 0);
}

#[tokio::test]
async fn upload_validation_and_unknown_paths() {
    let harness = Harness::new().await;

    let (status, body) = send(
        harness.app(),
        with_json("POST", "/chord-sheets", json!({ "title": "Perfect", "content": "G" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Missing artist" }));

    let (status, _) = send(
        harness.app(),
        with_json("PUT", "/chord-sheets/saved", json!({ "path": "nobody/nothing", "saved": true })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        harness.app(),
        with_json("PUT", "/chord-sheets/content", json!({ "path": "nobody/nothing", "content": "C" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Maintenance and health
// ============================================================================

#[tokio::test]
async fn maintenance_expire_reports_removed_count() {
    let harness = Harness::with_fallback(MockFallback::new().with_sheet(wonderwall_sheet())).await;
    send(harness.app(), get("/chord-sheets/oasis/wonderwall")).await;

    harness.clock.advance(chrono::Duration::days(8));
    let request = Request::builder()
        .method("POST")
        .uri("/maintenance/expire")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(harness.app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "removed": 1 }));
}

#[tokio::test]
async fn health_reports_module_identity() {
    let harness = Harness::new().await;

    let (status, body) = send(harness.app(), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "chordvault-server");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["uptimeSeconds"].is_u64());
}

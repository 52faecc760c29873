//! Drives the router in-process against an in-memory store.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeDelta, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use fartmap_api::{build_router, AppState};
use fartmap_stats::ClusterParams;
use fartmap_store::MemoryStore;

const API_SECRET: &str = "test-api-secret";
const ADMIN_KEY: &str = "test-admin-key";

fn app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::new(
        store.clone(),
        API_SECRET,
        ADMIN_KEY,
        ClusterParams::default(),
    ));
    (build_router(state), store)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-api-key", API_SECRET)
        .body(Body::empty())
        .unwrap()
}

fn post_json(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/events")
        .header("x-api-key", API_SECRET)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

async fn submit(app: &Router, body: Value) {
    let (status, _) = send(app, post_json(&body.to_string())).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn health_check_needs_no_key() {
    let (app, _) = app();
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));
}

#[tokio::test]
async fn submitted_event_reads_back_privacy_rounded() {
    let (app, store) = app();
    let (status, body) = send(
        &app,
        post_json(r#"{"latitude": 37.7749, "longitude": -122.4194, "accuracy": 10}"#),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["ok"], true);

    let (status, events) = send(&app, get("/events")).await;
    assert_eq!(status, StatusCode::OK);
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 1);
    let lat = events[0]["latitude"].as_f64().unwrap();
    let lng = events[0]["longitude"].as_f64().unwrap();
    assert!((lat - 37.7749).abs() <= 1e-4);
    assert!((lng - (-122.4194)).abs() <= 1e-4);
    assert_eq!(events[0]["accuracy"], 10.0);
    assert_eq!(events[0]["source"], "gps");

    let raw = store.records();
    assert_eq!(raw[0]["encodedLat"], "39a3d2");
    assert!(raw[0].get("latitude").is_none());
}

#[tokio::test]
async fn non_numeric_latitude_is_rejected_and_store_unchanged() {
    let (app, store) = app();
    submit(&app, json!({"latitude": 1.0, "longitude": 1.0})).await;

    let (status, body) = send(&app, post_json(r#"{"latitude": "bad", "longitude": 1.0}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(&app, post_json(r#"{"lat": "bad", "lng": -122.4}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (_, events) = send(&app, get("/events")).await;
    assert_eq!(events.as_array().unwrap().len(), 1);
    assert_eq!(store.records().len(), 1);
}

#[tokio::test]
async fn missing_or_out_of_range_coordinates_are_rejected() {
    let (app, store) = app();
    for body in [
        r#"{"longitude": 1.0}"#,
        r#"{"latitude": 95.0, "longitude": 1.0}"#,
        r#"{"latitude": 1.0, "longitude": 181.0}"#,
        r#"not json"#,
    ] {
        let (status, _) = send(&app, post_json(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
    }
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn requests_without_api_key_are_rejected() {
    let (app, store) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/events")
        .header("x-api-key", "nope")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"latitude": 1.0, "longitude": 1.0}"#))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Unauthorized"}));
    assert!(store.records().is_empty());

    let request = Request::builder().uri("/events").body(Body::empty()).unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn delete_requires_admin_key() {
    let (app, store) = app();
    submit(&app, json!({"latitude": 1.0, "longitude": 1.0})).await;

    // API key alone is not enough.
    let request = Request::builder()
        .method("DELETE")
        .uri("/events")
        .header("x-api-key", API_SECRET)
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Admin key without the API key is not enough either.
    let request = Request::builder()
        .method("DELETE")
        .uri("/events")
        .header("x-admin-key", ADMIN_KEY)
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, events) = send(&app, get("/events")).await;
    assert_eq!(events.as_array().unwrap().len(), 1);

    let request = Request::builder()
        .method("DELETE")
        .uri("/events")
        .header("x-api-key", API_SECRET)
        .header("x-admin-key", ADMIN_KEY)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared"], 1);
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn window_filter_applies_to_events_and_leaderboard() {
    let (app, _) = app();
    let old = (Utc::now() - TimeDelta::days(3)).to_rfc3339();
    submit(&app, json!({"lat": 1.0, "lng": 1.0, "deviceId": "A", "ts": old})).await;
    submit(&app, json!({"lat": 1.0, "lng": 1.0, "deviceId": "A"})).await;
    submit(&app, json!({"lat": 1.0, "lng": 1.0, "deviceId": "B"})).await;

    let (_, all) = send(&app, get("/events")).await;
    assert_eq!(all.as_array().unwrap().len(), 3);
    let (_, recent) = send(&app, get("/events?window=day")).await;
    assert_eq!(recent.as_array().unwrap().len(), 2);

    let (status, board) = send(&app, get("/leaderboard?window=all&device_id=B")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board["entries"][0]["deviceId"], "A");
    assert_eq!(board["entries"][0]["count"], 2);
    assert_eq!(board["entries"][1]["deviceId"], "B");
    assert_eq!(board["myCount"], 1);

    let (_, board) = send(&app, get("/leaderboard?window=day")).await;
    assert_eq!(board["entries"][0]["count"], 1);
    assert_eq!(board["entries"][1]["count"], 1);
    assert_eq!(board["total"], 2);
}

#[tokio::test]
async fn unknown_window_is_a_client_error() {
    let (app, _) = app();
    let (status, _) = send(&app, get("/leaderboard?window=fortnight")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn window_names_are_case_insensitive() {
    let (app, _) = app();
    submit(&app, json!({"latitude": 1.0, "longitude": 1.0, "deviceId": "A"})).await;

    let (status, events) = send(&app, get("/events?window=DAY")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(events.as_array().unwrap().len(), 1);

    let (status, board) = send(&app, get("/leaderboard?window=24h&device_id=A")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board["window"], "day");
    assert_eq!(board["myCount"], 1);
}

#[tokio::test]
async fn hot_zones_cluster_recent_events_in_viewport() {
    let (app, _) = app();
    for (lat, lng) in [(48.8566, 2.3522), (48.8570, 2.3530), (48.8560, 2.3510), (10.0, 10.0)] {
        submit(&app, json!({"latitude": lat, "longitude": lng})).await;
    }

    let (status, zones) = send(&app, get("/hot-zones")).await;
    assert_eq!(status, StatusCode::OK);
    let zones = zones.as_array().unwrap();
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0]["count"], 3);

    let (_, zones) = send(&app, get("/hot-zones?bbox=0,0,20,20")).await;
    assert!(zones.as_array().unwrap().is_empty());

    let (status, _) = send(&app, get("/hot-zones?bbox=1,2,3")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/hot-zones?threshold=-1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn vanishing_hot_zone_threshold_is_served() {
    let (app, _) = app();
    for _ in 0..3 {
        submit(&app, json!({"latitude": 37.7749, "longitude": -122.4194})).await;
    }
    submit(&app, json!({"latitude": 37.7751, "longitude": -122.4194})).await;

    let (status, zones) = send(&app, get("/hot-zones?threshold=1e-300&min_size=2")).await;
    assert_eq!(status, StatusCode::OK);
    let zones = zones.as_array().unwrap();
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0]["count"], 3);
}

#[tokio::test]
async fn profile_reports_streak_and_xp() {
    let (app, _) = app();
    submit(
        &app,
        json!({"latitude": 44.9778, "longitude": -93.265, "deviceId": "me", "displayName": "WindyTooter7"}),
    )
    .await;
    submit(&app, json!({"latitude": 1.0, "longitude": 1.0, "deviceId": "someone-else"})).await;

    let (status, profile) = send(&app, get("/profile/me")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["total"], 1);
    assert_eq!(profile["label"], "WindyTooter7");
    assert_eq!(profile["xp"], 10 + 50 + 100);
    assert_eq!(profile["currentStreak"], 1);
    assert_eq!(profile["events"].as_array().unwrap().len(), 1);
}

//! Integration tests for the HTTP surface
//!
//! The router is driven in-process with `oneshot`; storage lives in a
//! temporary directory per test.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use server::auth::{CredentialStore, CredentialStoreError};
use server::config::{RawSettings, ServerConfig};
use server::{build_router, ServerState};
use tempfile::TempDir;
use tower::ServiceExt;

const PNG_1X1_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z/C/HgAGgwJ/lK3Q6wAAAABJRU5ErkJggg==";
const CLIENT: &str = "web";
const TOKEN: &str = "test-shared-token";

fn test_config(tmp: &TempDir) -> ServerConfig {
    ServerConfig::from_raw(test_settings(tmp)).expect("valid test config")
}

fn test_settings(tmp: &TempDir) -> RawSettings {
    RawSettings {
        host: Some("http://localhost".into()),
        port: Some("9000".into()),
        api_allowed_origins: Some(r#"["http://localhost:3000"]"#.into()),
        api_shared_tokens: Some(format!(r#"{{"{CLIENT}":"{TOKEN}"}}"#)),
        storage_dir: Some(tmp.path().join("storage").to_string_lossy().into_owned()),
        public_dir: Some(tmp.path().join("public").to_string_lossy().into_owned()),
        ..Default::default()
    }
}

/// Router over a fresh storage root, with the public link in place.
fn test_app() -> (TempDir, Router) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = test_config(&tmp);
    store::ensure_public_link(&config.storage_dir, &config.public_storage_link());
    let app = build_router(Arc::new(ServerState::new(config)));
    (tmp, app)
}

fn upload(article_id: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/articles/{article_id}/process-images"))
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-client-name", CLIENT)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn compact_png() -> String {
    codec::compress(&format!("data:image/png;base64,{PNG_1X1_B64}"))
}

#[tokio::test]
async fn test_banner_and_health() {
    let (_tmp, app) = test_app();

    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("<h1>Static server with Rust and axum</h1>"));
    assert!(html.contains(r#"href="/images""#));
    assert!(html.contains(r#"href="/storage""#));

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "ready");
}

#[tokio::test]
async fn test_auth_failures() {
    let (_tmp, app) = test_app();
    let body = json!({ "images": [compact_png()] }).to_string();

    let cases: Vec<(Vec<(&str, &str)>, StatusCode, Value)> = vec![
        (
            vec![],
            StatusCode::BAD_REQUEST,
            json!({"error": "Client identifier missing", "details": "Include x-client-name header"}),
        ),
        (
            vec![("x-client-name", "mobile")],
            StatusCode::UNAUTHORIZED,
            json!({"error": "Unknown client"}),
        ),
        (
            vec![("x-client-name", CLIENT)],
            StatusCode::UNAUTHORIZED,
            json!({"error": "Authorization header missing"}),
        ),
        (
            vec![("x-client-name", CLIENT), ("authorization", "Token abc")],
            StatusCode::UNAUTHORIZED,
            json!({"error": "Invalid authorization format", "details": "Expected: Bearer <token>"}),
        ),
        (
            vec![("x-client-name", CLIENT), ("authorization", "Bearer wrong")],
            StatusCode::UNAUTHORIZED,
            json!({"error": "Invalid token for this client"}),
        ),
    ];

    for (headers, status, expected) in cases {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/articles/1/process-images")
            .header(header::CONTENT_TYPE, "application/json");
        for (name, value) in &headers {
            builder = builder.header(*name, *value);
        }
        let response = app
            .clone()
            .oneshot(builder.body(Body::from(body.clone())).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), status, "{headers:?}");
        assert_eq!(body_json(response).await, expected, "{headers:?}");
    }
}

struct Unavailable;

impl CredentialStore for Unavailable {
    fn lookup(&self, _client: &str) -> Result<Option<String>, CredentialStoreError> {
        Err(CredentialStoreError("token database unreachable".into()))
    }
}

#[tokio::test]
async fn test_credential_store_failure_is_500() {
    let tmp = tempfile::tempdir().unwrap();
    let state = ServerState::with_credentials(test_config(&tmp), Arc::new(Unavailable));
    let app = build_router(Arc::new(state));

    let response = app
        .oneshot(upload("1", json!({ "images": [] })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Internal server error"})
    );
}

#[tokio::test]
async fn test_validation_failures() {
    let (_tmp, app) = test_app();

    let cases = vec![
        (json!({}), json!({"error": "Images array is required"})),
        (
            json!({"images": "nope"}),
            json!({"error": "Images must be an array"}),
        ),
        (
            json!({"images": vec!["base64string"; 11]}),
            json!({"error": "Too many images", "details": "Maximum 10 images allowed"}),
        ),
        (
            json!({"images": ["ok", 5]}),
            json!({"error": "Invalid image format", "details": "Image at index 1 must be a string"}),
        ),
        (
            json!({"images": ["data:application/x-msdownload;base64,TVqQ"]}),
            json!({"error": "Unsupported file type", "details": "Unsupported type: application/x-msdownload"}),
        ),
    ];

    for (body, expected) in cases {
        let response = app.clone().oneshot(upload("1", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, expected);
    }
}

#[tokio::test]
async fn test_malformed_json_and_bad_article_id() {
    let (_tmp, app) = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/articles/1/process-images")
        .header("x-client-name", CLIENT)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Invalid JSON body");

    let response = app
        .oneshot(upload("..", json!({ "images": [compact_png()] })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Invalid article id");
}

#[tokio::test]
async fn test_upload_then_fetch_public_file() {
    let (_tmp, app) = test_app();

    let response = app
        .clone()
        .oneshot(upload("42", json!({ "images": [compact_png()] })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let names = body["imageNames"].as_array().expect("imageNames array");
    assert_eq!(names.len(), 1);
    let name = names[0].as_str().unwrap();
    assert!(name.ends_with(".png"), "{name}");

    let response = app
        .clone()
        .oneshot(get(&format!("/api/public-file/42/{name}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "public, max-age=86400"
    );
    let expected = STANDARD.decode(PNG_1X1_B64).unwrap();
    assert_eq!(body_bytes(response).await, expected);

    let response = app
        .oneshot(get(&format!("/images/42/{name}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, expected);
}

#[tokio::test]
async fn test_reprocessing_replaces_previous_images() {
    let (_tmp, app) = test_app();

    let first = body_json(
        app.clone()
            .oneshot(upload("7", json!({ "images": [compact_png(), compact_png()] })))
            .await
            .unwrap(),
    )
    .await;
    let second = body_json(
        app.clone()
            .oneshot(upload("7", json!({ "images": [compact_png()] })))
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(first["imageNames"].as_array().unwrap().len(), 2);
    assert_eq!(second["imageNames"].as_array().unwrap().len(), 1);

    let old = first["imageNames"][0].as_str().unwrap();
    let response = app
        .oneshot(get(&format!("/api/public-file/7/{old}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_bytes(response).await, b"File not found");
}

#[tokio::test]
async fn test_skipped_items_are_omitted() {
    let (_tmp, app) = test_app();
    let images = json!([
        format!("data:image/png;base64,{PNG_1X1_B64}"),
        "data:image/png;base64",
    ]);

    let response = app
        .oneshot(upload("9", json!({ "images": images })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["imageNames"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_not_found_responses() {
    let (_tmp, app) = test_app();

    let response = app.clone().oneshot(get("/no/such/route")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({"error": "Not found"}));

    let response = app.clone().oneshot(get("/images/nope.png")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_bytes(response).await,
        b"Sorry, the image you are looking for does not exist."
    );

    let response = app.clone().oneshot(get("/storage/nope.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_bytes(response).await,
        b"Sorry, the requested file in storage does not exist."
    );

    let response = app
        .oneshot(get("/api/public-file/..%2Fetc/passwd"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_bytes(response).await, b"File not found");
}

#[tokio::test]
async fn test_timed_out_upload_keeps_article_locked_until_written() {
    let tmp = tempfile::tempdir().unwrap();
    let raw = RawSettings {
        request_timeout_secs: Some("0".into()),
        ..test_settings(&tmp)
    };
    let config = ServerConfig::from_raw(raw).unwrap();
    let article_dir = config.article_dir("5");
    let state = Arc::new(ServerState::new(config));
    let app = build_router(state.clone());

    let images = vec![compact_png(); 10];
    let response = app
        .oneshot(upload("5", json!({ "images": images })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

    let stored = || {
        std::fs::read_dir(&article_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    };
    // Either the batch is still running under the lock or it has fully landed.
    assert!(state.article_locks.is_held("5") || stored() == 10);

    for _ in 0..200 {
        if state.article_locks.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert!(state.article_locks.is_empty(), "lock entry leaked");
    assert_eq!(stored(), 10);
}

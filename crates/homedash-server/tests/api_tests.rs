//! Integration tests for the homedash HTTP API.
//!
//! Drive the full router in-process over an in-memory document store, with
//! the principal supplied through the default proxy headers.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use homedash_core::engine::ConfigEngine;
use homedash_server::config::PrincipalHeaders;
use homedash_server::routes;
use homedash_server::state::AppState;
use homedash_storage::{DocumentStore, MemoryStore};

fn seeded() -> Value {
    json!({
        "title": "Home Lab",
        "layout": {
            "desktop": [
                {"id": "a1", "type": "pihole-widget", "config": {"host": "10.0.0.2", "apiToken": "ENC(xxx)"}},
                {"id": "a2", "type": "sonarr-widget", "adminOnly": true, "config": {"apiKey": "sonarr-key"}}
            ],
            "mobile": []
        },
        "pages": [
            {"id": "p1", "name": "Ops", "adminOnly": true, "layout": {"desktop": [], "mobile": []}}
        ]
    })
}

fn app_with(contents: &Value) -> (Router, MemoryStore) {
    let store = MemoryStore::with_contents(serde_json::to_vec(contents).unwrap());
    let state = Arc::new(AppState {
        engine: ConfigEngine::new(Arc::new(store.clone())),
        principal: PrincipalHeaders::default(),
    });
    (routes::router(state), store)
}

#[derive(Clone, Copy)]
enum As {
    Anonymous,
    User,
    Admin,
}

fn request(method: &str, uri: &str, who: As, body: Option<&Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    match who {
        As::Anonymous => {}
        As::User => {
            builder = builder
                .header("x-forwarded-user", "bob")
                .header("x-forwarded-role", "user");
        }
        As::Admin => {
            builder = builder
                .header("x-forwarded-user", "alice")
                .header("x-forwarded-role", "admin");
        }
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, body)
}

async fn on_disk(store: &MemoryStore) -> Value {
    serde_json::from_slice(&store.read().await.unwrap().unwrap()).unwrap()
}

// ── Read ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_read_is_redacted() {
    let (app, _) = app_with(&seeded());
    let (status, _, body) = send(&app, request("GET", "/api/config", As::Admin, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["layout"]["desktop"][0]["config"],
        json!({"host": "10.0.0.2", "_hasApiToken": true})
    );
    assert_eq!(body["layout"]["desktop"][1]["config"], json!({"_hasApiKey": true}));
    assert_eq!(body["pages"].as_array().unwrap().len(), 1);

    let text = body.to_string();
    assert!(!text.contains("ENC(xxx)"));
    assert!(!text.contains("sonarr-key"));
}

#[tokio::test]
async fn non_admin_read_hides_admin_only_content() {
    let (app, _) = app_with(&seeded());
    for who in [As::Anonymous, As::User] {
        let (status, _, body) = send(&app, request("GET", "/api/config", who, None)).await;
        assert_eq!(status, StatusCode::OK);
        let desktop = body["layout"]["desktop"].as_array().unwrap();
        assert_eq!(desktop.len(), 1);
        assert_eq!(desktop[0]["id"], "a1");
        assert_eq!(body["pages"], json!([]));
        assert!(!body.to_string().contains("a2"));
    }
}

#[tokio::test]
async fn read_of_empty_store_is_empty_document() {
    let app = routes::router(Arc::new(AppState {
        engine: ConfigEngine::new(Arc::new(MemoryStore::new())),
        principal: PrincipalHeaders::default(),
    }));
    let (status, _, body) = send(&app, request("GET", "/api/config", As::User, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"layout": {"desktop": [], "mobile": []}, "pages": []}));
}

// ── Save ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn echoing_a_redacted_read_keeps_secrets() {
    let (app, store) = app_with(&seeded());
    let (_, _, read) = send(&app, request("GET", "/api/config", As::Admin, None)).await;

    let (status, _, body) = send(&app, request("POST", "/api/config", As::Admin, Some(&read))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Configuration saved successfully");
    assert!(body.get("warnings").is_none());
    assert_eq!(body["updatedConfig"], read);

    assert_eq!(on_disk(&store).await, seeded());
}

#[tokio::test]
async fn save_with_new_literal_replaces_secret() {
    let (app, store) = app_with(&seeded());
    let update = json!({"layout": {"desktop": [
        {"id": "a1", "type": "pihole-widget", "config": {"host": "10.0.0.2", "apiToken": "fresh"}}
    ], "mobile": []}});

    let (status, _, body) = send(&app, request("POST", "/api/config", As::Admin, Some(&update))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.to_string().contains("fresh"));
    assert_eq!(
        on_disk(&store).await["layout"]["desktop"][0]["config"]["apiToken"],
        "fresh"
    );
}

#[tokio::test]
async fn save_of_duplicated_item_copies_source_secrets() {
    let (app, store) = app_with(&seeded());
    let update = json!({"layout": {"desktop": [
        {"id": "a1", "type": "pihole-widget", "config": {"host": "10.0.0.2", "_hasApiToken": true}},
        {"id": "a9", "type": "pihole-widget", "config": {"host": "10.0.0.2", "_hasApiToken": true, "_duplicatedFrom": "a1"}}
    ], "mobile": []}});

    let (status, _, _) = send(&app, request("POST", "/api/config", As::Admin, Some(&update))).await;
    assert_eq!(status, StatusCode::OK);

    let stored = on_disk(&store).await;
    assert_eq!(
        stored["layout"]["desktop"][1]["config"],
        json!({"host": "10.0.0.2", "apiToken": "ENC(xxx)"})
    );
}

#[tokio::test]
async fn flags_for_unknown_items_produce_warnings() {
    let (app, _) = app_with(&seeded());
    let update = json!({"layout": {"desktop": [
        {"id": "zz", "type": "pihole-widget", "config": {"_hasApiToken": true}}
    ]}});

    let (status, _, body) = send(&app, request("POST", "/api/config", As::Admin, Some(&update))).await;
    assert_eq!(status, StatusCode::OK);
    let warnings = body["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["itemId"], "zz");
}

#[tokio::test]
async fn non_admin_save_is_forbidden() {
    let (app, store) = app_with(&seeded());
    for who in [As::Anonymous, As::User] {
        let (status, _, body) =
            send(&app, request("POST", "/api/config", who, Some(&json!({"title": "x"})))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");
    }
    assert_eq!(on_disk(&store).await, seeded());
}

#[tokio::test]
async fn malformed_save_is_bad_request() {
    let (app, store) = app_with(&seeded());
    let (status, _, body) =
        send(&app, request("POST", "/api/config", As::Admin, Some(&json!([1, 2, 3])))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
    assert_eq!(on_disk(&store).await, seeded());
}

#[tokio::test]
async fn duplicate_ids_are_bad_request() {
    let (app, _) = app_with(&seeded());
    let update = json!({"layout": {
        "desktop": [{"id": "a1", "type": "pihole-widget"}],
        "mobile": [{"id": "a1", "type": "pihole-widget"}]
    }});
    let (status, _, body) = send(&app, request("POST", "/api/config", As::Admin, Some(&update))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("a1"));
}

#[tokio::test]
async fn save_over_invalid_persisted_document_is_server_error() {
    let store = MemoryStore::with_contents(r#"{"title": "Lab", "layout": {"mobile": "oops"}}"#);
    let app = routes::router(Arc::new(AppState {
        engine: ConfigEngine::new(Arc::new(store.clone())),
        principal: PrincipalHeaders::default(),
    }));

    let (status, _, body) =
        send(&app, request("POST", "/api/config", As::Admin, Some(&json!({"title": "x"})))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
    assert_eq!(
        store.read().await.unwrap().unwrap(),
        br#"{"title": "Lab", "layout": {"mobile": "oops"}}"#.to_vec()
    );
}

// ── Export / import ──────────────────────────────────────────────────

#[tokio::test]
async fn export_returns_real_secrets_as_attachment() {
    let (app, _) = app_with(&seeded());
    let (status, headers, body) =
        send(&app, request("GET", "/api/config/export", As::Admin, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, seeded());
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"homedash-config-"));
    assert!(disposition.ends_with(".json\""));
}

#[tokio::test]
async fn non_admin_export_is_forbidden() {
    let (app, _) = app_with(&seeded());
    let (status, _, body) = send(&app, request("GET", "/api/config/export", As::User, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!body.to_string().contains("ENC(xxx)"));
}

#[tokio::test]
async fn import_replaces_document() {
    let (app, store) = app_with(&json!({"layout": {"desktop": [], "mobile": []}}));
    let (status, _, body) =
        send(&app, request("POST", "/api/config/import", As::Admin, Some(&seeded()))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Configuration imported successfully");
    assert_eq!(body["updatedConfig"]["layout"]["desktop"][0]["config"]["_hasApiToken"], true);
    assert_eq!(on_disk(&store).await, seeded());
}

#[tokio::test]
async fn import_without_layout_is_bad_request() {
    let (app, _) = app_with(&seeded());
    let (status, _, _) = send(
        &app,
        request("POST", "/api/config/import", As::Admin, Some(&json!({"title": "x"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_admin_import_is_forbidden() {
    let (app, store) = app_with(&seeded());
    let (status, _, _) = send(
        &app,
        request("POST", "/api/config/import", As::User, Some(&json!({"layout": {}}))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(on_disk(&store).await, seeded());
}

// ── Health & headers ─────────────────────────────────────────────────

#[tokio::test]
async fn health_is_ok() {
    let (app, _) = app_with(&seeded());
    let (status, _, body) = send(&app, request("GET", "/api/health", As::Anonymous, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn responses_carry_hardening_headers() {
    let (app, _) = app_with(&seeded());
    let (_, headers, _) = send(&app, request("GET", "/api/config", As::User, None)).await;
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
}

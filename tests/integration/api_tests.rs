//! HTTP API tests against the router over an in-memory store

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use locallib_server::{
    api,
    config::AppConfig,
    repository::memory::InMemoryStore,
    services::{Pipelines, Services},
    AppState,
};

fn app() -> Router {
    let services = Services::new(Arc::new(InMemoryStore::new()), Pipelines::default());
    api::create_router(AppState::new(AppConfig::default(), services))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health_check() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/api/v1/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_genre_lifecycle() {
    let app = app();

    let (status, created) = send(&app, Method::POST, "/api/v1/genres", Some(json!({"name": "Fantasy"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, existing) = send(&app, Method::POST, "/api/v1/genres", Some(json!({"name": "Fantasy"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(existing["id"], created["id"]);

    let (status, detail) = send(&app, Method::GET, &format!("/api/v1/genres/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["genre"]["name"], "Fantasy");
    assert_eq!(detail["genre_books"], json!([]));

    let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/genres/{}", id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::DELETE, &format!("/api/v1/genres/{}?confirm=true", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = send(&app, Method::GET, &format!("/api/v1/genres/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchData");
}

#[tokio::test]
async fn test_invalid_submission_is_unprocessable() {
    let app = app();

    let (status, body) = send(&app, Method::POST, "/api/v1/authors", Some(json!({"first_name": " <b> "}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["draft"]["first_name"], "&lt;b&gt;");
    let fields: Vec<_> = body["violations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["field"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fields, ["family_name"]);
}

#[tokio::test]
async fn test_non_text_fields_are_reported_as_violations() {
    let app = app();

    let (status, body) = send(&app, Method::POST, "/api/v1/genres", Some(json!({"name": 12}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["draft"]["name"], "12");
    assert_eq!(body["violations"][0]["field"], "name");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/authors",
        Some(json!({"first_name": 42, "family_name": null, "date_of_birth": false})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["draft"]["first_name"], "42");
    let fields: Vec<_> = body["violations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["field"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fields, ["family_name", "date_of_birth"]);
}

#[tokio::test]
async fn test_referenced_author_delete_conflicts() {
    let app = app();

    let (_, author) = send(
        &app,
        Method::POST,
        "/api/v1/authors",
        Some(json!({"first_name": "Ann", "family_name": "Leckie"})),
    )
    .await;
    let author_id = author["id"].as_str().unwrap().to_string();

    let (status, book) = send(
        &app,
        Method::POST,
        "/api/v1/books",
        Some(json!({
            "title": "Ancillary Justice",
            "author": author_id,
            "summary": "A ship in a body",
            "isbn": "9780316246620",
            "genre": []
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/authors/{}?confirm=true", author_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "HasDependents");
    assert_eq!(body["dependents"][0]["id"], book["id"]);
    assert_eq!(body["dependents"][0]["collection"], "books");

    let (status, preview) = send(&app, Method::GET, &format!("/api/v1/authors/{}/delete", author_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["dependents"][0]["label"], "Ancillary Justice");

    let (status, counts) = send(&app, Method::GET, "/api/v1/catalog", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(counts["author_count"], 1);
    assert_eq!(counts["book_count"], 1);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = app();
    let (status, doc) = send(&app, Method::GET, "/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/genres/{id}"].is_object());
}

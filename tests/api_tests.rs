//! API integration tests

use axum::body::Body;
use axum::Router;
use fastfeet::queue::{Envelope, Queue};
use fastfeet::store::MIGRATOR;
use fastfeet::{api, AppState};
use hyper::{Request, StatusCode};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::mpsc;
use tower::ServiceExt;

async fn setup_app() -> (Router, mpsc::Receiver<Envelope>) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    MIGRATOR.run(&pool).await.expect("Failed to run migrations");

    let (queue, jobs) = Queue::bounded(16);
    let state = AppState::new(pool, queue);

    (api::router(state), jobs)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Create a deliveryman, a recipient and a delivery; returns (delivery_id, deliveryman_id)
async fn seed(app: &Router, email: &str) -> (i64, i64) {
    let (status, deliveryman) = send(
        app,
        "POST",
        "/deliverymen",
        Some(json!({ "name": "John Doe", "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, recipient) = send(
        app,
        "POST",
        "/recipients",
        Some(json!({
            "name": "Ana Souza",
            "street": "Rua das Flores",
            "number": "42",
            "state": "SP",
            "city": "Campinas",
            "zip_code": "13000-000"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let deliveryman_id = deliveryman["id"].as_i64().unwrap();
    let (status, delivery) = send(
        app,
        "POST",
        "/deliveries",
        Some(json!({
            "product": "Notebook",
            "recipient_id": recipient["id"],
            "deliveryman_id": deliveryman_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    (delivery["id"].as_i64().unwrap(), deliveryman_id)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _jobs) = setup_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_report_problem_as_owner() {
    let (app, _jobs) = setup_app().await;
    let (delivery_id, deliveryman_id) = seed(&app, "john@fastfeet.com").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/deliveries/{}/problems", delivery_id),
        Some(json!({ "description": "broken box", "deliveryman_id": deliveryman_id })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delivery_id"], delivery_id);
    assert_eq!(body["description"], "broken box");
    assert!(body["id"].is_i64());
}

#[tokio::test]
async fn test_report_problem_as_other_deliveryman() {
    let (app, _jobs) = setup_app().await;
    let (delivery_id, deliveryman_id) = seed(&app, "john@fastfeet.com").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/deliveries/{}/problems", delivery_id),
        Some(json!({ "description": "broken box", "deliveryman_id": deliveryman_id + 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("permission"));

    let (_, problems) = send(
        &app,
        "GET",
        &format!("/deliveries/{}/problems", delivery_id),
        None,
    )
    .await;
    assert_eq!(problems, json!([]));
}

#[tokio::test]
async fn test_report_problem_validation() {
    let (app, _jobs) = setup_app().await;
    let (delivery_id, _) = seed(&app, "john@fastfeet.com").await;
    let uri = format!("/deliveries/{}/problems", delivery_id);

    let (status, body) = send(&app, "POST", &uri, Some(json!({ "deliveryman_id": 1 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Validation fails"));

    let (status, _) = send(
        &app,
        "POST",
        &uri,
        Some(json!({ "description": "late", "deliveryman_id": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/deliveries/abc/problems", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_report_problem_on_missing_delivery() {
    let (app, _jobs) = setup_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/deliveries/999/problems",
        Some(json!({ "description": "late", "deliveryman_id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Delivery doesn't exist");
}

#[tokio::test]
async fn test_list_problems_paginated_and_filtered() {
    let (app, _jobs) = setup_app().await;
    let (delivery_id, deliveryman_id) = seed(&app, "john@fastfeet.com").await;
    let uri = format!("/deliveries/{}/problems", delivery_id);

    for i in 1..=7 {
        let description = if i == 3 {
            "Box CRUSHED".to_string()
        } else {
            format!("issue {}", i)
        };
        send(
            &app,
            "POST",
            &uri,
            Some(json!({ "description": description, "deliveryman_id": deliveryman_id })),
        )
        .await;
    }

    let (status, first) = send(&app, "GET", "/problems", None).await;
    assert_eq!(status, StatusCode::OK);
    let first = first.as_array().unwrap();
    assert_eq!(first.len(), 6);
    assert_eq!(first[0]["delivery"]["id"], delivery_id);
    assert_eq!(first[0]["delivery"]["status"], "pending");
    assert!(first[0].get("created_at").is_none());

    let (_, second) = send(&app, "GET", "/problems?page=2", None).await;
    assert_eq!(second.as_array().unwrap().len(), 1);
    assert_eq!(second[0]["description"], "issue 7");

    let (_, filtered) = send(&app, "GET", "/problems?q=crushed", None).await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    assert_eq!(filtered[0]["description"], "Box CRUSHED");

    let (status, _) = send(&app, "GET", "/problems?page=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/problems?page=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_show_problems_of_delivery() {
    let (app, _jobs) = setup_app().await;
    let (first, first_man) = seed(&app, "john@fastfeet.com").await;
    let (second, second_man) = seed(&app, "mary@fastfeet.com").await;

    send(
        &app,
        "POST",
        &format!("/deliveries/{}/problems", first),
        Some(json!({ "description": "dented", "deliveryman_id": first_man })),
    )
    .await;
    send(
        &app,
        "POST",
        &format!("/deliveries/{}/problems", second),
        Some(json!({ "description": "wet", "deliveryman_id": second_man })),
    )
    .await;

    let (status, body) = send(&app, "GET", &format!("/deliveries/{}/problems", first), None).await;
    assert_eq!(status, StatusCode::OK);
    let problems = body.as_array().unwrap();
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0]["description"], "dented");
    assert!(problems[0]["created_at"].is_string());
    assert_eq!(problems[0]["delivery"]["product"], "Notebook");
}

#[tokio::test]
async fn test_cancel_delivery_through_problem() {
    let (app, mut jobs) = setup_app().await;
    let (delivery_id, deliveryman_id) = seed(&app, "john@fastfeet.com").await;

    let (_, problem) = send(
        &app,
        "POST",
        &format!("/deliveries/{}/problems", delivery_id),
        Some(json!({ "description": "recipient moved", "deliveryman_id": deliveryman_id })),
    )
    .await;

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/problems/{}", problem["id"]),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], delivery_id);
    assert_eq!(body["status"], "canceled");
    assert!(body["canceled_at"].is_string());
    assert_eq!(body["deliveryman"]["id"], deliveryman_id);
    assert_eq!(body["recipient"]["name"], "Ana Souza");

    let envelope = jobs.try_recv().expect("cancellation mail queued");
    assert_eq!(envelope.job.key(), "CancellationMail");
    assert!(jobs.try_recv().is_err());

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/problems/{}", problem["id"]),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Delivery already canceled");
    assert!(jobs.try_recv().is_err());
}

#[tokio::test]
async fn test_cancel_finished_delivery() {
    let (app, mut jobs) = setup_app().await;
    let (delivery_id, deliveryman_id) = seed(&app, "john@fastfeet.com").await;

    let (_, problem) = send(
        &app,
        "POST",
        &format!("/deliveries/{}/problems", delivery_id),
        Some(json!({ "description": "late", "deliveryman_id": deliveryman_id })),
    )
    .await;

    let (status, _) = send(&app, "PUT", &format!("/deliveries/{}/start", delivery_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, finished) =
        send(&app, "PUT", &format!("/deliveries/{}/finish", delivery_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(finished["status"], "delivered");

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/problems/{}", problem["id"]),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Can't cancel a finished delivery");
    assert!(jobs.try_recv().is_err());

    let (_, delivery) = send(&app, "GET", &format!("/deliveries/{}", delivery_id), None).await;
    assert!(delivery["canceled_at"].is_null());
}

#[tokio::test]
async fn test_cancel_missing_problem() {
    let (app, _jobs) = setup_app().await;
    let (status, _) = send(&app, "DELETE", "/problems/123", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delivery_with_unknown_recipient() {
    let (app, _jobs) = setup_app().await;
    let (_, deliveryman_id) = seed(&app, "john@fastfeet.com").await;

    let (status, _) = send(
        &app,
        "POST",
        "/deliveries",
        Some(json!({ "product": "Desk", "recipient_id": 404, "deliveryman_id": deliveryman_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_deliveryman_email() {
    let (app, _jobs) = setup_app().await;
    seed(&app, "john@fastfeet.com").await;

    let (status, _) = send(
        &app,
        "POST",
        "/deliverymen",
        Some(json!({ "name": "Other John", "email": "john@fastfeet.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, all) = send(&app, "GET", "/deliverymen", None).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

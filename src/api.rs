//! HTTP routes and handlers

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{delete, get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::Result;
use crate::models::{
    CreateDeliveryRequest, CreateDeliverymanRequest, CreateRecipientRequest, CreatedProblem,
    Delivery, DeliveryDetail, Deliveryman, ProblemSummary, ProblemWithDate, Recipient,
};
use crate::problems::{parse_page, PAGE_SIZE};
use crate::validation;
use crate::AppState;

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/problems", get(list_problems))
        .route("/problems/:problem_id", delete(cancel_problem))
        .route(
            "/deliveries/:delivery_id/problems",
            get(show_problems).post(create_problem),
        )
        .route("/deliveries", get(list_deliveries).post(create_delivery))
        .route("/deliveries/:delivery_id", get(get_delivery))
        .route("/deliveries/:delivery_id/start", put(start_delivery))
        .route("/deliveries/:delivery_id/finish", put(finish_delivery))
        .route("/deliverymen", get(list_deliverymen).post(create_deliveryman))
        .route("/deliverymen/:id", get(get_deliveryman))
        .route("/recipients", get(list_recipients).post(create_recipient))
        .route("/recipients/:id", get(get_recipient))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub q: Option<String>,
}

// Problems

async fn list_problems(
    State(state): State<Arc<AppState>>,
    params: std::result::Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<ProblemSummary>>> {
    let Query(params) = params?;
    let problems = state
        .problems()
        .list(params.page, params.q.as_deref())
        .await?;
    Ok(Json(problems))
}

async fn create_problem(
    State(state): State<Arc<AppState>>,
    delivery_id: std::result::Result<Path<i64>, PathRejection>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<CreatedProblem>> {
    let Path(delivery_id) = delivery_id?;
    let Json(body) = body?;
    let created = state.problems().create(delivery_id, body).await?;
    Ok(Json(created))
}

async fn cancel_problem(
    State(state): State<Arc<AppState>>,
    problem_id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<DeliveryDetail>> {
    let Path(problem_id) = problem_id?;
    let delivery = state.problems().cancel(problem_id).await?;
    Ok(Json(delivery))
}

async fn show_problems(
    State(state): State<Arc<AppState>>,
    delivery_id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<ProblemWithDate>>> {
    let Path(delivery_id) = delivery_id?;
    let problems = state.problems().show(delivery_id).await?;
    Ok(Json(problems))
}

// Deliveries

async fn create_delivery(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Delivery>> {
    let Json(body) = body?;
    let req: CreateDeliveryRequest = validation::CREATE_DELIVERY.parse(body)?;
    let delivery = state.store.create_delivery(&req).await?;
    tracing::info!(delivery_id = delivery.id, "delivery created");
    Ok(Json(delivery))
}

async fn list_deliveries(
    State(state): State<Arc<AppState>>,
    params: std::result::Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Delivery>>> {
    let Query(params) = params?;
    let page = parse_page(params.page)?;
    let deliveries = state.store.list_deliveries(page, PAGE_SIZE).await?;
    Ok(Json(deliveries))
}

async fn get_delivery(
    State(state): State<Arc<AppState>>,
    delivery_id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<DeliveryDetail>> {
    let Path(delivery_id) = delivery_id?;
    let delivery = state.store.get_delivery_detail(delivery_id).await?;
    Ok(Json(delivery))
}

async fn start_delivery(
    State(state): State<Arc<AppState>>,
    delivery_id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<Delivery>> {
    let Path(delivery_id) = delivery_id?;
    let delivery = state.store.start_delivery(delivery_id).await?;
    tracing::info!(delivery_id, status = delivery.status.as_str(), "delivery withdrawn");
    Ok(Json(delivery))
}

async fn finish_delivery(
    State(state): State<Arc<AppState>>,
    delivery_id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<Delivery>> {
    let Path(delivery_id) = delivery_id?;
    let delivery = state.store.finish_delivery(delivery_id).await?;
    tracing::info!(delivery_id, status = delivery.status.as_str(), "delivery finished");
    Ok(Json(delivery))
}

// Deliverymen

async fn create_deliveryman(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Deliveryman>> {
    let Json(body) = body?;
    let req: CreateDeliverymanRequest = validation::CREATE_DELIVERYMAN.parse(body)?;
    let deliveryman = state.store.create_deliveryman(&req).await?;
    Ok(Json(deliveryman))
}

async fn list_deliverymen(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Deliveryman>>> {
    Ok(Json(state.store.list_deliverymen().await?))
}

async fn get_deliveryman(
    State(state): State<Arc<AppState>>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<Deliveryman>> {
    let Path(id) = id?;
    Ok(Json(state.store.get_deliveryman(id).await?))
}

// Recipients

async fn create_recipient(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Recipient>> {
    let Json(body) = body?;
    let req: CreateRecipientRequest = validation::CREATE_RECIPIENT.parse(body)?;
    let recipient = state.store.create_recipient(&req).await?;
    Ok(Json(recipient))
}

async fn list_recipients(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Recipient>>> {
    Ok(Json(state.store.list_recipients().await?))
}

async fn get_recipient(
    State(state): State<Arc<AppState>>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<Recipient>> {
    let Path(id) = id?;
    Ok(Json(state.store.get_recipient(id).await?))
}

//! HTTP API.
//!
//! Per enabled kind, with `{collection}` being `modules` or `components`:
//!
//! | Route | Effect |
//! |-------|--------|
//! | `GET /{collection}` | all documents keyed by id |
//! | `POST /{collection}` | submit a definition |
//! | `GET /{collection}/:id` | one document |
//! | `PATCH /{collection}/:id` | `{"state": ...}`, launch activation or deactivation |
//! | `DELETE /{collection}/:id` | launch removal of an inactive resource |
//!
//! plus `GET /health` and `GET /workers`. Accepted lifecycle requests answer
//! 200 as soon as the workflow is launched. A trailing slash is ignored, so
//! `/modules/` and `/modules/m1/` reach the same handlers.

mod error;

pub use error::{error_to_status, ApiError};

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tower_http::normalize_path::NormalizePath;
use tracing::debug;
use worker_framework::WorkerClient;

use crate::error::ManagerError;
use crate::model::{Component, Module, ResourceDocument, ResourceKind};
use crate::service::{ResourceService, Transition};

/// The served application: the router behind trailing-slash trimming.
pub type App = NormalizePath<Router>;

/// Builds the application. A kind passed as `None` has no routes.
pub fn app(
    modules: Option<Arc<ResourceService<Module>>>,
    components: Option<Arc<ResourceService<Component>>>,
    workers: WorkerClient,
) -> App {
    // Trimming has to happen before routing, so it wraps the router instead
    // of being one of its layers.
    NormalizePath::trim_trailing_slash(router(modules, components, workers))
}

fn router(
    modules: Option<Arc<ResourceService<Module>>>,
    components: Option<Arc<ResourceService<Component>>>,
    workers: WorkerClient,
) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/workers", get(busy_workers))
        .with_state(workers);

    if let Some(service) = modules {
        router = router.merge(kind_routes(service));
    }
    if let Some(service) = components {
        router = router.merge(kind_routes(service));
    }

    router.layer(middleware::from_fn(log_request))
}

fn kind_routes<K: ResourceKind>(service: Arc<ResourceService<K>>) -> Router {
    let collection = format!("/{}", K::COLLECTION);
    let item = format!("/{}/:id", K::COLLECTION);

    Router::new()
        .route(&collection, get(list::<K>).post(submit::<K>))
        .route(
            &item,
            get(fetch::<K>).patch(set_state::<K>).delete(remove::<K>),
        )
        .with_state(service)
}

async fn log_request(request: Request, next: Next) -> Response {
    debug!(method = %request.method(), path = %request.uri().path(), "request");
    next.run(request).await
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

#[derive(Serialize)]
struct BusyWorkerResponse {
    name: String,
    busy_for_ms: u64,
}

async fn busy_workers(
    State(workers): State<WorkerClient>,
) -> Result<Json<Vec<BusyWorkerResponse>>, ApiError> {
    let busy = workers.busy().await.map_err(ManagerError::from)?;
    Ok(Json(
        busy.into_iter()
            .map(|w| BusyWorkerResponse {
                name: w.name,
                busy_for_ms: u64::try_from(w.busy_for.as_millis()).unwrap_or(u64::MAX),
            })
            .collect(),
    ))
}

async fn list<K: ResourceKind>(
    State(service): State<Arc<ResourceService<K>>>,
) -> Result<Json<BTreeMap<String, ResourceDocument>>, ApiError> {
    Ok(Json(service.list().await?))
}

async fn submit<K: ResourceKind>(
    State(service): State<Arc<ResourceService<K>>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ResourceDocument>, ApiError> {
    let Json(definition) = body?;
    Ok(Json(service.submit(definition).await?))
}

async fn fetch<K: ResourceKind>(
    State(service): State<Arc<ResourceService<K>>>,
    Path(id): Path<String>,
) -> Result<Json<ResourceDocument>, ApiError> {
    Ok(Json(service.get(&id).await?))
}

async fn set_state<K: ResourceKind>(
    State(service): State<Arc<ResourceService<K>>>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(body) = body?;
    match service.set_state(&id, &body).await? {
        Transition::Started(_) => debug!(kind = K::NAME, id = %id, "workflow launched"),
        Transition::Unchanged => debug!(kind = K::NAME, id = %id, "already in requested state"),
    }
    Ok(StatusCode::OK)
}

async fn remove<K: ResourceKind>(
    State(service): State<Arc<ResourceService<K>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    service.remove(&id).await?;
    Ok(StatusCode::OK)
}

//! `GET /health/ping`, `GET /health/rate-limits` (spec.md §6).

use std::sync::Arc;

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use logoforge_blob_store::BlobStore;
use logoforge_bus::BusPublisher;
use logoforge_http_server::json::{json_response, Body};
use logoforge_http_server::PathParams;
use logoforge_meta_store::{ConceptStore, TaskChangeFeed};
use logoforge_rate_counter::RateCounter;
use logoforge_task_registry::TaskRegistry;
use serde_json::json;

use crate::auth::authenticated_user;
use crate::dto::{RateLimitEntry, RateLimitSnapshot};
use crate::error::ApiError;
use crate::services::Services;

pub async fn ping<RC, TR, CS, BS, BP, TCF>(
    _services: Arc<Services<RC, TR, CS, BS, BP, TCF>>,
    _req: Request<Incoming>,
    _params: PathParams,
) -> Response<Body>
where
    RC: RateCounter + 'static,
    TR: TaskRegistry + 'static,
    CS: ConceptStore + 'static,
    BS: BlobStore + 'static,
    BP: BusPublisher + 'static,
    TCF: TaskChangeFeed + 'static,
{
    json_response(StatusCode::OK, &json!({"status": "ok"}))
}

pub async fn rate_limits<RC, TR, CS, BS, BP, TCF>(
    services: Arc<Services<RC, TR, CS, BS, BP, TCF>>,
    req: Request<Incoming>,
    _params: PathParams,
) -> Response<Body>
where
    RC: RateCounter + 'static,
    TR: TaskRegistry + 'static,
    CS: ConceptStore + 'static,
    BS: BlobStore + 'static,
    BP: BusPublisher + 'static,
    TCF: TaskChangeFeed + 'static,
{
    match rate_limits_inner(services, req).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn rate_limits_inner<RC, TR, CS, BS, BP, TCF>(
    services: Arc<Services<RC, TR, CS, BS, BP, TCF>>,
    req: Request<Incoming>,
) -> Result<Response<Body>, ApiError>
where
    RC: RateCounter + 'static,
    TR: TaskRegistry + 'static,
    CS: ConceptStore + 'static,
    BS: BlobStore + 'static,
    BP: BusPublisher + 'static,
    TCF: TaskChangeFeed + 'static,
{
    let user_id = authenticated_user(&req)?;
    let snapshot = services.rate_counter.snapshot(user_id).await?;

    let response: RateLimitSnapshot =
        snapshot.into_iter().map(|(category, outcome)| (category.to_string(), RateLimitEntry::from(outcome))).collect();

    Ok(json_response(StatusCode::OK, &response))
}

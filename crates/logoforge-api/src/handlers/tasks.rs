//! `GET /tasks/{task_id}`, `POST /tasks/{task_id}/cancel`, `GET /tasks`
//! (spec.md §6).

use std::sync::Arc;

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use logoforge_blob_store::BlobStore;
use logoforge_bus::BusPublisher;
use logoforge_http_server::json::{empty_response, json_response, Body};
use logoforge_http_server::PathParams;
use logoforge_meta_store::{ConceptStore, TaskChangeFeed};
use logoforge_rate_counter::RateCounter;
use logoforge_task_registry::TaskRegistry;
use uuid::Uuid;

use crate::auth::authenticated_user;
use crate::dto::TaskResponse;
use crate::error::ApiError;
use crate::query::parse_task_list_query;
use crate::services::Services;

fn path_task_id(params: &PathParams) -> Result<Uuid, ApiError> {
    params.get("task_id").and_then(|id| Uuid::parse_str(id).ok()).ok_or(ApiError::NotFound)
}

pub async fn get_task<RC, TR, CS, BS, BP, TCF>(
    services: Arc<Services<RC, TR, CS, BS, BP, TCF>>,
    req: Request<Incoming>,
    params: PathParams,
) -> Response<Body>
where
    RC: RateCounter + 'static,
    TR: TaskRegistry + 'static,
    CS: ConceptStore + 'static,
    BS: BlobStore + 'static,
    BP: BusPublisher + 'static,
    TCF: TaskChangeFeed + 'static,
{
    match get_task_inner(services, req, params).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn get_task_inner<RC, TR, CS, BS, BP, TCF>(
    services: Arc<Services<RC, TR, CS, BS, BP, TCF>>,
    req: Request<Incoming>,
    params: PathParams,
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
    let task_id = path_task_id(&params)?;

    let task = services.status_channel.get_task(task_id).await?.ok_or(ApiError::NotFound)?;
    if task.user_id != user_id {
        return Err(ApiError::NotFound);
    }

    Ok(json_response(StatusCode::OK, &TaskResponse::from(task)))
}

pub async fn cancel_task<RC, TR, CS, BS, BP, TCF>(
    services: Arc<Services<RC, TR, CS, BS, BP, TCF>>,
    req: Request<Incoming>,
    params: PathParams,
) -> Response<Body>
where
    RC: RateCounter + 'static,
    TR: TaskRegistry + 'static,
    CS: ConceptStore + 'static,
    BS: BlobStore + 'static,
    BP: BusPublisher + 'static,
    TCF: TaskChangeFeed + 'static,
{
    match cancel_task_inner(services, req, params).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

/// Idempotent (spec.md §5): N cancels of the same `task_id` all observe
/// the same result — either the flag is already set, or this call sets it.
/// Ownership is checked before the registry write so a caller can't flip
/// `is_cancelled` on another user's task.
async fn cancel_task_inner<RC, TR, CS, BS, BP, TCF>(
    services: Arc<Services<RC, TR, CS, BS, BP, TCF>>,
    req: Request<Incoming>,
    params: PathParams,
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
    let task_id = path_task_id(&params)?;

    let existing = services.task_registry.get(task_id).await?.ok_or(ApiError::NotFound)?;
    if existing.user_id != user_id {
        return Err(ApiError::NotFound);
    }

    let task = services.task_registry.set_cancelled(task_id).await?;
    Ok(json_response(StatusCode::OK, &TaskResponse::from(task)))
}

pub async fn list_tasks<RC, TR, CS, BS, BP, TCF>(
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
    match list_tasks_inner(services, req).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn list_tasks_inner<RC, TR, CS, BS, BP, TCF>(
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
    let query = parse_task_list_query(req.uri().query());
    let limit = query.limit.unwrap_or(crate::dto::DEFAULT_LIST_LIMIT).clamp(1, crate::dto::MAX_LIST_LIMIT);

    let tasks = services.task_registry.list_for_user(user_id, query.status, query.task_type, limit).await?;
    let responses: Vec<TaskResponse> = tasks.into_iter().map(TaskResponse::from).collect();

    Ok(json_response(StatusCode::OK, &responses))
}

#[allow(dead_code)]
fn no_content() -> Response<Body> {
    empty_response(StatusCode::NO_CONTENT)
}

//! `POST /export/process` (spec.md §6, §4.8).

use std::sync::Arc;

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use logoforge_blob_store::BlobStore;
use logoforge_bus::BusPublisher;
use logoforge_domain::RateCategory;
use logoforge_http_server::json::{bytes_response, read_json_body, Body};
use logoforge_http_server::PathParams;
use logoforge_image_processor::{convert, thumbnail, TargetFormat};
use logoforge_meta_store::{ConceptStore, TaskChangeFeed};
use logoforge_rate_counter::RateCounter;
use logoforge_task_registry::TaskRegistry;

use crate::auth::authenticated_user;
use crate::dto::ExportRequestBody;
use crate::error::ApiError;
use crate::services::{attach_rate_limit_headers, Services};

pub async fn export_process<RC, TR, CS, BS, BP, TCF>(
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
    match export_process_inner(services, req).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn export_process_inner<RC, TR, CS, BS, BP, TCF>(
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
    let max_body_bytes = services.max_body_bytes;
    let body: ExportRequestBody =
        read_json_body(req, max_body_bytes).await.map_err(|err| ApiError::Validation(err.to_string()))?;

    let target_format = TargetFormat::parse(&body.target_format)?;
    let outcome = services.rate_counter.check_and_decrement(user_id, RateCategory::ExportAction, 1).await?;
    if !outcome.allowed {
        return Err(ApiError::RateLimited(outcome));
    }

    let source_bytes = services.blob_store.get(&body.image_identifier).await?;
    let working_bytes = match body.target_size {
        Some(max_dim) => thumbnail(&source_bytes, max_dim)?,
        None => source_bytes,
    };
    let converted = convert(&working_bytes, target_format)?;

    let mut response = bytes_response(StatusCode::OK, target_format.content_type(), converted);
    attach_rate_limit_headers(&mut response, &*services.rate_counter, user_id, RateCategory::ExportAction).await;
    Ok(response)
}

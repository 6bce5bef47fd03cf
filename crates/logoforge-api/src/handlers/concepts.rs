//! `POST /concepts/generate-with-palettes`, `POST /concepts/refine`,
//! `GET /concepts/list`, `GET /concepts/{id}` (spec.md §6).

use std::sync::Arc;

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use logoforge_blob_store::BlobStore;
use logoforge_bus::BusPublisher;
use logoforge_domain::RateCategory;
use logoforge_http_server::json::{json_response, read_json_body, Body};
use logoforge_http_server::PathParams;
use logoforge_meta_store::{ConceptStore, TaskChangeFeed};
use logoforge_rate_counter::RateCounter;
use logoforge_task_registry::TaskRegistry;

use crate::auth::authenticated_user;
use crate::dto::{ConceptDetail, ConceptSummary, GenerateRequestBody, RefineRequestBody, TaskResponse, VariationDto, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crate::error::ApiError;
use crate::query::parse_limit;
use crate::services::{attach_rate_limit_headers, Services};

pub async fn generate<RC, TR, CS, BS, BP, TCF>(
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
    match generate_inner(services, req).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn generate_inner<RC, TR, CS, BS, BP, TCF>(
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
    let body: GenerateRequestBody =
        read_json_body(req, max_body_bytes).await.map_err(|err| ApiError::Validation(err.to_string()))?;

    let task = services.dispatcher.enqueue_generate(user_id, body.into()).await?;
    let mut response = json_response(StatusCode::ACCEPTED, &TaskResponse::from(task));
    attach_rate_limit_headers(&mut response, &*services.rate_counter, user_id, RateCategory::GenerateConcept).await;
    Ok(response)
}

pub async fn refine<RC, TR, CS, BS, BP, TCF>(
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
    match refine_inner(services, req).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn refine_inner<RC, TR, CS, BS, BP, TCF>(
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
    let body: RefineRequestBody =
        read_json_body(req, max_body_bytes).await.map_err(|err| ApiError::Validation(err.to_string()))?;

    let task = services.dispatcher.enqueue_refine(user_id, body.into()).await?;
    let mut response = json_response(StatusCode::ACCEPTED, &TaskResponse::from(task));
    attach_rate_limit_headers(&mut response, &*services.rate_counter, user_id, RateCategory::RefineConcept).await;
    Ok(response)
}

pub async fn list_concepts<RC, TR, CS, BS, BP, TCF>(
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
    match list_concepts_inner(services, req).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn list_concepts_inner<RC, TR, CS, BS, BP, TCF>(
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
    let limit = parse_limit(req.uri().query(), DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);

    let concepts = services.concept_store.list_concepts_for_user(user_id, limit).await?;
    let summaries: Vec<ConceptSummary> = concepts.iter().map(ConceptSummary::from).collect();

    let mut response = json_response(StatusCode::OK, &summaries);
    attach_rate_limit_headers(&mut response, &*services.rate_counter, user_id, RateCategory::GetConcepts).await;
    Ok(response)
}

pub async fn get_concept<RC, TR, CS, BS, BP, TCF>(
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
    match get_concept_inner(services, req, params).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn get_concept_inner<RC, TR, CS, BS, BP, TCF>(
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
    let concept_id = params.get("id").and_then(|id| uuid::Uuid::parse_str(id).ok()).ok_or(ApiError::NotFound)?;

    let concept = services.concept_store.get_concept(concept_id).await?.ok_or(ApiError::NotFound)?;
    if concept.user_id != user_id {
        return Err(ApiError::NotFound);
    }

    let base_image_url = signed_url_or_fallback(&*services.blob_store, &concept.base_image_path, services.signed_url_ttl).await;
    let mut variations = Vec::with_capacity(concept.variations.len());
    for variation in &concept.variations {
        let image_url = signed_url_or_fallback(&*services.blob_store, &variation.image_path, services.signed_url_ttl).await;
        variations.push(VariationDto::new(variation, image_url));
    }

    let detail = ConceptDetail {
        concept_id: concept.concept_id,
        logo_description: concept.logo_description,
        theme_description: concept.theme_description,
        created_at: concept.created_at,
        base_image_url,
        variations,
    };

    Ok(json_response(StatusCode::OK, &detail))
}

/// spec.md §4.3: a signing failure is non-fatal; the caller falls back to
/// the raw path and lets a later request re-sign.
async fn signed_url_or_fallback<BS: BlobStore>(blob_store: &BS, path: &str, ttl: std::time::Duration) -> String {
    match blob_store.signed_url(path, ttl).await {
        Ok(url) => url,
        Err(err) => {
            tracing::warn!(error = %err, path, "failed to sign blob url; falling back to raw path");
            path.to_string()
        }
    }
}

//! Registers every endpoint in spec.md §6's table onto a `Router`, each
//! closing over a clone of the shared `Services` value.

use std::sync::Arc;

use hyper::Method;
use logoforge_blob_store::BlobStore;
use logoforge_bus::BusPublisher;
use logoforge_http_server::Router;
use logoforge_meta_store::{ConceptStore, TaskChangeFeed};
use logoforge_rate_counter::RateCounter;
use logoforge_task_registry::TaskRegistry;

use crate::handlers::{concepts, export, health, tasks};
use crate::services::Services;

/// Every path is registered under the `/api` prefix (spec.md §6: "HTTP API
/// (JSON, prefix `/api`)").
pub fn build_router<RC, TR, CS, BS, BP, TCF>(services: Arc<Services<RC, TR, CS, BS, BP, TCF>>) -> Router
where
    RC: RateCounter + 'static,
    TR: TaskRegistry + 'static,
    CS: ConceptStore + 'static,
    BS: BlobStore + 'static,
    BP: BusPublisher + 'static,
    TCF: TaskChangeFeed + 'static,
{
    let s = services;

    Router::new()
        .route(Method::POST, "/api/concepts/generate-with-palettes", {
            let s = s.clone();
            move |req, params| concepts::generate(s.clone(), req, params)
        })
        .route(Method::POST, "/api/concepts/refine", {
            let s = s.clone();
            move |req, params| concepts::refine(s.clone(), req, params)
        })
        .route(Method::GET, "/api/concepts/list", {
            let s = s.clone();
            move |req, params| concepts::list_concepts(s.clone(), req, params)
        })
        .route(Method::GET, "/api/concepts/{id}", {
            let s = s.clone();
            move |req, params| concepts::get_concept(s.clone(), req, params)
        })
        .route(Method::GET, "/api/tasks/{task_id}", {
            let s = s.clone();
            move |req, params| tasks::get_task(s.clone(), req, params)
        })
        .route(Method::POST, "/api/tasks/{task_id}/cancel", {
            let s = s.clone();
            move |req, params| tasks::cancel_task(s.clone(), req, params)
        })
        .route(Method::GET, "/api/tasks", {
            let s = s.clone();
            move |req, params| tasks::list_tasks(s.clone(), req, params)
        })
        .route(Method::POST, "/api/export/process", {
            let s = s.clone();
            move |req, params| export::export_process(s.clone(), req, params)
        })
        .route(Method::GET, "/api/health/rate-limits", {
            let s = s.clone();
            move |req, params| health::rate_limits(s.clone(), req, params)
        })
        .route(Method::GET, "/api/health/ping", move |req, params| health::ping(s.clone(), req, params))
}

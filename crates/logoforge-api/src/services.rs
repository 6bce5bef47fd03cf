//! The process-wide `Services` value every handler closes over (spec.md §9
//! design note: "plain HTTP router with explicit handler functions closing
//! over a constructed `Services` struct; DI becomes constructor wiring at
//! process start"). Generic over every gateway's backend type so a single
//! binary can be built against any feature-selected combination without
//! runtime type sniffing — mirrors `logoforge-worker`'s `WorkerLoop<R, C,
//! B, P, Q>` shape.

use std::sync::Arc;
use std::time::Duration;

use logoforge_blob_store::BlobStore;
use logoforge_bus::BusPublisher;
use logoforge_dispatcher::Dispatcher;
use logoforge_meta_store::{ConceptStore, TaskChangeFeed};
use logoforge_rate_counter::RateCounter;
use logoforge_status_channel::StatusChannel;
use logoforge_task_registry::TaskRegistry;

pub struct Services<RC, TR, CS, BS, BP, TCF>
where
    RC: RateCounter,
    TR: TaskRegistry,
    CS: ConceptStore,
    BS: BlobStore,
    BP: BusPublisher,
    TCF: TaskChangeFeed + 'static,
{
    pub dispatcher: Dispatcher<RC, TR, BP>,
    pub task_registry: Arc<TR>,
    pub concept_store: Arc<CS>,
    pub blob_store: Arc<BS>,
    pub rate_counter: Arc<RC>,
    pub status_channel: StatusChannel<TCF, TR>,
    /// Display-layer TTL for signed URLs (spec.md §4.3: "must be valid for
    /// at least 24h").
    pub signed_url_ttl: Duration,
    /// Bound on JSON request bodies (spec.md §4.6 validation: a 500-char
    /// description rejects long before this, but the body-read step needs
    /// its own ceiling against a hostile/buggy client).
    pub max_body_bytes: usize,
}

impl<RC, TR, CS, BS, BP, TCF> Services<RC, TR, CS, BS, BP, TCF>
where
    RC: RateCounter + 'static,
    TR: TaskRegistry + 'static,
    CS: ConceptStore + 'static,
    BS: BlobStore + 'static,
    BP: BusPublisher + 'static,
    TCF: TaskChangeFeed + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rate_counter: Arc<RC>,
        task_registry: Arc<TR>,
        concept_store: Arc<CS>,
        blob_store: Arc<BS>,
        bus: Arc<BP>,
        task_change_feed: Arc<TCF>,
        num_palettes_default: u8,
    ) -> Self {
        let dispatcher = Dispatcher::new(rate_counter.clone(), task_registry.clone(), bus, num_palettes_default);
        let status_channel = StatusChannel::new(task_change_feed, task_registry.clone());
        Self {
            dispatcher,
            task_registry,
            concept_store,
            blob_store,
            rate_counter,
            status_channel,
            signed_url_ttl: logoforge_blob_store::MIN_SIGNED_URL_TTL,
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Single post-processing step that attaches `X-RateLimit-*` headers from
/// the `RateCounter` snapshot taken during the request (spec.md §9 Open
/// Question resolution — one response-building helper, not per-route
/// middleware). Best-effort: a snapshot failure logs a warning and leaves
/// the response unmodified rather than failing the whole request over an
/// observability header.
pub async fn attach_rate_limit_headers<RC: RateCounter>(
    response: &mut hyper::Response<logoforge_http_server::json::Body>,
    rate_counter: &RC,
    user_id: uuid::Uuid,
    category: logoforge_domain::RateCategory,
) {
    let snapshot = match rate_counter.snapshot(user_id).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            tracing::warn!(error = %err, %user_id, "rate limit snapshot failed; omitting X-RateLimit headers");
            return;
        }
    };
    let Some(outcome) = snapshot.get(&category) else { return };
    let headers = response.headers_mut();
    if let Ok(value) = hyper::header::HeaderValue::from_str(&outcome.limit.to_string()) {
        headers.insert("X-RateLimit-Limit", value);
    }
    if let Ok(value) = hyper::header::HeaderValue::from_str(&outcome.remaining.to_string()) {
        headers.insert("X-RateLimit-Remaining", value);
    }
    if let Ok(value) = hyper::header::HeaderValue::from_str(&outcome.reset_after_seconds.to_string()) {
        headers.insert("X-RateLimit-Reset", value);
    }
}

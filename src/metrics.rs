use std::sync::Arc;

use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

// ---------------------------------------------------------------------------
// Label types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    pub endpoint: Endpoint,
    pub status: StatusClass,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Endpoint {
    InfoRefs,
    UploadPack,
    ReceivePack,
    Other,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum StatusClass {
    Success,
    ClientError,
    ServerError,
}

impl StatusClass {
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=399 => StatusClass::Success,
            400..=499 => StatusClass::ClientError,
            _ => StatusClass::ServerError,
        }
    }
}

// ---------------------------------------------------------------------------
// Metrics struct
// ---------------------------------------------------------------------------

/// Every Prometheus metric exposed by the proxy.
pub struct Metrics {
    pub requests_total: Family<RequestLabels, Counter>,
    pub ls_refs_proxied_total: Counter,
    pub upstream_fetch_total: Counter,
    pub upstream_fetch_errors_total: Counter,
    pub local_serve_total: Counter,
    pub mirrors_registered: Gauge,
}

impl Metrics {
    /// Create a new [`Metrics`] instance and register every metric with the
    /// supplied `registry`.
    pub fn new(registry: &mut Registry) -> Self {
        let requests_total = Family::<RequestLabels, Counter>::default();
        registry.register(
            "mirrorcache_requests_total",
            "Served HTTP requests by endpoint and status class",
            requests_total.clone(),
        );

        let ls_refs_proxied_total = Counter::default();
        registry.register(
            "mirrorcache_ls_refs_proxied_total",
            "ls-refs commands proxied to the upstream",
            ls_refs_proxied_total.clone(),
        );

        let upstream_fetch_total = Counter::default();
        registry.register(
            "mirrorcache_upstream_fetch_total",
            "Upstream fetches launched",
            upstream_fetch_total.clone(),
        );

        let upstream_fetch_errors_total = Counter::default();
        registry.register(
            "mirrorcache_upstream_fetch_errors_total",
            "Upstream fetches that terminated with an error",
            upstream_fetch_errors_total.clone(),
        );

        let local_serve_total = Counter::default();
        registry.register(
            "mirrorcache_local_serve_total",
            "fetch commands served from the local mirror",
            local_serve_total.clone(),
        );

        let mirrors_registered: Gauge = Gauge::default();
        registry.register(
            "mirrorcache_mirrors_registered",
            "Mirrors currently present in the in-memory registry",
            mirrors_registered.clone(),
        );

        Self {
            requests_total,
            ls_refs_proxied_total,
            upstream_fetch_total,
            upstream_fetch_errors_total,
            local_serve_total,
            mirrors_registered,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared handle
// ---------------------------------------------------------------------------

/// Thread-safe wrapper for the metrics registry, used in `AppState`.
#[derive(Clone)]
pub struct MetricsRegistry {
    pub registry: Arc<Registry>,
    pub metrics: Arc<Metrics>,
}

impl MetricsRegistry {
    /// Build a fresh registry and pre-register all proxy metrics.
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let metrics = Metrics::new(&mut registry);
        Self {
            registry: Arc::new(registry),
            metrics: Arc::new(metrics),
        }
    }
}

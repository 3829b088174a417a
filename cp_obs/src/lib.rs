//! ABOUTME: Observability service exposing pool metrics over HTTP
//! ABOUTME: Provides health, readiness and Prometheus scrape endpoints

use actix_web::{
    dev::{ServiceRequest, ServiceResponse},
    middleware::Logger,
    web, App, HttpResponse, HttpServer, Result as ActixResult,
};
use cp_collector::{PoolCollector, StatProvider};
use cp_core::{Error, Result};
use prometheus_client::{
    encoding::text::encode,
    metrics::{counter::Counter, histogram::Histogram},
    registry::Registry,
};
use serde_json::json;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::Instant;

/// Content type of the OpenMetrics text format
pub const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Readiness gate that can be toggled to indicate service readiness
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    ready: Arc<AtomicBool>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Relaxed);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Prometheus registry holding pool collectors and exporter self-metrics
#[derive(Debug)]
pub struct Metrics {
    registry: Arc<Mutex<Registry>>,
    scrapes_total: Counter,
    scrape_duration_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let scrapes_total = Counter::default();
        registry.register(
            "exporter_scrapes",
            "Total number of metric scrapes served",
            scrapes_total.clone(),
        );

        let scrape_duration_seconds =
            Histogram::new([0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0].into_iter());
        registry.register(
            "exporter_scrape_duration_seconds",
            "Time spent encoding a scrape in seconds",
            scrape_duration_seconds.clone(),
        );

        Self {
            registry: Arc::new(Mutex::new(registry)),
            scrapes_total,
            scrape_duration_seconds,
        }
    }

    /// Register a pool collector; it is sampled on every scrape
    pub fn register_pool<P>(&self, collector: PoolCollector<P>) -> Result<()>
    where
        P: StatProvider + 'static,
    {
        let mut registry = self.registry.lock().map_err(|e| {
            Error::Registry(format!("Failed to lock metrics registry: {}", e))
        })?;

        tracing::info!(
            metrics = collector.describe().len(),
            "Registering pool collector"
        );
        registry.register_collector(Box::new(collector));

        Ok(())
    }

    /// Render every registered metric as OpenMetrics text
    pub fn encode(&self) -> Result<String> {
        let started = Instant::now();
        self.scrapes_total.inc();

        let registry = self.registry.lock().map_err(|e| {
            Error::Registry(format!("Failed to lock metrics registry: {}", e))
        })?;

        let mut buffer = String::new();
        encode(&mut buffer, &registry)
            .map_err(|e| Error::Encoding(format!("Failed to encode metrics: {}", e)))?;

        self.scrape_duration_seconds
            .observe(started.elapsed().as_secs_f64());

        Ok(buffer)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state for observability endpoints
#[derive(Debug, Clone)]
pub struct ObsState {
    pub readiness: ReadinessGate,
    pub metrics: Arc<Metrics>,
}

impl ObsState {
    pub fn new() -> Self {
        Self {
            readiness: ReadinessGate::new(),
            metrics: Arc::new(Metrics::new()),
        }
    }
}

impl Default for ObsState {
    fn default() -> Self {
        Self::new()
    }
}

/// Health endpoint handler
async fn health() -> ActixResult<HttpResponse> {
    tracing::debug!("Health check requested");
    Ok(HttpResponse::Ok().json(json!({
        "status": "ok"
    })))
}

/// Readiness endpoint handler
async fn readiness(state: web::Data<ObsState>) -> ActixResult<HttpResponse> {
    let is_ready = state.readiness.is_ready();
    tracing::debug!("Readiness check requested, ready: {}", is_ready);

    if is_ready {
        Ok(HttpResponse::Ok().json(json!({
            "status": "ready"
        })))
    } else {
        Ok(HttpResponse::ServiceUnavailable().json(json!({
            "status": "not ready"
        })))
    }
}

/// Metrics endpoint handler
async fn metrics(state: web::Data<ObsState>) -> ActixResult<HttpResponse> {
    tracing::debug!("Metrics scrape requested");

    // Collectors may block on pool locks, keep them off the reactor
    let registry = state.metrics.clone();
    let encoded = web::block(move || registry.encode()).await?;

    match encoded {
        Ok(metrics_text) => {
            tracing::debug!("Metrics encoded successfully, {} bytes", metrics_text.len());
            Ok(HttpResponse::Ok()
                .content_type(OPENMETRICS_CONTENT_TYPE)
                .body(metrics_text))
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            Ok(HttpResponse::InternalServerError().json(json!({
                "error": "Failed to encode metrics"
            })))
        }
    }
}

/// Create observability service factory
pub fn create_service(
    state: ObsState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .wrap(Logger::default())
        .service(
            web::scope("")
                .route("/healthz", web::get().to(health))
                .route("/readyz", web::get().to(readiness))
                .route("/metrics", web::get().to(metrics)),
        )
}

/// Start observability server
pub async fn start_server(bind_addr: &str, state: ObsState) -> Result<()> {
    tracing::info!("Starting observability server on {}", bind_addr);

    HttpServer::new(move || create_service(state.clone()))
        .bind(bind_addr)
        .map_err(|e| Error::Config(format!("Failed to bind server: {}", e)))?
        .run()
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;
    use cp_collector::LabelSet;
    use test_support::{example_snapshot, FailingProvider, FixedProvider};

    #[tokio::test]
    async fn test_health_endpoint() {
        let state = ObsState::new();
        let app = test::init_service(create_service(state)).await;

        let req = test::TestRequest::get().uri("/healthz").to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "application/json"
        );

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_readiness_endpoint_ready() {
        let state = ObsState::new();
        state.readiness.set_ready(true);

        let app = test::init_service(create_service(state)).await;

        let req = test::TestRequest::get().uri("/readyz").to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn test_readiness_endpoint_not_ready() {
        let state = ObsState::new();
        state.readiness.set_ready(false);

        let app = test::init_service(create_service(state)).await;

        let req = test::TestRequest::get().uri("/readyz").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 503);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "not ready");
    }

    #[tokio::test]
    async fn test_metrics_endpoint_serves_pool_metrics() {
        let state = ObsState::new();
        state
            .metrics
            .register_pool(PoolCollector::new(
                FixedProvider::new(example_snapshot()),
                LabelSet::new().with("host", "example.com"),
            ))
            .unwrap();

        let app = test::init_service(create_service(state)).await;

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            OPENMETRICS_CONTENT_TYPE
        );

        let body = test::read_body(resp).await;
        let body_str = std::str::from_utf8(&body).unwrap();

        assert!(body_str.contains("ch_pool_idle_connections{host=\"example.com\"} 24"));
        assert!(body_str.contains("ch_pool_acquires_total{host=\"example.com\"} 4"));
        assert!(body_str.contains("exporter_scrapes_total"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint_provider_failure() {
        let state = ObsState::new();
        state
            .metrics
            .register_pool(PoolCollector::new(
                FailingProvider::new("pool closed"),
                LabelSet::new(),
            ))
            .unwrap();

        let app = test::init_service(create_service(state)).await;

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 500);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Failed to encode metrics");
    }

    #[tokio::test]
    async fn test_readiness_gate_toggle() {
        let gate = ReadinessGate::new();
        assert!(gate.is_ready());

        gate.set_ready(false);
        assert!(!gate.is_ready());

        gate.set_ready(true);
        assert!(gate.is_ready());
    }

    #[tokio::test]
    async fn test_poisoned_registry_reports_registry_error() {
        let metrics = Arc::new(Metrics::new());

        let poisoner = metrics.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.registry.lock().unwrap();
            panic!("poison the registry lock");
        })
        .join();

        let result = metrics.register_pool(PoolCollector::new(
            FixedProvider::new(example_snapshot()),
            LabelSet::new(),
        ));
        assert!(matches!(result, Err(Error::Registry(_))));
        assert!(matches!(metrics.encode(), Err(Error::Registry(_))));
    }

    #[tokio::test]
    async fn test_encode_counts_scrapes() {
        let metrics = Metrics::new();

        metrics.encode().expect("Should encode successfully");
        let encoded = metrics.encode().expect("Should encode successfully");

        // The counter is bumped before rendering, so the second scrape sees 2
        assert!(encoded.contains("exporter_scrapes_total 2"));
        assert!(encoded.contains("exporter_scrape_duration_seconds"));
    }
}

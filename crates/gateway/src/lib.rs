//! HTTP gateway for OpsWeave.
//!
//! Exposes the read-only query surface over the orchestrator's state and
//! the `/ws` push channel that streams snapshots to dashboards.
//!
//! Built on Axum.

pub mod api;
pub mod ws;

use axum::{Router, http::HeaderValue, response::Json, routing::get};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use opsweave_config::AppConfig;
use opsweave_engine::{Orchestrator, Runtime, StateStore, SubscriberRegistry};

/// Everything a handler can reach.
pub struct AppState {
    pub orchestrator: Arc<dyn Orchestrator>,
    pub registry: Arc<SubscriberRegistry>,
    /// True while the cycle scheduler loop runs
    pub running: Arc<AtomicBool>,
}

impl AppState {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

pub type SharedState = Arc<AppState>;

/// Build the router with every gateway route.
pub fn build_router(state: SharedState, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([axum::http::Method::GET])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api::router())
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Generate the dataset, start the scheduler and broadcaster, and serve
/// until `shutdown` resolves. Both loops are stopped before returning.
pub async fn start(
    config: AppConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    // Without a data context there is nothing to schedule.
    let data = opsweave_dataset::generate(&config.dataset)?;
    info!(
        clients = data.clients.len(),
        servers = data.servers.len(),
        incidents = data.incidents.len(),
        at_risk = data.at_risk_servers(config.simulation.risk_threshold).len(),
        "Dataset generated"
    );
    let store = Arc::new(StateStore::new(Arc::new(data)));

    let client = if config.has_api_key() {
        Some(opsweave_providers::build_client(&config.inference)?)
    } else {
        None
    };
    let orchestrator = opsweave_engine::from_config(&config, store, client);
    let registry = Arc::new(SubscriberRegistry::new(config.broadcast.subscriber_buffer));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let runtime = Runtime::start(
        orchestrator.clone(),
        registry.clone(),
        &config.scheduler,
        &config.broadcast,
    );
    let state = Arc::new(AppState {
        orchestrator: orchestrator.clone(),
        registry,
        running: runtime.running_flag(),
    });
    let app = build_router(state, &config.gateway.allowed_origins);

    info!(addr = %addr, mode = %orchestrator.mode(), "Gateway listening");
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    runtime.shutdown().await;
    info!("Gateway stopped");
    served?;
    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use opsweave_core::{DataContext, Server, ServerMetrics};
    use opsweave_engine::SimulatedOrchestrator;

    fn server(id: &str, cpu: f64) -> Server {
        Server {
            server_id: id.into(),
            client_id: "CLT-1".into(),
            hostname: format!("{id}-host"),
            server_type: "DB-PROD".into(),
            os: "Ubuntu 22.04".into(),
            current_metrics: ServerMetrics {
                cpu_percent: cpu,
                memory_percent: 40.0,
                disk_usage_percent: 50.0,
                network_mbps: 80.0,
                uptime_days: 12,
            },
            risk_score: 60,
            criticality: "critical".into(),
        }
    }

    pub fn state() -> SharedState {
        let data = DataContext {
            servers: vec![server("SRV-1", 95.0), server("SRV-2", 20.0)],
            ..Default::default()
        };
        let store = Arc::new(StateStore::new(Arc::new(data)));
        let orchestrator = Arc::new(SimulatedOrchestrator::new(store, &AppConfig::default()));
        Arc::new(AppState {
            orchestrator,
            registry: Arc::new(SubscriberRegistry::new(4)),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn app(state: SharedState) -> Router {
        build_router(state, &["http://localhost:5000".to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_endpoint() {
        let app = testing::app(testing::state());

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let app = testing::app(testing::state());
        let req = Request::builder()
            .uri("/health")
            .header("Origin", "http://localhost:5000")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:5000"
        );
    }
}

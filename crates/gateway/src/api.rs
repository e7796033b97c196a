//! Read-only query API over the orchestrator's state.
//!
//! Endpoints:
//!
//! - `GET /api/status`            — mode, scheduler state, agent and subscriber counts
//! - `GET /api/agents`            — all agent states
//! - `GET /api/agents/{id}`       — one agent
//! - `GET /api/decisions`         — recent decisions (`?limit=`, default 20)
//! - `GET /api/decisions/{id}`    — one decision
//! - `GET /api/predictions`       — recent predictions (`?limit=`, default 10)
//! - `GET /api/metrics`           — the metrics snapshot
//! - `GET /api/activity`          — activity feed (`?limit=`, default 50)
//! - `GET /api/assignments`       — technician assignments (`?limit=`, default 20)
//! - `GET /api/cycles/last`       — report of the most recent cycle

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use serde::{Deserialize, Serialize};

use opsweave_core::{ActivityLogEntry, AgentState, Assignment, Decision, MetricsSnapshot, Prediction};
use opsweave_engine::{CycleReport, MAX_QUERY_LIMIT, Mode};

use crate::SharedState;

const DEFAULT_DECISIONS: usize = 20;
const DEFAULT_PREDICTIONS: usize = 10;
const DEFAULT_ACTIVITY: usize = 50;
const DEFAULT_ASSIGNMENTS: usize = 20;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/status", get(status_handler))
        .route("/agents", get(list_agents_handler))
        .route("/agents/{id}", get(get_agent_handler))
        .route("/decisions", get(list_decisions_handler))
        .route("/decisions/{id}", get(get_decision_handler))
        .route("/predictions", get(list_predictions_handler))
        .route("/metrics", get(metrics_handler))
        .route("/activity", get(activity_handler))
        .route("/assignments", get(list_assignments_handler))
        .route("/cycles/last", get(last_cycle_handler))
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    fn resolve(&self, default: usize) -> usize {
        self.limit.unwrap_or(default).min(MAX_QUERY_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn not_found(what: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: format!("{what} '{id}' not found"),
        }),
    )
}

// ── Status ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct StatusResponse {
    mode: Mode,
    running: bool,
    agents: usize,
    active_agents: usize,
    subscribers: usize,
    cycle_interval_secs: u64,
}

async fn status_handler(State(state): State<SharedState>) -> Json<StatusResponse> {
    let orchestrator = &state.orchestrator;
    Json(StatusResponse {
        mode: orchestrator.mode(),
        running: state.is_running(),
        agents: orchestrator.agent_statuses().len(),
        active_agents: orchestrator.store().active_agent_count(),
        subscribers: state.registry.len(),
        cycle_interval_secs: orchestrator.cycle_interval().as_secs(),
    })
}

// ── Agents ────────────────────────────────────────────────────────────────

async fn list_agents_handler(State(state): State<SharedState>) -> Json<Vec<AgentState>> {
    Json(state.orchestrator.agent_statuses())
}

async fn get_agent_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<AgentState>, ApiError> {
    state
        .orchestrator
        .agent(&id)
        .map(Json)
        .ok_or_else(|| not_found("Agent", &id))
}

// ── Decisions & predictions ───────────────────────────────────────────────

async fn list_decisions_handler(
    State(state): State<SharedState>,
    Query(q): Query<LimitQuery>,
) -> Json<Vec<Decision>> {
    Json(state.orchestrator.recent_decisions(q.resolve(DEFAULT_DECISIONS)))
}

async fn get_decision_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Decision>, ApiError> {
    state
        .orchestrator
        .decision(&id)
        .map(Json)
        .ok_or_else(|| not_found("Decision", &id))
}

async fn list_predictions_handler(
    State(state): State<SharedState>,
    Query(q): Query<LimitQuery>,
) -> Json<Vec<Prediction>> {
    Json(state.orchestrator.predictions(q.resolve(DEFAULT_PREDICTIONS)))
}

// ── Metrics, activity, assignments ────────────────────────────────────────

async fn metrics_handler(State(state): State<SharedState>) -> Json<MetricsSnapshot> {
    Json(state.orchestrator.metrics())
}

#[derive(Debug, Serialize)]
struct ActivityResponse {
    activities: Vec<ActivityLogEntry>,
    total_count: usize,
}

async fn activity_handler(
    State(state): State<SharedState>,
    Query(q): Query<LimitQuery>,
) -> Json<ActivityResponse> {
    Json(ActivityResponse {
        activities: state.orchestrator.activity(q.resolve(DEFAULT_ACTIVITY)),
        total_count: state.orchestrator.activity_total(),
    })
}

async fn list_assignments_handler(
    State(state): State<SharedState>,
    Query(q): Query<LimitQuery>,
) -> Json<Vec<Assignment>> {
    Json(state.orchestrator.assignments(q.resolve(DEFAULT_ASSIGNMENTS)))
}

async fn last_cycle_handler(State(state): State<SharedState>) -> Result<Json<CycleReport>, ApiError> {
    state.orchestrator.last_cycle().map(Json).ok_or((
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "No cycle has run yet".into(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn get_json(state: SharedState, uri: &str) -> (StatusCode, serde_json::Value) {
        let app = testing::app(state);
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn status_reports_mode_and_counts() {
        let (status, json) = get_json(testing::state(), "/api/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["mode"], "simulated");
        assert_eq!(json["running"], true);
        assert_eq!(json["agents"], 8);
        assert_eq!(json["subscribers"], 0);
    }

    #[tokio::test]
    async fn agent_by_id_and_unknown_id() {
        let state = testing::state();
        let (status, json) = get_json(state.clone(), "/api/agents/agent-decision-001").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["name"], "Autonomous Decision");

        let (status, json) = get_json(state, "/api/agents/agent-nope-001").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().contains("agent-nope-001"));
    }

    #[tokio::test]
    async fn predictions_respect_limit() {
        let (_, json) = get_json(testing::state(), "/api/predictions?limit=2").await;
        assert_eq!(json.as_array().unwrap().len(), 2);
        let (_, json) = get_json(testing::state(), "/api/predictions").await;
        assert_eq!(json.as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn activity_reports_total_count() {
        let state = testing::state();
        state.orchestrator.run_cycle().await;
        let (status, json) = get_json(state.clone(), "/api/activity?limit=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["activities"].as_array().unwrap().len(), 1);
        assert_eq!(json["total_count"], state.orchestrator.activity_total());
        assert!(json["total_count"].as_u64().unwrap() >= 2);
    }

    #[tokio::test]
    async fn decisions_and_last_cycle() {
        let state = testing::state();
        let (status, _) = get_json(state.clone(), "/api/cycles/last").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        state.orchestrator.run_cycle().await;
        let (status, json) = get_json(state.clone(), "/api/cycles/last").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["cycle_id"], "CYCLE-00001");

        let (status, json) = get_json(state.clone(), "/api/decisions").await;
        assert_eq!(status, StatusCode::OK);
        let decisions = json.as_array().unwrap();
        if let Some(first) = decisions.first() {
            let id = first["id"].as_str().unwrap();
            let (status, _) = get_json(state.clone(), &format!("/api/decisions/{id}")).await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, _) = get_json(state, "/api/decisions/DEC-99999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_are_stable_between_cycles() {
        let state = testing::state();
        let (_, first) = get_json(state.clone(), "/api/metrics").await;
        let (_, second) = get_json(state, "/api/metrics").await;
        assert_eq!(first, second);
        assert_eq!(first["servers_monitored"], 2);
    }
}

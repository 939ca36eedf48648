//! REST API handlers for a fleet node
//!
//! Every node serves the same router. Leader-only routes answer 503 while
//! this node is not leading, which tells the caller to rediscover the
//! leader.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::metrics;

use super::registry::{RegisterOutcome, RegisterRequest};
use super::server::AppState;

// ============================================================================
// API Response Types
// ============================================================================

/// Simple error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
        }
    }
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

fn not_leading() -> Response {
    error(StatusCode::SERVICE_UNAVAILABLE, "This node is not the leader")
}

/// Registration accepted
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub name: String,
    pub outcome: String,
}

/// Local LED state
#[derive(Debug, Serialize, Deserialize)]
pub struct LedResponse {
    pub on: bool,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub node: String,
    pub registered: bool,
    pub leading: bool,
    pub version: String,
    pub uptime_secs: u64,
}

/// Body of `PUT /leader`
#[derive(Debug, Deserialize)]
pub struct LeaderUpdate {
    pub name: Option<String>,
    pub url: Option<String>,
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Follower endpoints
        .route(
            "/endpoint/led",
            get(get_led).post(led_on).delete(led_off),
        )
        // Leader endpoints
        .route("/leader/register", post(register_host))
        .route("/leader/stats", get(get_stats))
        .route("/leader", get(get_leader).put(put_leader))
        // Health and metrics
        .route("/healthz", get(health_check))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

// ============================================================================
// Follower Handlers
// ============================================================================

async fn set_led(state: &AppState, on: bool, status: StatusCode) -> Response {
    match state.actuator.set(on).await {
        Ok(()) => {
            metrics::set_led_state(on);
            status.into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, actuator = state.actuator.name(), "Failed to switch LED");
            error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Turn the LED on
async fn led_on(State(state): State<AppState>) -> Response {
    set_led(&state, true, StatusCode::CREATED).await
}

/// Turn the LED off
async fn led_off(State(state): State<AppState>) -> Response {
    set_led(&state, false, StatusCode::NO_CONTENT).await
}

async fn get_led(State(state): State<AppState>) -> impl IntoResponse {
    Json(LedResponse {
        on: state.actuator.is_on(),
    })
}

// ============================================================================
// Leader Handlers
// ============================================================================

/// Join or heartbeat
async fn register_host(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Response {
    if !state.registry.is_leading().await {
        return not_leading();
    }

    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            metrics::record_registration("rejected");
            return error(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let (name, url) = match request.resolve() {
        Ok(resolved) => resolved,
        Err(e) => {
            metrics::record_registration("rejected");
            return error(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    match state.registry.register(&name, &url).await {
        Ok(outcome) => {
            metrics::record_registration(outcome.as_str());
            if outcome != RegisterOutcome::Refreshed {
                metrics::update_registry(&state.registry.summary().await);
            }
            (
                StatusCode::CREATED,
                Json(RegisterResponse {
                    name,
                    outcome: outcome.as_str().to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            metrics::record_registration("rejected");
            error(StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}

/// Per-host stats, sorted by name
async fn get_stats(State(state): State<AppState>) -> Response {
    if !state.registry.is_leading().await {
        return not_leading();
    }

    Json(state.registry.stats().await).into_response()
}

async fn get_leader(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.tracker.current().await)
}

/// Leader callback delivered over HTTP
async fn put_leader(
    State(state): State<AppState>,
    body: Result<Json<LeaderUpdate>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(update)) => {
            state.tracker.on_new_leader(update.name, update.url).await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(rejection) => error(StatusCode::BAD_REQUEST, rejection.body_text()),
    }
}

// ============================================================================
// Health Handlers
// ============================================================================

/// 200 while registered with the current leader, 503 otherwise
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let registered = state.registerer.is_registered();
    let status = if registered {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if registered { "healthy" } else { "unregistered" }.to_string(),
            node: state.registry.local_name().to_string(),
            registered,
            leading: state.registry.is_leading().await,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: state.start_time.elapsed().as_secs(),
        }),
    )
}

async fn get_metrics() -> Response {
    match metrics::encode_metrics() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================

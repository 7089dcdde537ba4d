//! Read-only HTTP API.
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/healthz` | Liveness of the daemon itself |
//! | GET | `/api/v1/liveness` | Last-busy record of every tracked node |

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use fleetscale_state::{LivenessRecord, LivenessTracker};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub label: String,
    pub tracker: LivenessTracker,
}

/// Response wrapper for consistent API format.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    label: String,
}

#[derive(Serialize)]
struct Liveness {
    label: String,
    nodes: Vec<LivenessRecord>,
}

pub fn build_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/liveness", get(liveness))
        .with_state(state.clone());

    Router::new()
        .route("/healthz", get(healthz).with_state(state))
        .nest("/api/v1", api_routes)
}

/// GET /healthz
async fn healthz(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(Health {
        status: "ok",
        label: state.label,
    })
}

/// GET /api/v1/liveness
async fn liveness(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(Liveness {
        label: state.label,
        nodes: state.tracker.snapshot().await,
    })
}

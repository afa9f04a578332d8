use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::server::{api_key_auth, AppState};
use crate::triggers::dispatch_notification;

use super::health::{health, stats};
use super::metrics::prometheus_metrics;

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        // Health, stats & metrics
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        // Notification endpoints
        .nest(
            "/api/v1",
            Router::new()
                .route("/notifications/dispatch", post(dispatch_notification))
                .route_layer(from_fn_with_state(state.clone(), api_key_auth)),
        )
        .with_state(state)
}

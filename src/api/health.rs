//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::dispatch::DispatcherStatsSnapshot;
use crate::quota::{QuotaPolicy, QuotaSnapshot};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub channels: Vec<String>,
    pub quota_policy: QuotaPolicy,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub dispatch: DispatcherStatsSnapshot,
    pub quota: QuotaSnapshot,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let dispatcher = &state.dispatcher;

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        channels: dispatcher.resolver().schemes(),
        quota_policy: dispatcher.accountant().policy(),
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        dispatch: state.dispatcher.stats(),
        quota: state.dispatcher.accountant().snapshot(),
    })
}

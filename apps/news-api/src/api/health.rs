//! Readiness endpoint

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use axum_helpers::{HealthCheckFuture, run_health_checks};
use serde_json::Value;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ready", get(readiness_check))
        .with_state(state)
}

/// Ready when MongoDB answers a ping and the taxonomy holds codes
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let checks: Vec<(&str, HealthCheckFuture)> = vec![
        (
            "mongodb",
            Box::pin(async {
                database::mongodb::check_health(&state.db)
                    .await
                    .map_err(|e| e.to_string())
            }),
        ),
        (
            "taxonomy",
            Box::pin(async {
                if state.taxonomy.is_empty() {
                    Err("no event codes loaded".to_string())
                } else {
                    Ok(())
                }
            }),
        ),
    ];

    match run_health_checks(checks).await {
        Ok(ready) => ready,
        Err(not_ready) => not_ready,
    }
}

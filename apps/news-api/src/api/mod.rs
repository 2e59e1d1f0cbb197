//! API routes module

pub mod health;
pub mod news;

use axum::Router;

use crate::state::AppState;

/// All API routes; `axum_helpers::create_router` nests them under /api
pub fn routes(state: &AppState) -> Router {
    Router::new()
        .nest("/news", news::router(state))
        .merge(health::router(state.clone()))
}

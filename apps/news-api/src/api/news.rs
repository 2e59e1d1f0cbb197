//! News event routes backed by the MongoDB event store

use crate::state::AppState;
use axum::Router;
use domain_news_events::{MongoEventStore, NewsEventService, news_router};
use std::sync::Arc;

pub fn router(state: &AppState) -> Router {
    let settings = &state.config.news;
    let store = MongoEventStore::new(&state.db, &settings.collection);

    let service = NewsEventService::new(store, Arc::clone(&state.taxonomy))
        .with_limit_placement(settings.limit_placement);

    news_router::<MongoEventStore>().with_state(Arc::new(service))
}

//! Shared application state passed to route builders and handlers.

use domain_news_events::TaxonomyTable;
use mongodb::{Client, Database};
use std::sync::Arc;

/// Cloned per handler; every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    /// Shares the driver's connection pool
    pub mongo_client: Client,
    pub db: Database,
    /// Loaded once at startup, never mutated
    pub taxonomy: Arc<TaxonomyTable>,
}

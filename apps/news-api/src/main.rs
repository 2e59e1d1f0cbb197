use axum_helpers::server::{create_production_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_news_events::TaxonomyTable;
use eyre::WrapErr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;

    init_tracing(&config.environment);

    // A malformed reference table is a startup failure
    let taxonomy = TaxonomyTable::load(config.news.taxonomy_path.as_deref())
        .wrap_err("Failed to load the event type taxonomy")?;
    info!(codes = taxonomy.len(), "Loaded event type taxonomy");

    let mongo_client =
        database::mongodb::connect_from_config_with_retry(&config.mongodb, None).await?;
    let db = mongo_client.database(config.mongodb.database());

    info!(
        database = config.mongodb.database(),
        collection = %config.news.collection,
        limit_placement = %config.news.limit_placement,
        "Connected to MongoDB"
    );

    let state = AppState {
        config,
        mongo_client,
        db,
        taxonomy: Arc::new(taxonomy),
    };

    let api_routes = api::routes(&state);

    let router = axum_helpers::create_router::<openapi::ApiDoc>(api_routes).await?;

    let app = router.merge(health_router(state.config.app));

    info!("Starting News API with graceful shutdown (30s timeout)");

    let server_config = state.config.server.clone();
    create_production_app(app, &server_config, Duration::from_secs(30), async move {
        info!("Shutting down: closing MongoDB client");
        state.mongo_client.shutdown().await;
        info!("MongoDB client closed");
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("News API shutdown complete");
    Ok(())
}

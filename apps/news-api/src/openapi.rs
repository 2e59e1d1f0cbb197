//! OpenAPI documentation configuration

use utoipa::OpenApi;

/// Combined OpenAPI documentation for all APIs
#[derive(OpenApi)]
#[openapi(
    info(
        title = "News API",
        version = "0.1.0",
        description = "Read-only queries, groupings and type statistics over news events",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    nest(
        (path = "/api/news", api = domain_news_events::ApiDoc)
    )
)]
pub struct ApiDoc;

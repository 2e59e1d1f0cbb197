//! News Events Domain
//!
//! Read-only query service over GDELT-style news events stored in MongoDB.
//!
//! # Architecture
//!
//! ```text
//! query params ─► FilterCompiler ─► FilterCriteria
//!                                        │
//!                                        ▼
//!                                 PipelineBuilder ─► [Stage]
//!                                                       │
//!                                                       ▼
//!                                               EventStore::execute
//!                                                       │
//!                                     grouped rows ◄────┘
//!                                          │
//!                         Enricher (types only, CAMEO taxonomy)
//!                                          │
//!                                        rank ─► {"results": [...]}
//! ```

use axum_helpers::ErrorResponse;
use utoipa::OpenApi;

mod config;
mod enrich;
mod error;
mod filter;
mod handlers;
mod memory;
mod models;
mod mongodb;
mod pipeline;
mod rank;
mod repository;
mod service;
mod taxonomy;

pub use config::NewsEventsConfig;
pub use enrich::Enricher;
pub use error::{NewsEventError, Result};
pub use filter::{
    ActorFilter, ActorMatch, BoundingBox, DateRange, FilterCompiler, FilterCriteria,
    GeoConstraint, GeoShape, GeoTarget, NumericRange, RawParams,
};
pub use handlers::{NewsEventsState, news_router};
pub use memory::InMemoryEventStore;
pub use models::{Actor, Event, GeoPoint, GroupResult, ResultsResponse, fields};
pub use self::mongodb::MongoEventStore;
pub use pipeline::{
    Accumulator, AggregationShape, Bound, GroupField, GroupMembers, LimitPlacement,
    PipelineBuilder, Predicate, Scalar, SortDirection, Stage, match_predicate,
};
pub use rank::rank;
pub use repository::EventStore;
pub use service::NewsEventService;
pub use taxonomy::{TaxonomyTable, base_type};

/// OpenAPI documentation for the News Events API
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_events,
        handlers::list_event_ids,
        handlers::get_event,
        handlers::get_events_by_ids,
        handlers::list_groups,
        handlers::list_group_ids,
        handlers::list_types,
        handlers::list_actors,
    ),
    components(schemas(Event, Actor, GeoPoint, GroupField, ResultsResponse, ErrorResponse)),
    tags(
        (name = "events", description = "Raw news events"),
        (name = "groups", description = "Events grouped by country, region or city"),
        (name = "extra", description = "Event type and actor statistics")
    )
)]
pub struct ApiDoc;

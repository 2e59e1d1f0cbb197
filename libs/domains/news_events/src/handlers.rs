//! HTTP handlers for the news events API

use crate::error::NewsEventError;
use crate::models::ResultsResponse;
use crate::pipeline::{GroupField, GroupMembers};
use crate::repository::EventStore;
use crate::service::NewsEventService;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::WithRejection;
use axum_helpers::{AppError, ErrorResponse};
use std::sync::Arc;
use tracing::instrument;

/// News events router state
pub type NewsEventsState<S> = Arc<NewsEventService<S>>;

/// Query string as ordered key/value pairs, repeated keys preserved
type Params = WithRejection<Query<Vec<(String, String)>>, AppError>;

type SegmentPath = WithRejection<Path<String>, AppError>;

type ApiResult = Result<Json<ResultsResponse>, NewsEventError>;

/// Create the news events router
pub fn news_router<S: EventStore + 'static>() -> Router<NewsEventsState<S>> {
    Router::new()
        .route("/events", get(list_events::<S>))
        .route("/events/ids", get(list_event_ids::<S>))
        .route("/events/event/{id}", get(get_event::<S>))
        .route("/events/multiple", get(get_events_by_ids::<S>))
        .route("/groups/{field}", get(list_groups::<S>))
        .route("/groups/{field}/ids", get(list_group_ids::<S>))
        .route("/extra/types", get(list_types::<S>))
        .route("/extra/actors", get(list_actors::<S>))
}

fn parse_group_field(field: &str) -> Result<GroupField, NewsEventError> {
    field
        .parse::<GroupField>()
        .map_err(|_| NewsEventError::invalid("field", field, "expected country, region or city"))
}

/// List events matching the filter
#[utoipa::path(
    get,
    path = "/events",
    params(
        ("limit" = Option<u64>, Query, description = "Maximum number of events"),
        ("from" = Option<String>, Query, description = "First day (YYYY-MM-DD), alias startTime"),
        ("to" = Option<String>, Query, description = "Last day (YYYY-MM-DD), alias endTime"),
        ("lat" = Option<f64>, Query, description = "Circle centre latitude, alias latitude"),
        ("lon" = Option<f64>, Query, description = "Circle centre longitude, alias longitude"),
        ("radius" = Option<f64>, Query, description = "Circle radius in kilometres"),
        ("bbox" = Option<String>, Query, description = "Bounding box west,south,east,north"),
        ("geoTarget" = Option<String>, Query, description = "event (default) or actor"),
        ("actor" = Option<String>, Query, description = "Actor names, repeated or comma separated"),
        ("actorMatch" = Option<String>, Query, description = "exact (default) or contains"),
        ("type" = Option<String>, Query, description = "CAMEO event codes"),
        ("baseType" = Option<String>, Query, description = "CAMEO root codes"),
        ("ToneMin" = Option<f64>, Query, description = "Minimum average tone"),
        ("ToneMax" = Option<f64>, Query, description = "Maximum average tone"),
        ("GoldsteinScaleLow" = Option<f64>, Query, description = "Minimum Goldstein scale"),
        ("GoldsteinScaleHigh" = Option<f64>, Query, description = "Maximum Goldstein scale"),
    ),
    responses(
        (status = 200, description = "Matching events", body = ResultsResponse),
        (status = 400, description = "Invalid filter parameter", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "events"
)]
#[instrument(skip(state))]
pub async fn list_events<S: EventStore>(
    State(state): State<NewsEventsState<S>>,
    WithRejection(Query(params), _): Params,
) -> ApiResult {
    let results = state.events(&params).await?;
    Ok(Json(ResultsResponse::new(results)))
}

/// List ids of events matching the filter
#[utoipa::path(
    get,
    path = "/events/ids",
    responses(
        (status = 200, description = "Matching event ids", body = ResultsResponse),
        (status = 400, description = "Invalid filter parameter", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "events"
)]
#[instrument(skip(state))]
pub async fn list_event_ids<S: EventStore>(
    State(state): State<NewsEventsState<S>>,
    WithRejection(Query(params), _): Params,
) -> ApiResult {
    let results = state.event_ids(&params).await?;
    Ok(Json(ResultsResponse::new(results)))
}

/// Get one event by id
#[utoipa::path(
    get,
    path = "/events/event/{id}",
    params(
        ("id" = String, Path, description = "GLOBALEVENTID")
    ),
    responses(
        (status = 200, description = "Event found", body = ResultsResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "events"
)]
#[instrument(skip(state))]
pub async fn get_event<S: EventStore>(
    State(state): State<NewsEventsState<S>>,
    WithRejection(Path(id), _): SegmentPath,
) -> ApiResult {
    let event = state.event_by_id(&id).await?;
    Ok(Json(ResultsResponse::new(vec![event])))
}

/// Get several events by id
#[utoipa::path(
    get,
    path = "/events/multiple",
    params(
        ("id" = Vec<String>, Query, description = "Event ids, repeated or comma separated")
    ),
    responses(
        (status = 200, description = "Events found", body = ResultsResponse),
        (status = 400, description = "No id given", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "events"
)]
#[instrument(skip(state))]
pub async fn get_events_by_ids<S: EventStore>(
    State(state): State<NewsEventsState<S>>,
    WithRejection(Query(params), _): Params,
) -> ApiResult {
    let ids: Vec<String> = params
        .into_iter()
        .filter(|(key, _)| key == "id")
        .map(|(_, value)| value)
        .collect();
    let results = state.events_by_ids(&ids).await?;
    Ok(Json(ResultsResponse::new(results)))
}

/// Group matching events by place, with full member events
#[utoipa::path(
    get,
    path = "/groups/{field}",
    params(
        ("field" = GroupField, Path, description = "country, region or city")
    ),
    responses(
        (status = 200, description = "Groups, largest first", body = ResultsResponse),
        (status = 400, description = "Invalid filter parameter or field", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "groups"
)]
#[instrument(skip(state))]
pub async fn list_groups<S: EventStore>(
    State(state): State<NewsEventsState<S>>,
    WithRejection(Path(field), _): SegmentPath,
    WithRejection(Query(params), _): Params,
) -> ApiResult {
    let field = parse_group_field(&field)?;
    let results = state.groups(&params, field, GroupMembers::Full).await?;
    Ok(Json(ResultsResponse::new(results)))
}

/// Group matching events by place, with member event ids
#[utoipa::path(
    get,
    path = "/groups/{field}/ids",
    params(
        ("field" = GroupField, Path, description = "country, region or city")
    ),
    responses(
        (status = 200, description = "Groups, largest first", body = ResultsResponse),
        (status = 400, description = "Invalid filter parameter or field", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "groups"
)]
#[instrument(skip(state))]
pub async fn list_group_ids<S: EventStore>(
    State(state): State<NewsEventsState<S>>,
    WithRejection(Path(field), _): SegmentPath,
    WithRejection(Query(params), _): Params,
) -> ApiResult {
    let field = parse_group_field(&field)?;
    let results = state.groups(&params, field, GroupMembers::Ids).await?;
    Ok(Json(ResultsResponse::new(results)))
}

/// Event counts per CAMEO type with readable names
///
/// Events whose type code is missing or absent from the taxonomy are left out.
#[utoipa::path(
    get,
    path = "/extra/types",
    responses(
        (
            status = 200,
            description = "Type groups, largest first; missing or unknown type codes are excluded",
            body = ResultsResponse
        ),
        (status = 400, description = "Invalid filter parameter", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "extra"
)]
#[instrument(skip(state))]
pub async fn list_types<S: EventStore>(
    State(state): State<NewsEventsState<S>>,
    WithRejection(Query(params), _): Params,
) -> ApiResult {
    let results = state.types(&params).await?;
    Ok(Json(ResultsResponse::new(results)))
}

/// Occurrence counts per actor
#[utoipa::path(
    get,
    path = "/extra/actors",
    responses(
        (status = 200, description = "Actor groups, largest first", body = ResultsResponse),
        (status = 400, description = "Invalid filter parameter", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "extra"
)]
#[instrument(skip(state))]
pub async fn list_actors<S: EventStore>(
    State(state): State<NewsEventsState<S>>,
    WithRejection(Query(params), _): Params,
) -> ApiResult {
    let results = state.actors(&params).await?;
    Ok(Json(ResultsResponse::new(results)))
}

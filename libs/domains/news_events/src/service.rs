//! News event query service
//!
//! Request parameters flow through the filter compiler, the pipeline builder
//! and the store; grouped rows are then enriched and ranked.

use crate::enrich::Enricher;
use crate::error::{NewsEventError, Result};
use crate::filter::{FilterCompiler, FilterCriteria, RawParams};
use crate::models::{GroupResult, bson_to_json, document_to_json, fields};
use crate::pipeline::{
    AggregationShape, GroupField, GroupMembers, LimitPlacement, PipelineBuilder, Predicate,
    Scalar, Stage,
};
use crate::rank::rank;
use crate::repository::EventStore;
use crate::taxonomy::TaxonomyTable;
use mongodb::bson::Document;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

/// Query service over an injected event store
pub struct NewsEventService<S: EventStore> {
    store: S,
    compiler: FilterCompiler,
    enricher: Enricher,
    limit_placement: LimitPlacement,
}

impl<S: EventStore> NewsEventService<S> {
    pub fn new(store: S, taxonomy: Arc<TaxonomyTable>) -> Self {
        Self {
            store,
            compiler: FilterCompiler::new(),
            enricher: Enricher::new(taxonomy),
            limit_placement: LimitPlacement::default(),
        }
    }

    /// Builder: choose where `limit` applies
    pub fn with_limit_placement(mut self, placement: LimitPlacement) -> Self {
        self.limit_placement = placement;
        self
    }

    /// Raw events matching the filter
    #[instrument(skip(self, raw))]
    pub async fn events(&self, raw: &RawParams) -> Result<Vec<Value>> {
        let documents = self.run(raw, AggregationShape::None, GroupMembers::None).await?;
        info!(results = documents.len(), "Fetched events");
        Ok(documents.iter().map(document_to_json).collect())
    }

    /// Ids of the events matching the filter
    #[instrument(skip(self, raw))]
    pub async fn event_ids(&self, raw: &RawParams) -> Result<Vec<Value>> {
        let documents = self.run(raw, AggregationShape::None, GroupMembers::None).await?;
        info!(results = documents.len(), "Fetched event ids");
        Ok(documents.iter().map(id_only).collect())
    }

    /// A single event by id
    #[instrument(skip(self))]
    pub async fn event_by_id(&self, id: &str) -> Result<Value> {
        let stages = [
            Stage::Match(Predicate::Eq {
                field: fields::ID.to_string(),
                value: Scalar::from(id),
            }),
            Stage::Limit(1),
        ];
        let documents = self.store.execute(&stages).await?;
        documents
            .first()
            .map(document_to_json)
            .ok_or_else(|| NewsEventError::NotFound { id: id.to_string() })
    }

    /// Events whose id is any of `ids`
    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    pub async fn events_by_ids(&self, ids: &[String]) -> Result<Vec<Value>> {
        let ids: Vec<Scalar> = ids
            .iter()
            .flat_map(|id| id.split(','))
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(Scalar::from)
            .collect();
        if ids.is_empty() {
            return Err(NewsEventError::invalid(
                "id",
                "",
                "at least one event id is required",
            ));
        }

        let stages = [Stage::Match(Predicate::one_of(fields::ID, ids))];
        let documents = self.store.execute(&stages).await?;
        info!(results = documents.len(), "Fetched events by id");
        Ok(documents.iter().map(document_to_json).collect())
    }

    /// Events grouped by a place level, largest groups first
    #[instrument(skip(self, raw))]
    pub async fn groups(
        &self,
        raw: &RawParams,
        field: GroupField,
        members: GroupMembers,
    ) -> Result<Vec<Value>> {
        let rows = self
            .grouped(raw, AggregationShape::ByField(field), members)
            .await?;
        info!(groups = rows.len(), "Grouped events by {}", field);
        Ok(rows.iter().map(GroupResult::to_json).collect())
    }

    /// Event counts per type, with readable type names
    #[instrument(skip(self, raw))]
    pub async fn types(&self, raw: &RawParams) -> Result<Vec<Value>> {
        let rows = self
            .grouped(raw, AggregationShape::ByType, GroupMembers::None)
            .await?;
        info!(groups = rows.len(), "Grouped events by type");
        Ok(rows.iter().map(GroupResult::to_json).collect())
    }

    /// Occurrence counts per actor
    #[instrument(skip(self, raw))]
    pub async fn actors(&self, raw: &RawParams) -> Result<Vec<Value>> {
        let rows = self
            .grouped(raw, AggregationShape::ByActor, GroupMembers::None)
            .await?;
        info!(groups = rows.len(), "Grouped events by actor");
        Ok(rows.iter().map(GroupResult::to_json).collect())
    }

    /// Compile, build and execute; invalid parameters never reach the store
    async fn run(
        &self,
        raw: &RawParams,
        shape: AggregationShape,
        members: GroupMembers,
    ) -> Result<Vec<Document>> {
        let criteria = self.compiler.compile(raw)?;
        self.execute(&criteria, shape, members).await
    }

    async fn execute(
        &self,
        criteria: &FilterCriteria,
        shape: AggregationShape,
        members: GroupMembers,
    ) -> Result<Vec<Document>> {
        let stages = PipelineBuilder::new(self.limit_placement)
            .with_members(members)
            .build(criteria, shape);
        self.store.execute(&stages).await
    }

    async fn grouped(
        &self,
        raw: &RawParams,
        shape: AggregationShape,
        members: GroupMembers,
    ) -> Result<Vec<GroupResult>> {
        let criteria = self.compiler.compile(raw)?;
        let documents = self.execute(&criteria, shape, members).await?;
        let rows: Vec<GroupResult> =
            documents.into_iter().map(GroupResult::from_document).collect();
        if shape != AggregationShape::ByType {
            return Ok(rank(rows));
        }

        let mut rows = rank(self.enricher.enrich(rows));
        if let (Some(limit), LimitPlacement::AfterMatch) = (criteria.limit, self.limit_placement) {
            rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(rows)
    }
}

fn id_only(doc: &Document) -> Value {
    let id = doc.get(fields::ID).map(bson_to_json).unwrap_or(Value::Null);
    let mut map = serde_json::Map::new();
    map.insert(fields::ID.to_string(), id);
    Value::Object(map)
}

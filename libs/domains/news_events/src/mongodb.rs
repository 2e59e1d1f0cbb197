//! MongoDB implementation of EventStore
//!
//! Typed stages are rendered into aggregation documents here and nowhere
//! else.

use crate::error::Result;
use crate::filter::GeoShape;
use crate::pipeline::{Accumulator, Bound, Predicate, Scalar, SortDirection, Stage};
use crate::repository::EventStore;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{self, Bson, Document, doc};
use mongodb::{Collection, Database};
use tracing::{debug, instrument};

/// Mean Earth radius used by `$centerSphere`
const EARTH_RADIUS_KM: f64 = 6378.1;

/// MongoDB-backed event store
#[derive(Clone)]
pub struct MongoEventStore {
    collection: Collection<Document>,
}

impl MongoEventStore {
    pub fn new(database: &Database, collection: &str) -> Self {
        Self {
            collection: database.collection(collection),
        }
    }

    /// Render a stage sequence as an aggregation pipeline
    pub fn pipeline(stages: &[Stage]) -> Vec<Document> {
        stages.iter().map(stage_document).collect()
    }
}

#[async_trait]
impl EventStore for MongoEventStore {
    #[instrument(
        skip(self, stages),
        fields(stages = stages.len(), collection = %self.collection.name())
    )]
    async fn execute(&self, stages: &[Stage]) -> Result<Vec<Document>> {
        let pipeline = Self::pipeline(stages);
        debug!(pipeline = ?pipeline, "Running aggregation");

        let cursor = self.collection.aggregate(pipeline).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;

        debug!(results = documents.len(), "Aggregation finished");
        Ok(documents)
    }
}

fn field_ref(path: &str) -> String {
    format!("${}", path)
}

fn stage_document(stage: &Stage) -> Document {
    match stage {
        Stage::Limit(n) => doc! { "$limit": i64::try_from(*n).unwrap_or(i64::MAX) },
        Stage::Match(predicate) => doc! { "$match": predicate_document(predicate) },
        Stage::Unwind(field) => doc! { "$unwind": field_ref(field) },
        Stage::GroupBy { key, accumulators } => {
            let mut group = doc! { "_id": field_ref(key) };
            for (name, accumulator) in accumulators {
                group.insert(name.as_str(), accumulator_document(accumulator));
            }
            doc! { "$group": group }
        }
        Stage::Sort { field, direction } => {
            let order = match direction {
                SortDirection::Ascending => 1,
                SortDirection::Descending => -1,
            };
            let mut sort = Document::new();
            sort.insert(field.as_str(), order);
            doc! { "$sort": sort }
        }
    }
}

fn accumulator_document(accumulator: &Accumulator) -> Document {
    match accumulator {
        Accumulator::Count => doc! { "$sum": 1 },
        Accumulator::First(path) => doc! { "$first": field_ref(path) },
        Accumulator::PushFields(pairs) => {
            let mut member = Document::new();
            for (name, path) in pairs {
                member.insert(name.as_str(), field_ref(path));
            }
            doc! { "$push": member }
        }
        Accumulator::PushRoot => doc! { "$push": "$$ROOT" },
    }
}

fn scalar_bson(value: &Scalar) -> Bson {
    match value {
        Scalar::String(s) => Bson::String(s.clone()),
        Scalar::Number(n) => Bson::Double(*n),
        Scalar::DateTime(dt) => Bson::DateTime(bson::DateTime::from_millis(dt.timestamp_millis())),
    }
}

fn single_field(field: &str, condition: impl Into<Bson>) -> Document {
    let mut doc = Document::new();
    doc.insert(field, condition);
    doc
}

fn predicate_document(predicate: &Predicate) -> Document {
    match predicate {
        Predicate::All => Document::new(),
        Predicate::And(parts) if parts.is_empty() => Document::new(),
        Predicate::And(parts) => {
            let parts: Vec<Document> = parts.iter().map(predicate_document).collect();
            doc! { "$and": parts }
        }
        // An empty disjunction matches nothing
        Predicate::Or(parts) if parts.is_empty() => doc! { "$expr": false },
        Predicate::Or(parts) => {
            let parts: Vec<Document> = parts.iter().map(predicate_document).collect();
            doc! { "$or": parts }
        }
        Predicate::Eq { field, value } => single_field(field, scalar_bson(value)),
        Predicate::In { field, values } => {
            let values: Vec<Bson> = values.iter().map(scalar_bson).collect();
            single_field(field, doc! { "$in": values })
        }
        Predicate::Prefix { field, prefix } => {
            single_field(field, doc! { "$regex": format!("^{}", regex::escape(prefix)) })
        }
        Predicate::Contains { field, needle } => single_field(
            field,
            doc! { "$regex": regex::escape(needle), "$options": "i" },
        ),
        Predicate::Range {
            field,
            lower,
            upper,
        } => {
            let mut condition = Document::new();
            if let Some(Bound { value, inclusive }) = lower {
                let op = if *inclusive { "$gte" } else { "$gt" };
                condition.insert(op, scalar_bson(value));
            }
            if let Some(Bound { value, inclusive }) = upper {
                let op = if *inclusive { "$lte" } else { "$lt" };
                condition.insert(op, scalar_bson(value));
            }
            if condition.is_empty() {
                return Document::new();
            }
            single_field(field, condition)
        }
        Predicate::GeoWithin { field, shape } => {
            single_field(field, doc! { "$geoWithin": shape_document(shape) })
        }
    }
}

fn shape_document(shape: &GeoShape) -> Document {
    match shape {
        GeoShape::Circle { center, radius_km } => doc! {
            "$centerSphere": [
                [center.longitude(), center.latitude()],
                radius_km / EARTH_RADIUS_KM,
            ]
        },
        // Planar, matching BoundingBox::contains
        GeoShape::Box(bbox) => doc! {
            "$box": [[bbox.west, bbox.south], [bbox.east, bbox.north]]
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{BoundingBox, FilterCriteria};
    use crate::models::{GeoPoint, fields};
    use crate::pipeline::{AggregationShape, GroupField, GroupMembers, PipelineBuilder};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_empty_filter_renders_empty_match() {
        let stages =
            PipelineBuilder::default().build(&FilterCriteria::default(), AggregationShape::None);
        assert_eq!(MongoEventStore::pipeline(&stages), vec![doc! { "$match": {} }]);
    }

    #[test]
    fn test_type_grouping_pipeline() {
        let stages = PipelineBuilder::default().build(
            &FilterCriteria::default().with_limit(100),
            AggregationShape::ByType,
        );
        assert_eq!(
            MongoEventStore::pipeline(&stages),
            vec![
                doc! { "$limit": 100_i64 },
                doc! { "$match": {} },
                doc! {
                    "$group": {
                        "_id": "$Type",
                        "Count": { "$sum": 1 },
                        "Type": { "$first": "$Type" },
                    }
                },
            ]
        );
    }

    #[test]
    fn test_field_grouping_pushes_member_ids() {
        let stages = PipelineBuilder::default()
            .with_members(GroupMembers::Ids)
            .build(&FilterCriteria::default(), AggregationShape::ByField(GroupField::Country));
        let pipeline = MongoEventStore::pipeline(&stages);
        let group = pipeline[1].get_document("$group").unwrap();
        assert_eq!(group.get_str("_id").unwrap(), "$Country");
        assert_eq!(
            group.get_document(fields::EVENTS).unwrap(),
            &doc! { "$push": { "GLOBALEVENTID": "$GLOBALEVENTID" } }
        );
        assert_eq!(pipeline[2], doc! { "$sort": { "Count": -1 } });
    }

    #[test]
    fn test_actor_grouping_unwinds_actors() {
        let stages =
            PipelineBuilder::default().build(&FilterCriteria::default(), AggregationShape::ByActor);
        let pipeline = MongoEventStore::pipeline(&stages);
        assert_eq!(pipeline[1], doc! { "$unwind": "$Actors" });
        let group = pipeline[2].get_document("$group").unwrap();
        assert_eq!(group.get_str("_id").unwrap(), "$Actors.Name");
        assert_eq!(
            group.get_document("Location").unwrap(),
            &doc! { "$first": "$Actors.Location" }
        );
    }

    #[test]
    fn test_predicate_operators() {
        let range = Predicate::Range {
            field: fields::DATE.to_string(),
            lower: Some(Bound::inclusive(Scalar::DateTime(
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            ))),
            upper: Some(Bound::exclusive(Scalar::DateTime(
                Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            ))),
        };
        let rendered = predicate_document(&range);
        let condition = rendered.get_document(fields::DATE).unwrap();
        assert!(condition.get_datetime("$gte").is_ok());
        assert!(condition.get_datetime("$lt").is_ok());

        let prefix = predicate_document(&Predicate::Prefix {
            field: fields::TYPE.to_string(),
            prefix: "1.".to_string(),
        });
        assert_eq!(prefix, doc! { "Type": { "$regex": "^1\\." } });

        let contains = predicate_document(&Predicate::Contains {
            field: fields::ACTOR_NAME.to_string(),
            needle: "united".to_string(),
        });
        assert_eq!(
            contains,
            doc! { "Actors.Name": { "$regex": "united", "$options": "i" } }
        );

        let one_of = predicate_document(&Predicate::one_of(
            fields::TYPE,
            vec![Scalar::from("190"), Scalar::from("191")],
        ));
        assert_eq!(one_of, doc! { "Type": { "$in": ["190", "191"] } });
    }

    #[test]
    fn test_geo_shapes() {
        let circle = predicate_document(&Predicate::GeoWithin {
            field: fields::LOCATION.to_string(),
            shape: GeoShape::Circle {
                center: GeoPoint::new(10.0, 20.0),
                radius_km: EARTH_RADIUS_KM,
            },
        });
        assert_eq!(
            circle,
            doc! { "Location": { "$geoWithin": { "$centerSphere": [[10.0, 20.0], 1.0] } } }
        );

        let rect = predicate_document(&Predicate::GeoWithin {
            field: fields::ACTOR_LOCATION.to_string(),
            shape: GeoShape::Box(BoundingBox {
                west: 0.0,
                south: 1.0,
                east: 2.0,
                north: 3.0,
            }),
        });
        assert_eq!(
            rect,
            doc! { "Actors.Location": { "$geoWithin": { "$box": [[0.0, 1.0], [2.0, 3.0]] } } }
        );
    }

    #[test]
    fn test_wide_box_stays_planar() {
        let bbox = BoundingBox {
            west: -170.0,
            south: -10.0,
            east: 170.0,
            north: 10.0,
        };
        assert!(bbox.contains(&GeoPoint::new(0.0, 0.0)));
        assert!(!bbox.contains(&GeoPoint::new(175.0, 0.0)));

        let rect = predicate_document(&Predicate::GeoWithin {
            field: fields::LOCATION.to_string(),
            shape: GeoShape::Box(bbox),
        });
        assert_eq!(
            rect,
            doc! { "Location": { "$geoWithin": { "$box": [[-170.0, -10.0], [170.0, 10.0]] } } }
        );
    }

    #[test]
    fn test_empty_disjunction_matches_nothing() {
        assert_eq!(predicate_document(&Predicate::Or(vec![])), doc! { "$expr": false });
    }
}

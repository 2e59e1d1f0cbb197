//! In-memory implementation of EventStore
//!
//! Evaluates the same stage sequences as the MongoDB store over a fixed set
//! of documents. Used by tests and for running the API without a database.

use crate::error::Result;
use crate::filter::GeoShape;
use crate::models::{Event, GeoPoint, bson_as_f64};
use crate::pipeline::{Accumulator, Bound, Predicate, Scalar, SortDirection, Stage};
use crate::repository::EventStore;
use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, instrument};

const EARTH_RADIUS_KM: f64 = 6378.1;

/// Read-only event store over a fixed document set
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    documents: Arc<Vec<Document>>,
}

impl InMemoryEventStore {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents: Arc::new(documents),
        }
    }

    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a Event>) -> Self {
        Self::new(events.into_iter().map(Event::to_document).collect())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    #[instrument(
        skip(self, stages),
        fields(stages = stages.len(), documents = self.documents.len())
    )]
    async fn execute(&self, stages: &[Stage]) -> Result<Vec<Document>> {
        let mut rows: Vec<Document> = self.documents.as_ref().clone();
        for stage in stages {
            rows = apply(stage, rows);
        }
        debug!(results = rows.len(), "Evaluated stages in memory");
        Ok(rows)
    }
}

fn apply(stage: &Stage, mut rows: Vec<Document>) -> Vec<Document> {
    match stage {
        Stage::Limit(n) => {
            rows.truncate(usize::try_from(*n).unwrap_or(usize::MAX));
            rows
        }
        Stage::Match(predicate) => {
            rows.retain(|doc| satisfies(predicate, doc));
            rows
        }
        Stage::Unwind(field) => rows.into_iter().flat_map(|doc| unwind(doc, field)).collect(),
        Stage::GroupBy { key, accumulators } => group(rows, key, accumulators),
        Stage::Sort { field, direction } => {
            rows.sort_by(|a, b| {
                let ordering = compare(
                    resolve_path(a, field).as_ref(),
                    resolve_path(b, field).as_ref(),
                );
                match direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
            rows
        }
    }
}

/// One row per array element; rows with a missing, null or empty array are dropped
fn unwind(doc: Document, field: &str) -> Vec<Document> {
    match doc.get(field) {
        Some(Bson::Array(items)) => items
            .iter()
            .map(|item| {
                let mut row = doc.clone();
                row.insert(field, item.clone());
                row
            })
            .collect(),
        None | Some(Bson::Null) => Vec::new(),
        Some(_) => vec![doc],
    }
}

fn group(rows: Vec<Document>, key: &str, accumulators: &[(String, Accumulator)]) -> Vec<Document> {
    // Groups keep first-seen order
    let mut groups: Vec<(Bson, Vec<Document>)> = Vec::new();
    for row in rows {
        let value = resolve_path(&row, key).unwrap_or(Bson::Null);
        match groups.iter_mut().find(|(k, _)| *k == value) {
            Some((_, members)) => members.push(row),
            None => groups.push((value, vec![row])),
        }
    }

    groups
        .into_iter()
        .map(|(value, members)| {
            let mut out = Document::new();
            out.insert("_id", value);
            for (name, accumulator) in accumulators {
                out.insert(name.as_str(), accumulate(accumulator, &members));
            }
            out
        })
        .collect()
}

fn accumulate(accumulator: &Accumulator, members: &[Document]) -> Bson {
    match accumulator {
        Accumulator::Count => match i32::try_from(members.len()) {
            Ok(n) => Bson::Int32(n),
            Err(_) => Bson::Int64(members.len() as i64),
        },
        Accumulator::First(path) => members
            .first()
            .and_then(|doc| resolve_path(doc, path))
            .unwrap_or(Bson::Null),
        Accumulator::PushFields(pairs) => Bson::Array(
            members
                .iter()
                .map(|doc| {
                    let mut member = Document::new();
                    for (name, path) in pairs {
                        if let Some(value) = resolve_path(doc, path) {
                            member.insert(name.as_str(), value);
                        }
                    }
                    Bson::Document(member)
                })
                .collect(),
        ),
        Accumulator::PushRoot => Bson::Array(members.iter().cloned().map(Bson::Document).collect()),
    }
}

/// Value of a dotted path; a path through an array yields the array of
/// values found in its elements
fn resolve_path(doc: &Document, path: &str) -> Option<Bson> {
    let segments: Vec<&str> = path.split('.').collect();
    let (head, rest) = segments.split_first()?;
    resolve(doc.get(*head)?, rest)
}

fn resolve(value: &Bson, path: &[&str]) -> Option<Bson> {
    let Some((head, rest)) = path.split_first() else {
        return Some(value.clone());
    };
    match value {
        Bson::Document(doc) => resolve(doc.get(*head)?, rest),
        Bson::Array(items) => Some(Bson::Array(
            items.iter().filter_map(|item| resolve(item, path)).collect(),
        )),
        _ => None,
    }
}

/// Every value a path can refer to for matching: array elements are visited
/// individually as well as the array itself
fn candidates<'a>(doc: &'a Document, path: &str) -> Vec<&'a Bson> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    if let Some((head, rest)) = segments.split_first() {
        if let Some(value) = doc.get(*head) {
            collect_candidates(value, rest, &mut out);
        }
    }
    out
}

fn collect_candidates<'a>(value: &'a Bson, path: &[&str], out: &mut Vec<&'a Bson>) {
    match (path.split_first(), value) {
        (None, Bson::Array(items)) => {
            out.extend(items.iter());
            out.push(value);
        }
        (None, _) => out.push(value),
        (Some((head, rest)), Bson::Document(doc)) => {
            if let Some(next) = doc.get(*head) {
                collect_candidates(next, rest, out);
            }
        }
        (Some(_), Bson::Array(items)) => {
            for item in items {
                collect_candidates(item, path, out);
            }
        }
        (Some(_), _) => {}
    }
}

fn satisfies(predicate: &Predicate, doc: &Document) -> bool {
    match predicate {
        Predicate::All => true,
        Predicate::And(parts) => parts.iter().all(|p| satisfies(p, doc)),
        Predicate::Or(parts) => parts.iter().any(|p| satisfies(p, doc)),
        Predicate::Eq { field, value } => candidates(doc, field)
            .into_iter()
            .any(|candidate| scalar_cmp(candidate, value) == Some(Ordering::Equal)),
        Predicate::In { field, values } => candidates(doc, field).into_iter().any(|candidate| {
            values
                .iter()
                .any(|value| scalar_cmp(candidate, value) == Some(Ordering::Equal))
        }),
        Predicate::Prefix { field, prefix } => {
            candidates(doc, field).into_iter().any(|candidate| {
                matches!(candidate, Bson::String(s) if s.starts_with(prefix.as_str()))
            })
        }
        Predicate::Contains { field, needle } => {
            let needle = needle.to_lowercase();
            candidates(doc, field).into_iter().any(|candidate| {
                matches!(candidate, Bson::String(s) if s.to_lowercase().contains(&needle))
            })
        }
        Predicate::Range {
            field,
            lower,
            upper,
        } => candidates(doc, field)
            .into_iter()
            .any(|candidate| within(candidate, lower.as_ref(), upper.as_ref())),
        Predicate::GeoWithin { field, shape } => candidates(doc, field)
            .into_iter()
            .filter_map(GeoPoint::from_bson)
            .any(|point| in_shape(&point, shape)),
    }
}

fn within(candidate: &Bson, lower: Option<&Bound>, upper: Option<&Bound>) -> bool {
    let lower_ok = lower.is_none_or(|bound| match scalar_cmp(candidate, &bound.value) {
        Some(Ordering::Greater) => true,
        Some(Ordering::Equal) => bound.inclusive,
        _ => false,
    });
    let upper_ok = upper.is_none_or(|bound| match scalar_cmp(candidate, &bound.value) {
        Some(Ordering::Less) => true,
        Some(Ordering::Equal) => bound.inclusive,
        _ => false,
    });
    lower_ok && upper_ok
}

/// Compare a stored value with a literal of the same kind
fn scalar_cmp(candidate: &Bson, value: &Scalar) -> Option<Ordering> {
    match (candidate, value) {
        (Bson::String(s), Scalar::String(v)) => Some(s.as_str().cmp(v.as_str())),
        (Bson::DateTime(dt), Scalar::DateTime(v)) => {
            Some(dt.timestamp_millis().cmp(&v.timestamp_millis()))
        }
        (other, Scalar::Number(v)) => bson_as_f64(other).and_then(|n| n.partial_cmp(v)),
        _ => None,
    }
}

fn in_shape(point: &GeoPoint, shape: &GeoShape) -> bool {
    match shape {
        GeoShape::Circle { center, radius_km } => haversine_km(point, center) <= *radius_km,
        GeoShape::Box(bbox) => bbox.contains(point),
    }
}

fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let (lat1, lat2) = (a.latitude().to_radians(), b.latitude().to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.longitude() - a.longitude()).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Ordering used by sort stages: missing and null first, then numbers,
/// strings and datetimes
fn compare(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    fn rank(value: Option<&Bson>) -> u8 {
        match value {
            None | Some(Bson::Null) => 0,
            Some(Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => 1,
            Some(Bson::String(_)) => 2,
            Some(Bson::DateTime(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Bson::String(x)), Some(Bson::String(y))) => x.cmp(y),
        (Some(Bson::DateTime(x)), Some(Bson::DateTime(y))) => {
            x.timestamp_millis().cmp(&y.timestamp_millis())
        }
        (Some(x), Some(y)) if rank(a) == 1 && rank(b) == 1 => {
            let (x, y) = (bson_as_f64(x), bson_as_f64(y));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

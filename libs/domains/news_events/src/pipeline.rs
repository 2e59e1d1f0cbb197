//! Aggregation pipeline construction
//!
//! Stages and predicates are plain typed values. Translation to the store's
//! wire format happens in the store implementation, never here.

use crate::filter::{ActorMatch, FilterCriteria, GeoShape, GeoTarget, NumericRange};
use crate::models::fields;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// A literal compared against document fields
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Number(f64),
    DateTime(DateTime<Utc>),
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub value: Scalar,
    pub inclusive: bool,
}

impl Bound {
    pub fn inclusive(value: impl Into<Scalar>) -> Self {
        Self {
            value: value.into(),
            inclusive: true,
        }
    }

    pub fn exclusive(value: impl Into<Scalar>) -> Self {
        Self {
            value: value.into(),
            inclusive: false,
        }
    }
}

/// Boolean condition over one event document.
///
/// Field paths use dot notation; a path through an array matches when any
/// element matches.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every document
    All,
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Eq { field: String, value: Scalar },
    In { field: String, values: Vec<Scalar> },
    /// String field starts with `prefix`
    Prefix { field: String, prefix: String },
    /// Case-insensitive substring match
    Contains { field: String, needle: String },
    Range {
        field: String,
        lower: Option<Bound>,
        upper: Option<Bound>,
    },
    GeoWithin { field: String, shape: GeoShape },
}

impl Predicate {
    /// Conjunction of `parts`, collapsing the empty and single cases
    pub fn all_of(mut parts: Vec<Predicate>) -> Self {
        match parts.len() {
            0 => Self::All,
            1 => parts.remove(0),
            _ => Self::And(parts),
        }
    }

    /// Disjunction of `parts`; a single part is returned as-is
    pub fn any_of(mut parts: Vec<Predicate>) -> Self {
        match parts.len() {
            1 => parts.remove(0),
            _ => Self::Or(parts),
        }
    }

    /// Field equals any of `values`
    pub fn one_of(field: &str, mut values: Vec<Scalar>) -> Self {
        if values.len() == 1 {
            Self::Eq {
                field: field.to_string(),
                value: values.remove(0),
            }
        } else {
            Self::In {
                field: field.to_string(),
                values,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// How a group output field is computed from its member rows
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Number of member rows
    Count,
    /// Value of `path` in the first member row
    First(String),
    /// One sub-document per member, `(output name, source path)` pairs
    PushFields(Vec<(String, String)>),
    /// The whole member document
    PushRoot,
}

/// One step of a query plan
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Limit(u64),
    Match(Predicate),
    /// Emit one row per element of an array field
    Unwind(String),
    GroupBy {
        key: String,
        accumulators: Vec<(String, Accumulator)>,
    },
    Sort {
        field: String,
        direction: SortDirection,
    },
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Limit(_) => "limit",
            Self::Match(_) => "match",
            Self::Unwind(_) => "unwind",
            Self::GroupBy { .. } => "group",
            Self::Sort { .. } => "sort",
        }
    }

    fn count_descending() -> Self {
        Self::Sort {
            field: fields::COUNT.to_string(),
            direction: SortDirection::Descending,
        }
    }
}

/// Place level used for field grouping
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize, ToSchema,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GroupField {
    Country,
    Region,
    City,
}

impl GroupField {
    /// Store field holding this level
    pub fn field(self) -> &'static str {
        match self {
            Self::Country => fields::COUNTRY,
            Self::Region => fields::REGION,
            Self::City => fields::CITY,
        }
    }

    /// Fields describing the place a group stands for, innermost first
    fn place_fields(self) -> &'static [&'static str] {
        match self {
            Self::Country => &[fields::COUNTRY, fields::COUNTRY_CODE],
            Self::Region => &[fields::REGION, fields::COUNTRY, fields::COUNTRY_CODE],
            Self::City => &[
                fields::CITY,
                fields::REGION,
                fields::COUNTRY,
                fields::COUNTRY_CODE,
            ],
        }
    }
}

/// Grouping dimension of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationShape {
    None,
    ByActor,
    ByType,
    ByField(GroupField),
}

impl AggregationShape {
    pub fn is_grouped(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Member events carried by field groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupMembers {
    #[default]
    None,
    /// `{GLOBALEVENTID}` per member
    Ids,
    /// Whole member documents
    Full,
}

/// Where the `limit` parameter applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LimitPlacement {
    /// Cap the scanned events before filtering
    #[default]
    BeforeMatch,
    /// Cap matching events, or the ranked groups for grouped queries
    AfterMatch,
}

/// Builds stage sequences from filter criteria
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineBuilder {
    placement: LimitPlacement,
    members: GroupMembers,
}

impl PipelineBuilder {
    pub fn new(placement: LimitPlacement) -> Self {
        Self {
            placement,
            members: GroupMembers::None,
        }
    }

    pub fn with_members(mut self, members: GroupMembers) -> Self {
        self.members = members;
        self
    }

    pub fn build(&self, criteria: &FilterCriteria, shape: AggregationShape) -> Vec<Stage> {
        let mut stages = Vec::new();

        if let (Some(limit), LimitPlacement::BeforeMatch) = (criteria.limit, self.placement) {
            stages.push(Stage::Limit(limit));
        }

        stages.push(Stage::Match(match_predicate(criteria)));

        match shape {
            AggregationShape::None => {}
            AggregationShape::ByActor => {
                stages.push(Stage::Unwind(fields::ACTORS.to_string()));
                stages.push(Stage::GroupBy {
                    key: fields::ACTOR_NAME.to_string(),
                    accumulators: vec![
                        count(),
                        first(fields::ACTOR, fields::ACTOR_NAME),
                        first(fields::LOCATION, fields::ACTOR_LOCATION),
                        first(fields::TYPE, fields::ACTOR_TYPE),
                    ],
                });
                stages.push(Stage::count_descending());
            }
            AggregationShape::ByType => {
                stages.push(Stage::GroupBy {
                    key: fields::TYPE.to_string(),
                    accumulators: vec![count(), first(fields::TYPE, fields::TYPE)],
                });
            }
            AggregationShape::ByField(field) => {
                let mut accumulators = vec![count()];
                accumulators.extend(field.place_fields().iter().map(|f| first(f, f)));
                accumulators.push(first(fields::LOCATION, fields::LOCATION));
                match self.members {
                    GroupMembers::None => {}
                    GroupMembers::Ids => accumulators.push((
                        fields::EVENTS.to_string(),
                        Accumulator::PushFields(vec![(
                            fields::ID.to_string(),
                            fields::ID.to_string(),
                        )]),
                    )),
                    GroupMembers::Full => accumulators
                        .push((fields::EVENTS.to_string(), Accumulator::PushRoot)),
                }
                stages.push(Stage::GroupBy {
                    key: field.field().to_string(),
                    accumulators,
                });
                stages.push(Stage::count_descending());
            }
        }

        // Type groups are paged by the caller once enrichment has dropped unknown codes
        match (criteria.limit, self.placement) {
            (Some(limit), LimitPlacement::AfterMatch) if shape != AggregationShape::ByType => {
                stages.push(Stage::Limit(limit));
            }
            _ => {}
        }

        stages
    }
}

fn count() -> (String, Accumulator) {
    (fields::COUNT.to_string(), Accumulator::Count)
}

fn first(name: &str, path: &str) -> (String, Accumulator) {
    (name.to_string(), Accumulator::First(path.to_string()))
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

fn numeric_range(field: &str, range: &NumericRange) -> Predicate {
    Predicate::Range {
        field: field.to_string(),
        lower: range.min.map(Bound::inclusive),
        upper: range.max.map(Bound::inclusive),
    }
}

/// The conjunctive predicate of every set criterion
pub fn match_predicate(criteria: &FilterCriteria) -> Predicate {
    let mut parts = Vec::new();

    if let Some(range) = criteria.date_range {
        // Dates are stored at midnight; the end date is covered up to the next midnight
        let upper = range.to.map(|to| match to.succ_opt() {
            Some(next) => Bound::exclusive(Scalar::DateTime(midnight(next))),
            None => Bound::inclusive(Scalar::DateTime(midnight(to))),
        });
        parts.push(Predicate::Range {
            field: fields::DATE.to_string(),
            lower: range
                .from
                .map(|from| Bound::inclusive(Scalar::DateTime(midnight(from)))),
            upper,
        });
    }

    if let Some(region) = criteria.region {
        let field = match region.target {
            GeoTarget::Event => fields::LOCATION,
            GeoTarget::Actor => fields::ACTOR_LOCATION,
        };
        parts.push(Predicate::GeoWithin {
            field: field.to_string(),
            shape: region.shape,
        });
    }

    if let Some(actors) = &criteria.actors {
        let predicate = match actors.mode {
            ActorMatch::Exact => Predicate::one_of(
                fields::ACTOR_NAME,
                actors.names.iter().cloned().map(Scalar::from).collect(),
            ),
            ActorMatch::Contains => Predicate::any_of(
                actors
                    .names
                    .iter()
                    .map(|name| Predicate::Contains {
                        field: fields::ACTOR_NAME.to_string(),
                        needle: name.clone(),
                    })
                    .collect(),
            ),
        };
        parts.push(predicate);
    }

    if !criteria.type_codes.is_empty() {
        parts.push(Predicate::one_of(
            fields::TYPE,
            criteria.type_codes.iter().cloned().map(Scalar::from).collect(),
        ));
    }

    if !criteria.base_types.is_empty() {
        parts.push(Predicate::any_of(
            criteria
                .base_types
                .iter()
                .map(|base| Predicate::Prefix {
                    field: fields::TYPE.to_string(),
                    prefix: base.clone(),
                })
                .collect(),
        ));
    }

    if let Some(tone) = &criteria.tone {
        parts.push(numeric_range(fields::AVG_TONE, tone));
    }
    if let Some(goldstein) = &criteria.goldstein {
        parts.push(numeric_range(fields::GOLDSTEIN_SCALE, goldstein));
    }

    Predicate::all_of(parts)
}

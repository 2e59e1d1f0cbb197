//! Filter parameter compilation
//!
//! Turns the loosely typed query string of a request into a validated
//! [`FilterCriteria`]. Every parameter is optional; an empty parameter list
//! compiles to criteria that match every event.

use crate::error::{NewsEventError, Result};
use crate::models::GeoPoint;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, instrument};

/// Raw request parameters: repeated keys are kept in order
pub type RawParams = [(String, String)];

/// Parameter names, with the aliases the web frontend sends
pub mod params {
    pub const LIMIT: &[&str] = &["limit"];
    pub const FROM: &[&str] = &["from", "startTime"];
    pub const TO: &[&str] = &["to", "endTime"];
    pub const LATITUDE: &[&str] = &["lat", "latitude"];
    pub const LONGITUDE: &[&str] = &["lon", "longitude"];
    pub const RADIUS: &[&str] = &["radius"];
    pub const BBOX: &[&str] = &["bbox"];
    pub const GEO_TARGET: &[&str] = &["geoTarget"];
    pub const ACTOR: &[&str] = &["actor"];
    pub const ACTOR_MATCH: &[&str] = &["actorMatch"];
    pub const TYPE: &[&str] = &["type"];
    pub const BASE_TYPE: &[&str] = &["baseType"];
    pub const TONE_MIN: &[&str] = &["ToneMin"];
    pub const TONE_MAX: &[&str] = &["ToneMax"];
    pub const GOLDSTEIN_LOW: &[&str] = &["GoldsteinScaleLow"];
    pub const GOLDSTEIN_HIGH: &[&str] = &["GoldsteinScaleHigh"];
}

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive calendar date range, either end may be open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Axis-aligned region in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn contains(&self, point: &GeoPoint) -> bool {
        let (lon, lat) = (point.longitude(), point.latitude());
        lon >= self.west && lon <= self.east && lat >= self.south && lat <= self.north
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeoShape {
    Circle { center: GeoPoint, radius_km: f64 },
    Box(BoundingBox),
}

/// Which location a geospatial constraint applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GeoTarget {
    /// The event's own location
    #[default]
    Event,
    /// The location of any of the event's actors
    Actor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoConstraint {
    pub target: GeoTarget,
    pub shape: GeoShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActorMatch {
    #[default]
    Exact,
    /// Case-insensitive substring
    Contains,
}

/// Actor names, any of which may match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorFilter {
    pub names: Vec<String>,
    pub mode: ActorMatch,
}

/// Inclusive numeric range, either end may be open
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NumericRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Validated, request-scoped filter
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterCriteria {
    pub date_range: Option<DateRange>,
    pub region: Option<GeoConstraint>,
    pub actors: Option<ActorFilter>,
    /// Exact event codes, any of which may match
    pub type_codes: Vec<String>,
    /// Base types (code prefixes), any of which may match
    pub base_types: Vec<String>,
    pub tone: Option<NumericRange>,
    pub goldstein: Option<NumericRange>,
    pub limit: Option<u64>,
}

impl FilterCriteria {
    /// True when no field constrains the result set
    pub fn is_unconstrained(&self) -> bool {
        self.date_range.is_none()
            && self.region.is_none()
            && self.actors.is_none()
            && self.type_codes.is_empty()
            && self.base_types.is_empty()
            && self.tone.is_none()
            && self.goldstein.is_none()
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_actors(mut self, names: Vec<String>, mode: ActorMatch) -> Self {
        self.actors = Some(ActorFilter { names, mode });
        self
    }

    pub fn with_type_codes(mut self, codes: Vec<String>) -> Self {
        self.type_codes = codes;
        self
    }
}

/// Parses raw request parameters into [`FilterCriteria`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterCompiler;

impl FilterCompiler {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self, raw), fields(params = raw.len()))]
    pub fn compile(&self, raw: &RawParams) -> Result<FilterCriteria> {
        let reader = ParamReader { raw };

        let limit = reader.last(params::LIMIT).map(parse_limit).transpose()?;
        let date_range = compile_date_range(&reader)?;
        let region = compile_region(&reader)?;
        let actors = compile_actors(&reader)?;
        let type_codes = reader.values(params::TYPE);
        let base_types = reader.values(params::BASE_TYPE);
        let tone = compile_numeric_range(&reader, params::TONE_MIN, params::TONE_MAX)?;
        let goldstein =
            compile_numeric_range(&reader, params::GOLDSTEIN_LOW, params::GOLDSTEIN_HIGH)?;

        let criteria = FilterCriteria {
            date_range,
            region,
            actors,
            type_codes,
            base_types,
            tone,
            goldstein,
            limit,
        };
        debug!(?criteria, "Compiled filter criteria");
        Ok(criteria)
    }
}

/// Lookup over the raw parameter list honouring aliases
struct ParamReader<'a> {
    raw: &'a RawParams,
}

impl<'a> ParamReader<'a> {
    /// The last non-empty value given under any of `names`, with the name used
    fn last(&self, names: &[&str]) -> Option<(&'a str, &'a str)> {
        self.raw
            .iter()
            .rev()
            .filter(|(key, _)| names.contains(&key.as_str()))
            .map(|(key, value)| (key.as_str(), value.trim()))
            .find(|(_, value)| !value.is_empty())
    }

    /// Every value under `names`, splitting comma-joined lists
    fn values(&self, names: &[&str]) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for (_, value) in self
            .raw
            .iter()
            .filter(|(key, _)| names.contains(&key.as_str()))
        {
            for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                if !out.iter().any(|existing| existing == part) {
                    out.push(part.to_string());
                }
            }
        }
        out
    }
}

fn parse_limit((name, value): (&str, &str)) -> Result<u64> {
    match value.parse::<u64>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(NewsEventError::invalid(
            name,
            value,
            "expected a positive integer",
        )),
    }
}

fn parse_date((name, value): (&str, &str)) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| NewsEventError::invalid(name, value, "expected a date as YYYY-MM-DD"))
}

fn parse_number((name, value): (&str, &str)) -> Result<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| NewsEventError::invalid(name, value, "expected a number"))
}

fn check_latitude(name: &str, lat: f64) -> Result<f64> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(lat)
    } else {
        Err(NewsEventError::invalid(
            name,
            lat.to_string(),
            "latitude must be within [-90, 90]",
        ))
    }
}

fn check_longitude(name: &str, lon: f64) -> Result<f64> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(lon)
    } else {
        Err(NewsEventError::invalid(
            name,
            lon.to_string(),
            "longitude must be within [-180, 180]",
        ))
    }
}

fn compile_date_range(reader: &ParamReader<'_>) -> Result<Option<DateRange>> {
    let from = reader.last(params::FROM).map(parse_date).transpose()?;
    let to = reader.last(params::TO).map(parse_date).transpose()?;

    match (from, to) {
        (None, None) => Ok(None),
        (Some(from), Some(to)) if from > to => Err(NewsEventError::invalid(
            "from",
            from.to_string(),
            format!("start date is after end date {}", to),
        )),
        (from, to) => Ok(Some(DateRange { from, to })),
    }
}

fn compile_region(reader: &ParamReader<'_>) -> Result<Option<GeoConstraint>> {
    let target = match reader.last(params::GEO_TARGET) {
        Some((name, value)) => value.parse::<GeoTarget>().map_err(|_| {
            NewsEventError::invalid(name, value, "expected 'event' or 'actor'")
        })?,
        None => GeoTarget::default(),
    };

    let lat = reader.last(params::LATITUDE);
    let lon = reader.last(params::LONGITUDE);
    let radius = reader.last(params::RADIUS);
    let bbox = reader.last(params::BBOX);

    let circle = match (lat, lon, radius) {
        (None, None, None) => None,
        (Some(lat), Some(lon), Some(radius)) => {
            let latitude = check_latitude(lat.0, parse_number(lat)?)?;
            let longitude = check_longitude(lon.0, parse_number(lon)?)?;
            let radius_km = parse_number(radius)?;
            if radius_km <= 0.0 {
                return Err(NewsEventError::invalid(
                    radius.0,
                    radius.1,
                    "radius must be a positive number of kilometres",
                ));
            }
            Some(GeoShape::Circle {
                center: GeoPoint::new(longitude, latitude),
                radius_km,
            })
        }
        (lat, lon, radius) => {
            let (name, value) = lat.or(lon).or(radius).unwrap_or(("radius", ""));
            return Err(NewsEventError::invalid(
                name,
                value,
                "lat, lon and radius must be given together",
            ));
        }
    };

    let rect = bbox.map(parse_bbox).transpose()?.map(GeoShape::Box);

    let shape = match (circle, rect) {
        (Some(_), Some(_)) => {
            let (name, value) = bbox.unwrap_or(("bbox", ""));
            return Err(NewsEventError::invalid(
                name,
                value,
                "bbox cannot be combined with lat/lon/radius",
            ));
        }
        (Some(shape), None) | (None, Some(shape)) => shape,
        (None, None) => return Ok(None),
    };

    Ok(Some(GeoConstraint { target, shape }))
}

fn parse_bbox((name, value): (&str, &str)) -> Result<BoundingBox> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    let [west, south, east, north] = parts.as_slice() else {
        return Err(NewsEventError::invalid(
            name,
            value,
            "expected west,south,east,north",
        ));
    };

    let number = |part: &str| parse_number((name, part));
    let west = check_longitude(name, number(*west)?)?;
    let south = check_latitude(name, number(*south)?)?;
    let east = check_longitude(name, number(*east)?)?;
    let north = check_latitude(name, number(*north)?)?;

    if west >= east || south >= north {
        return Err(NewsEventError::invalid(
            name,
            value,
            "west must be less than east and south less than north",
        ));
    }

    Ok(BoundingBox {
        west,
        south,
        east,
        north,
    })
}

fn compile_actors(reader: &ParamReader<'_>) -> Result<Option<ActorFilter>> {
    let mode = match reader.last(params::ACTOR_MATCH) {
        Some((name, value)) => value.parse::<ActorMatch>().map_err(|_| {
            NewsEventError::invalid(name, value, "expected 'exact' or 'contains'")
        })?,
        None => ActorMatch::default(),
    };

    let names = reader.values(params::ACTOR);
    if names.is_empty() {
        return Ok(None);
    }
    Ok(Some(ActorFilter { names, mode }))
}

fn compile_numeric_range(
    reader: &ParamReader<'_>,
    min_names: &[&str],
    max_names: &[&str],
) -> Result<Option<NumericRange>> {
    let min = reader.last(min_names).map(parse_number).transpose()?;
    let max = reader.last(max_names).map(parse_number).transpose()?;

    match (min, max) {
        (None, None) => Ok(None),
        (Some(min), Some(max)) if min > max => Err(NewsEventError::invalid(
            min_names[0],
            min.to_string(),
            format!("lower bound exceeds upper bound {}", max),
        )),
        (min, max) => Ok(Some(NumericRange { min, max })),
    }
}

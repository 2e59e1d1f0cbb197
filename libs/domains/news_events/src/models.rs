//! News event domain models

use chrono::{NaiveDate, TimeZone, Utc};
use mongodb::bson::{self, Bson, Document, doc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Field names of the event collection.
pub mod fields {
    pub const ID: &str = "GLOBALEVENTID";
    pub const DATE: &str = "Date";
    pub const LOCATION: &str = "Location";
    pub const TYPE: &str = "Type";
    pub const ACTORS: &str = "Actors";
    pub const ACTOR_NAME: &str = "Actors.Name";
    pub const ACTOR_LOCATION: &str = "Actors.Location";
    pub const ACTOR_TYPE: &str = "Actors.Type";
    pub const COUNTRY: &str = "Country";
    pub const COUNTRY_CODE: &str = "Country_Code";
    pub const REGION: &str = "Region";
    pub const CITY: &str = "City";
    pub const AVG_TONE: &str = "AvgTone";
    pub const GOLDSTEIN_SCALE: &str = "GoldsteinScale";

    // Output fields produced by grouping and enrichment
    pub const GROUP_KEY: &str = "_id";
    pub const GROUP_ID: &str = "Group_ID";
    pub const COUNT: &str = "Count";
    pub const ACTOR: &str = "Actor";
    pub const EVENTS: &str = "Events";
    pub const TYPE_NAME: &str = "Type_Name";
    pub const BASE_TYPE: &str = "BaseType";
    pub const BASE_TYPE_NAME: &str = "BaseType_Name";
}

/// GeoJSON point, coordinates are `[longitude, latitude]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    #[schema(example = "Point")]
    pub kind: GeoPointKind,
    #[schema(value_type = Vec<f64>)]
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum GeoPointKind {
    Point,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: GeoPointKind::Point,
            coordinates: [longitude, latitude],
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }

    /// Read a GeoJSON point out of a BSON value, if it is one
    pub fn from_bson(value: &Bson) -> Option<Self> {
        let doc = value.as_document()?;
        if doc.get_str("type").ok()? != "Point" {
            return None;
        }
        let coordinates = doc.get_array("coordinates").ok()?;
        let lon = coordinates.first().and_then(bson_as_f64)?;
        let lat = coordinates.get(1).and_then(bson_as_f64)?;
        Some(Self::new(lon, lat))
    }

    fn to_bson(self) -> Bson {
        Bson::Document(doc! {
            "type": "Point",
            "coordinates": [self.longitude(), self.latitude()],
        })
    }
}

/// An actor taking part in an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Actor {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Location", skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,

    #[serde(rename = "Type", skip_serializing_if = "Option::is_none")]
    pub actor_type: Option<String>,
}

impl Actor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
            actor_type: None,
        }
    }

    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_type(mut self, actor_type: impl Into<String>) -> Self {
        self.actor_type = Some(actor_type.into());
        self
    }

    fn to_document(&self) -> Document {
        let mut doc = doc! { "Name": self.name.as_str() };
        doc.insert(
            "Location",
            self.location.map(GeoPoint::to_bson).unwrap_or(Bson::Null),
        );
        doc.insert(
            "Type",
            self.actor_type.clone().map(Bson::String).unwrap_or(Bson::Null),
        );
        doc
    }
}

/// A stored news event as documented in the API.
///
/// The query endpoints return store documents as-is, so fields beyond these
/// (tone, mentions, media, ...) pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Event {
    #[serde(rename = "GLOBALEVENTID")]
    pub id: String,

    /// Calendar date of the event
    #[serde(rename = "Date")]
    pub date: NaiveDate,

    #[serde(rename = "Location", skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,

    /// CAMEO event code
    #[serde(rename = "Type", skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,

    #[serde(rename = "Actors", default)]
    pub actors: Vec<Actor>,

    #[serde(rename = "Country", skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(rename = "Country_Code", skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,

    #[serde(rename = "Region", skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(rename = "City", skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(rename = "AvgTone", skip_serializing_if = "Option::is_none")]
    pub avg_tone: Option<f64>,

    #[serde(rename = "GoldsteinScale", skip_serializing_if = "Option::is_none")]
    pub goldstein_scale: Option<f64>,
}

impl Event {
    pub fn new(id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            date,
            location: None,
            event_type: None,
            actors: Vec::new(),
            country: None,
            country_code: None,
            region: None,
            city: None,
            avg_tone: None,
            goldstein_scale: None,
        }
    }

    /// Builder: set the CAMEO event code
    pub fn with_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Builder: set the event location
    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }

    /// Builder: append an actor
    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actors.push(actor);
        self
    }

    /// Builder: set the place hierarchy
    pub fn with_place(
        mut self,
        country: impl Into<String>,
        region: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        self.country = Some(country.into());
        self.region = Some(region.into());
        self.city = Some(city.into());
        self
    }

    /// Builder: set tone and Goldstein scale
    pub fn with_scores(mut self, avg_tone: f64, goldstein_scale: f64) -> Self {
        self.avg_tone = Some(avg_tone);
        self.goldstein_scale = Some(goldstein_scale);
        self
    }

    /// Render the event in the collection's document layout
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(fields::ID, self.id.as_str());
        doc.insert(fields::DATE, Bson::DateTime(date_to_bson(self.date)));
        if let Some(location) = self.location {
            doc.insert(fields::LOCATION, location.to_bson());
        }
        if let Some(event_type) = &self.event_type {
            doc.insert(fields::TYPE, event_type.as_str());
        }
        let actors: Vec<Bson> = self
            .actors
            .iter()
            .map(|a| Bson::Document(a.to_document()))
            .collect();
        doc.insert(fields::ACTORS, actors);
        let optional = [
            (fields::COUNTRY, &self.country),
            (fields::COUNTRY_CODE, &self.country_code),
            (fields::REGION, &self.region),
            (fields::CITY, &self.city),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                doc.insert(key, value.as_str());
            }
        }
        if let Some(tone) = self.avg_tone {
            doc.insert(fields::AVG_TONE, tone);
        }
        if let Some(goldstein) = self.goldstein_scale {
            doc.insert(fields::GOLDSTEIN_SCALE, goldstein);
        }
        doc
    }
}

/// Midnight UTC of a calendar date as a BSON datetime
pub fn date_to_bson(date: NaiveDate) -> bson::DateTime {
    let midnight = Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN));
    bson::DateTime::from_millis(midnight.timestamp_millis())
}

/// One aggregation output row.
///
/// `key` is the grouping value, `count` the number of grouped source rows and
/// `fields` the representative (`first`/`push`) values captured alongside.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupResult {
    pub key: Bson,
    pub count: i64,
    pub fields: Document,
    pub type_name: Option<String>,
    pub base_type: Option<String>,
    pub base_type_name: Option<String>,
}

impl GroupResult {
    pub fn new(key: impl Into<Bson>, count: i64) -> Self {
        Self {
            key: key.into(),
            count,
            fields: Document::new(),
            type_name: None,
            base_type: None,
            base_type_name: None,
        }
    }

    /// Builder: add a representative field
    pub fn with_field(mut self, name: &str, value: impl Into<Bson>) -> Self {
        self.fields.insert(name, value);
        self
    }

    /// Split a grouped store document into key, count and representative fields
    pub fn from_document(mut doc: Document) -> Self {
        let key = doc.remove(fields::GROUP_KEY).unwrap_or(Bson::Null);
        let count = doc
            .remove(fields::COUNT)
            .as_ref()
            .and_then(bson_as_f64)
            .map(|c| c as i64)
            .unwrap_or(0);
        Self {
            key,
            count,
            fields: doc,
            type_name: None,
            base_type: None,
            base_type_name: None,
        }
    }

    /// The fine-grained event code carried by this row, if any
    pub fn type_code(&self) -> Option<&str> {
        self.fields.get_str(fields::TYPE).ok()
    }

    /// JSON representation used in API responses
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert(fields::GROUP_ID.to_string(), bson_to_json(&self.key));
        map.insert(fields::COUNT.to_string(), serde_json::json!(self.count));
        for (name, value) in &self.fields {
            map.insert(name.clone(), bson_to_json(value));
        }
        let enrichment = [
            (fields::TYPE_NAME, &self.type_name),
            (fields::BASE_TYPE, &self.base_type),
            (fields::BASE_TYPE_NAME, &self.base_type_name),
        ];
        for (name, value) in enrichment {
            if let Some(value) = value {
                map.insert(name.to_string(), serde_json::json!(value));
            }
        }
        serde_json::Value::Object(map)
    }
}

/// Standard `{"results": [...]}` response envelope
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResultsResponse {
    #[schema(value_type = Vec<Object>)]
    pub results: Vec<serde_json::Value>,
}

impl ResultsResponse {
    pub fn new(results: Vec<serde_json::Value>) -> Self {
        Self { results }
    }
}

/// Numeric view of a BSON value
pub fn bson_as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(v) => Some(*v),
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        _ => None,
    }
}

/// Convert a store value to plain JSON.
///
/// Datetimes become RFC 3339 strings and ObjectIds hex strings; everything
/// else uses relaxed extended JSON.
pub fn bson_to_json(value: &Bson) -> serde_json::Value {
    match value {
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(s) => serde_json::Value::String(s),
            Err(_) => serde_json::json!(dt.timestamp_millis()),
        },
        Bson::ObjectId(oid) => serde_json::Value::String(oid.to_hex()),
        Bson::Document(doc) => document_to_json(doc),
        Bson::Array(items) => serde_json::Value::Array(items.iter().map(bson_to_json).collect()),
        other => other.clone().into_relaxed_extjson(),
    }
}

pub fn document_to_json(doc: &Document) -> serde_json::Value {
    serde_json::Value::Object(
        doc.iter()
            .map(|(k, v)| (k.clone(), bson_to_json(v)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_to_document_layout() {
        let event = Event::new("1001", NaiveDate::from_ymd_opt(2024, 4, 8).unwrap())
            .with_type("1921")
            .with_location(GeoPoint::new(13.4, 52.5))
            .with_actor(Actor::new("GERMANY").with_type("GOV"));

        let doc = event.to_document();
        assert_eq!(doc.get_str(fields::ID).unwrap(), "1001");
        assert_eq!(doc.get_str(fields::TYPE).unwrap(), "1921");
        assert!(doc.get_datetime(fields::DATE).is_ok());
        let actors = doc.get_array(fields::ACTORS).unwrap();
        assert_eq!(actors.len(), 1);
        let location = GeoPoint::from_bson(doc.get(fields::LOCATION).unwrap()).unwrap();
        assert_eq!(location.longitude(), 13.4);
        assert_eq!(location.latitude(), 52.5);
    }

    #[test]
    fn test_group_result_from_document() {
        let row = GroupResult::from_document(doc! { "_id": "192", "Count": 2, "Type": "192" });
        assert_eq!(row.key, Bson::String("192".into()));
        assert_eq!(row.count, 2);
        assert_eq!(row.type_code(), Some("192"));
        assert!(row.fields.get(fields::COUNT).is_none());
    }

    #[test]
    fn test_group_result_json_omits_missing_enrichment() {
        let mut row = GroupResult::new("20", 1).with_field(fields::TYPE, "20");
        row.base_type = Some("20".to_string());

        let json = row.to_json();
        assert_eq!(json["Group_ID"], "20");
        assert_eq!(json["Count"], 1);
        assert_eq!(json["BaseType"], "20");
        assert!(json.get("Type_Name").is_none());
    }

    #[test]
    fn test_bson_datetime_renders_as_rfc3339() {
        let date = date_to_bson(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        let json = bson_to_json(&Bson::DateTime(date));
        assert_eq!(json, serde_json::json!("2024-05-01T00:00:00Z"));
    }
}

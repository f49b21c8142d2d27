use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geometry::LatLng;

/// Marker kinds the point builder produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    Technician,
    Polygon,
    Circle,
}

/// Uniform point used as clustering input. Created fresh on every recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MapPoint {
    pub id: String,
    pub lng: f64,
    pub lat: f64,
    pub properties: Map<String, Value>,
}

impl MapPoint {
    pub fn new<S: Into<String>>(id: S, location: LatLng) -> Self {
        Self {
            id: id.into(),
            lng: location.lng,
            lat: location.lat,
            properties: Map::new(),
        }
    }

    pub fn with_property<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn location(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    pub fn kind(&self) -> Option<PointKind> {
        self.properties
            .get("kind")
            .cloned()
            .and_then(|kind| serde_json::from_value(kind).ok())
    }
}

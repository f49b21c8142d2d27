//! Backend wire format.
//!
//! Geometry on the wire is GeoJSON-like and orders coordinates `[lng, lat]`.
//! Everything in this crate outside of this module uses [`LatLng`], so this
//! is the only place where coordinates are flipped.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::Id;

use crate::{
    area::CoverageArea,
    geometry::{AreaType, LatLng, ShapeGeometry},
    shape::{CoverageShape, PriorityLevel},
    technician::Technician,
    ModelError, WithId,
};

/// `{ "data": ... }`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Envelope<T> {
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// `{ "results": [...] }`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Results<T> {
    pub results: Vec<T>,
}

/// The shape every list endpoint answers with: `{ "data": { "results": [...] } }`.
pub type ResultsEnvelope<T> = Envelope<Results<T>>;

impl<T> Envelope<Results<T>> {
    pub fn results(results: Vec<T>) -> Self {
        Envelope::new(Results { results })
    }

    pub fn into_results(self) -> Vec<T> {
        self.data.results
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum WireGeometry {
    /// Rings of `[lng, lat]` pairs, the first ring is the outer boundary.
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    /// Circle center as `[lng, lat]`, the radius travels next to the geometry.
    Point { coordinates: [f64; 2] },
}

impl WireGeometry {
    fn kind(&self) -> &'static str {
        match self {
            Self::Polygon { .. } => "Polygon",
            Self::Point { .. } => "Point",
        }
    }
}

fn from_lng_lat([lng, lat]: [f64; 2]) -> LatLng {
    LatLng::new(lat, lng)
}

fn to_lng_lat(point: &LatLng) -> [f64; 2] {
    [point.lng, point.lat]
}

/// A ring in wire order, closed by repeating the first vertex.
fn closed_ring(ring: &[LatLng]) -> Vec<[f64; 2]> {
    let mut coordinates = ring.iter().map(to_lng_lat).collect::<Vec<_>>();
    if let Some(first) = coordinates.first().copied() {
        coordinates.push(first);
    }
    coordinates
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ShapeProperties {
    #[serde(default)]
    pub service_types: Vec<String>,
}

fn default_active() -> bool {
    true
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShapeRecord {
    pub name: String,
    pub description: Option<String>,
    pub area_type: AreaType,
    pub geometry: WireGeometry,
    /// Circle radius in meters.
    pub radius: Option<f64>,
    pub color: Option<String>,
    pub priority_level: Option<PriorityLevel>,
    pub technician: Option<Id<Technician>>,
    #[serde(default)]
    pub properties: ShapeProperties,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<ShapeRecord> for CoverageShape {
    type Error = ModelError;

    fn try_from(record: ShapeRecord) -> Result<Self, Self::Error> {
        let geometry = match (record.area_type, record.geometry) {
            (AreaType::Polygon, WireGeometry::Polygon { coordinates }) => {
                let outer = coordinates.into_iter().next().unwrap_or_default();
                ShapeGeometry::polygon(outer.into_iter().map(from_lng_lat).collect())?
            }
            (AreaType::Circle, WireGeometry::Point { coordinates }) => {
                let radius = record.radius.ok_or(ModelError::MissingRadius)?;
                ShapeGeometry::circle(from_lng_lat(coordinates), radius)?
            }
            (area_type, geometry) => {
                return Err(ModelError::GeometryMismatch {
                    area_type: area_type.to_string(),
                    geometry: geometry.kind().to_owned(),
                })
            }
        };
        Ok(CoverageShape {
            name: record.name,
            description: record.description,
            geometry,
            color: record.color,
            priority_level: record.priority_level,
            technician: record.technician,
            service_types: record.properties.service_types,
            is_active: record.is_active,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

impl From<CoverageShape> for ShapeRecord {
    fn from(shape: CoverageShape) -> Self {
        let area_type = shape.area_type();
        let (geometry, radius) = match &shape.geometry {
            ShapeGeometry::Polygon { ring } => (
                WireGeometry::Polygon {
                    coordinates: vec![closed_ring(ring)],
                },
                None,
            ),
            ShapeGeometry::Circle { center, radius_m } => (
                WireGeometry::Point {
                    coordinates: to_lng_lat(center),
                },
                Some(*radius_m),
            ),
        };
        ShapeRecord {
            name: shape.name,
            description: shape.description,
            area_type,
            geometry,
            radius,
            color: shape.color,
            priority_level: shape.priority_level,
            technician: shape.technician,
            properties: ShapeProperties {
                service_types: shape.service_types,
            },
            is_active: shape.is_active,
            created_at: shape.created_at,
            updated_at: shape.updated_at,
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AreaRecord {
    pub name: String,
    pub description: Option<String>,
    pub technician: Option<Id<Technician>>,
    /// Outer ring as `[lng, lat]` pairs.
    pub coordinates: Vec<[f64; 2]>,
    #[serde(default)]
    pub service_types: Vec<String>,
    pub priority_level: Option<PriorityLevel>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl TryFrom<AreaRecord> for CoverageArea {
    type Error = ModelError;

    fn try_from(record: AreaRecord) -> Result<Self, Self::Error> {
        let geometry =
            ShapeGeometry::polygon(record.coordinates.into_iter().map(from_lng_lat).collect())?;
        let ring = geometry.ring().map(<[LatLng]>::to_vec).unwrap_or_default();
        Ok(CoverageArea {
            name: record.name,
            description: record.description,
            technician: record.technician,
            ring,
            service_types: record.service_types,
            priority_level: record.priority_level,
            is_active: record.is_active,
        })
    }
}

impl From<CoverageArea> for AreaRecord {
    fn from(area: CoverageArea) -> Self {
        AreaRecord {
            name: area.name,
            description: area.description,
            technician: area.technician,
            coordinates: closed_ring(&area.ring),
            service_types: area.service_types,
            priority_level: area.priority_level,
            is_active: area.is_active,
        }
    }
}

/// Initial data set for a backend, every list in wire format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedDocument {
    #[serde(default)]
    pub technicians: Vec<WithId<Technician>>,
    #[serde(default)]
    pub coverage_shapes: Vec<WithId<CoverageShape>>,
    #[serde(default)]
    pub coverage_areas: Vec<WithId<CoverageArea>>,
}

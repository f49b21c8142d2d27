use std::{fmt, str::FromStr};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::geo;

use crate::ModelError;

/// A coordinate in the order used everywhere inside the workspace.
/// The wire format orders coordinates `[lng, lat]`, see [`crate::wire`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        geo::is_valid_coordinate(self.lat, self.lng)
    }

    pub fn validated(self) -> Result<Self, ModelError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(ModelError::InvalidCoordinate {
                lat: self.lat,
                lng: self.lng,
            })
        }
    }

    /// `[lat, lng]`, the order the map renderer expects.
    pub fn to_lat_lng(self) -> [f64; 2] {
        [self.lat, self.lng]
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AreaType {
    Polygon,
    Circle,
}

impl AreaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Polygon => "polygon",
            Self::Circle => "circle",
        }
    }
}

impl fmt::Display for AreaType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AreaType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "polygon" => Ok(Self::Polygon),
            "circle" => Ok(Self::Circle),
            other => Err(ModelError::InvalidAreaType(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Bounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl Bounds {
    pub fn around(points: &[LatLng]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Self {
            south_west: *first,
            north_east: *first,
        };
        for point in &points[1..] {
            bounds.south_west.lat = bounds.south_west.lat.min(point.lat);
            bounds.south_west.lng = bounds.south_west.lng.min(point.lng);
            bounds.north_east.lat = bounds.north_east.lat.max(point.lat);
            bounds.north_east.lng = bounds.north_east.lng.max(point.lng);
        }
        Some(bounds)
    }
}

/// Geometry of a coverage shape. Exactly one variant per shape, so a shape
/// can never carry polygon and circle data at the same time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "area_type", rename_all = "snake_case")]
pub enum ShapeGeometry {
    /// Open ring, the closing vertex is not repeated.
    Polygon { ring: Vec<LatLng> },
    Circle { center: LatLng, radius_m: f64 },
}

impl ShapeGeometry {
    pub fn polygon(ring: Vec<LatLng>) -> Result<Self, ModelError> {
        let mut ring = ring
            .into_iter()
            .map(LatLng::validated)
            .collect::<Result<Vec<_>, _>>()?;
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        if ring.len() < 3 {
            return Err(ModelError::TooFewVertices(ring.len()));
        }
        Ok(Self::Polygon { ring })
    }

    pub fn circle(center: LatLng, radius_m: f64) -> Result<Self, ModelError> {
        if !radius_m.is_finite() || radius_m <= 0.0 {
            return Err(ModelError::InvalidRadius(radius_m));
        }
        Ok(Self::Circle {
            center: center.validated()?,
            radius_m,
        })
    }

    pub fn area_type(&self) -> AreaType {
        match self {
            Self::Polygon { .. } => AreaType::Polygon,
            Self::Circle { .. } => AreaType::Circle,
        }
    }

    pub fn ring(&self) -> Option<&[LatLng]> {
        match self {
            Self::Polygon { ring } => Some(ring),
            Self::Circle { .. } => None,
        }
    }

    /// Unweighted average of the ring vertices for polygons, the center for
    /// circles.
    pub fn centroid(&self) -> Option<LatLng> {
        match self {
            Self::Polygon { ring } => polygon_centroid(ring),
            Self::Circle { center, .. } => Some(*center),
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        match self {
            Self::Polygon { ring } => Bounds::around(ring),
            Self::Circle { center, radius_m } => {
                let ((min_lat, min_lng), (max_lat, max_lng)) =
                    geo::calculate_bounding_box(
                        center.lat,
                        center.lng,
                        radius_m / 1000.0,
                    );
                Some(Bounds {
                    south_west: LatLng::new(min_lat, min_lng),
                    north_east: LatLng::new(max_lat, max_lng),
                })
            }
        }
    }
}

pub fn polygon_centroid(ring: &[LatLng]) -> Option<LatLng> {
    if ring.is_empty() {
        return None;
    }
    let count = ring.len() as f64;
    let (lat_sum, lng_sum) = ring
        .iter()
        .fold((0.0, 0.0), |(lat, lng), point| (lat + point.lat, lng + point.lng));
    Some(LatLng::new(lat_sum / count, lng_sum / count))
}

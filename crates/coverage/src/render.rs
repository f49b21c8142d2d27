//! What the map draws, in the coordinate order of the map library.

use clustering::{BoundingBox, ClusterFeature};
use model::{
    geometry::{AreaType, ShapeGeometry},
    shape::PriorityLevel,
    source::{ShapeKey, SourcedShape},
};
use serde::Serialize;

use crate::{drawing::DrawingState, format::FormattingConfig, map::LoadState};

/// A shape outline. Coordinates are `[lat, lng]`.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeOverlay {
    pub key: ShapeKey,
    pub name: String,
    pub label: String,
    pub area_type: AreaType,
    pub color: String,
    pub priority_level: Option<PriorityLevel>,
    pub is_active: bool,
    /// Polygon ring, open.
    pub positions: Option<Vec<[f64; 2]>>,
    pub center: Option<[f64; 2]>,
    pub radius_m: Option<f64>,
    /// `[south_west, north_east]`, for fitting the map to the shape.
    pub bounds: Option<[[f64; 2]; 2]>,
}

impl ShapeOverlay {
    pub fn new(sourced: &SourcedShape, formatting: &FormattingConfig) -> Self {
        let shape = &sourced.shape;
        let (positions, center, radius_m) = match &shape.geometry {
            ShapeGeometry::Polygon { ring } => (
                Some(ring.iter().map(|point| point.to_lat_lng()).collect()),
                None,
                None,
            ),
            ShapeGeometry::Circle { center, radius_m } => {
                (None, Some(center.to_lat_lng()), Some(*radius_m))
            }
        };
        Self {
            key: sourced.key,
            name: shape.name.clone(),
            label: formatting.shape_label(shape),
            area_type: shape.area_type(),
            color: shape.display_color().to_owned(),
            priority_level: shape.priority_level,
            is_active: shape.is_active,
            positions,
            center,
            radius_m,
            bounds: shape
                .geometry
                .bounds()
                .map(|bounds| {
                    [
                        bounds.south_west.to_lat_lng(),
                        bounds.north_east.to_lat_lng(),
                    ]
                }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewportRender {
    pub bbox: BoundingBox,
    pub zoom: u8,
}

/// Everything needed to draw one frame of the coverage map.
#[derive(Debug, Clone, Serialize)]
pub struct MapRender {
    pub viewport: ViewportRender,
    pub load_state: LoadState,
    /// Query string reproducing the active filter.
    pub filter: String,
    pub shapes: Vec<ShapeOverlay>,
    pub clustered: bool,
    pub markers: Vec<ClusterFeature>,
    pub drawing: DrawingState,
}

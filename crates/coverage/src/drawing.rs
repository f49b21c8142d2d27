//! Interactive shape drawing.
//!
//! `Idle -> DrawingPolygon | DrawingCircle -> Idle`. Map clicks feed the
//! active mode, `finish` hands out a [`ShapeDraft`] and `cancel` throws the
//! current drawing away. Single vertices can not be undone.

use std::{error, fmt};

use itertools::Itertools;
use model::{
    geometry::{LatLng, ShapeGeometry},
    shape::{CoverageShape, PriorityLevel},
    technician::Technician,
    ModelError,
};
use serde::{Deserialize, Serialize};
use utility::id::Id;

pub const DEFAULT_CIRCLE_RADIUS_M: f64 = 500.0;
pub const MIN_POLYGON_VERTICES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawingError {
    AlreadyDrawing,
    NotDrawing,
    TooFewVertices(usize),
    MissingCenter,
    InvalidRadius(f64),
    Geometry(ModelError),
}

impl error::Error for DrawingError {}

impl fmt::Display for DrawingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::AlreadyDrawing => write!(f, "a shape is already being drawn"),
            Self::NotDrawing => write!(f, "no shape is being drawn"),
            Self::TooFewVertices(count) => write!(
                f,
                "a polygon needs at least {} vertices, got {}",
                MIN_POLYGON_VERTICES, count
            ),
            Self::MissingCenter => write!(f, "click the map to place the circle center"),
            Self::InvalidRadius(radius) => write!(f, "invalid radius {}", radius),
            Self::Geometry(why) => write!(f, "{}", why),
        }
    }
}

impl From<ModelError> for DrawingError {
    fn from(value: ModelError) -> Self {
        Self::Geometry(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DrawingState {
    #[default]
    Idle,
    DrawingPolygon {
        vertices: Vec<LatLng>,
    },
    DrawingCircle {
        center: Option<LatLng>,
        radius_m: f64,
    },
}

/// Geometry of a finished drawing, not yet saved.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeDraft {
    Polygon { vertices: Vec<LatLng> },
    Circle { center: LatLng, radius_m: f64 },
}

/// What the shape form adds to a drawn geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeDetails {
    pub name: String,
    pub description: Option<String>,
    pub technician: Option<Id<Technician>>,
    pub priority_level: Option<PriorityLevel>,
    #[serde(default)]
    pub service_types: Vec<String>,
    pub color: Option<String>,
}

impl ShapeDraft {
    pub fn geometry(&self) -> Result<ShapeGeometry, ModelError> {
        match self {
            Self::Polygon { vertices } => ShapeGeometry::polygon(vertices.clone()),
            Self::Circle { center, radius_m } => ShapeGeometry::circle(*center, *radius_m),
        }
    }

    pub fn into_shape(self, details: ShapeDetails) -> Result<CoverageShape, ModelError> {
        let mut shape = CoverageShape::new(details.name.trim(), self.geometry()?);
        shape.description = details.description.filter(|text| !text.trim().is_empty());
        shape.technician = details.technician;
        shape.priority_level = details.priority_level;
        shape.color = details.color;
        shape.service_types = details
            .service_types
            .iter()
            .map(|service_type| service_type.trim().to_lowercase())
            .filter(|service_type| !service_type.is_empty())
            .unique()
            .collect();
        Ok(shape)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Drawing {
    state: DrawingState,
}

impl Drawing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DrawingState {
        &self.state
    }

    pub fn is_drawing(&self) -> bool {
        self.state != DrawingState::Idle
    }

    pub fn start_polygon(&mut self) -> Result<(), DrawingError> {
        self.start(DrawingState::DrawingPolygon { vertices: vec![] })
    }

    pub fn start_circle(&mut self) -> Result<(), DrawingError> {
        self.start(DrawingState::DrawingCircle {
            center: None,
            radius_m: DEFAULT_CIRCLE_RADIUS_M,
        })
    }

    fn start(&mut self, state: DrawingState) -> Result<(), DrawingError> {
        if self.is_drawing() {
            return Err(DrawingError::AlreadyDrawing);
        }
        self.state = state;
        Ok(())
    }

    /// Feeds a map click into the active mode. Circle mode moves the center
    /// on every click. Ignored while idle.
    pub fn click(&mut self, point: LatLng) {
        match &mut self.state {
            DrawingState::Idle => {}
            DrawingState::DrawingPolygon { vertices } => vertices.push(point),
            DrawingState::DrawingCircle { center, .. } => *center = Some(point),
        }
    }

    pub fn set_radius(&mut self, radius: f64) -> Result<(), DrawingError> {
        match &mut self.state {
            DrawingState::DrawingCircle { radius_m, .. } => {
                if !radius.is_finite() || radius <= 0.0 {
                    return Err(DrawingError::InvalidRadius(radius));
                }
                *radius_m = radius;
                Ok(())
            }
            _ => Err(DrawingError::NotDrawing),
        }
    }

    /// Ends the drawing. On error the state is left untouched, so the user
    /// can keep adding vertices.
    pub fn finish(&mut self) -> Result<ShapeDraft, DrawingError> {
        let draft = match &self.state {
            DrawingState::Idle => return Err(DrawingError::NotDrawing),
            DrawingState::DrawingPolygon { vertices } => {
                if vertices.len() < MIN_POLYGON_VERTICES {
                    return Err(DrawingError::TooFewVertices(vertices.len()));
                }
                ShapeDraft::Polygon {
                    vertices: vertices.clone(),
                }
            }
            DrawingState::DrawingCircle { center, radius_m } => ShapeDraft::Circle {
                center: center.ok_or(DrawingError::MissingCenter)?,
                radius_m: *radius_m,
            },
        };
        self.state = DrawingState::Idle;
        Ok(draft)
    }

    pub fn cancel(&mut self) {
        self.state = DrawingState::Idle;
    }
}

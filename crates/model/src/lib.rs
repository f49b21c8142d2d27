use std::{error, fmt, fmt::Debug};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use serde_with;
use utility::id::{HasId, Id};

pub mod area;
pub mod geometry;
pub mod point;
pub mod shape;
pub mod source;
pub mod summary;
pub mod technician;
pub mod wire;

pub trait ExampleData {
    fn example_data() -> Self;
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(bound(deserialize = "V: Deserialize<'de>, V::IdType: Deserialize<'de>"))]
pub struct WithId<V>
where
    V: HasId,
    V::IdType: Serialize + Debug + Clone,
{
    pub id: Id<V>,
    #[serde(flatten)]
    pub content: V,
}

impl<V> WithId<V>
where
    V: HasId,
    V::IdType: Serialize + Debug + Clone,
{
    pub fn new(id: Id<V>, content: V) -> Self {
        Self { id, content }
    }

    pub fn map<F>(self, f: F) -> Self
    where
        F: FnOnce(V) -> V,
    {
        Self::new(self.id, f(self.content))
    }
}

impl<V> ExampleData for WithId<V>
where
    V: HasId + ExampleData,
    V::IdType: Serialize + Debug + Clone + From<u8>,
{
    fn example_data() -> Self {
        Self::new(Id::new(1.into()), V::example_data())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    GeometryMismatch {
        area_type: String,
        geometry: String,
    },
    MissingRadius,
    InvalidRadius(f64),
    TooFewVertices(usize),
    InvalidCoordinate {
        lat: f64,
        lng: f64,
    },
    InvalidShapeKey(String),
    InvalidPriority(String),
    InvalidAreaType(String),
}

impl error::Error for ModelError {}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::GeometryMismatch {
                area_type,
                geometry,
            } => write!(
                f,
                "area type '{}' does not match geometry type '{}'",
                area_type, geometry
            ),
            Self::MissingRadius => write!(f, "circle shapes need a radius"),
            Self::InvalidRadius(radius) => {
                write!(f, "radius must be a positive number, got {}", radius)
            }
            Self::TooFewVertices(count) => write!(
                f,
                "polygons need at least 3 distinct vertices, got {}",
                count
            ),
            Self::InvalidCoordinate { lat, lng } => {
                write!(f, "invalid coordinate (lat {}, lng {})", lat, lng)
            }
            Self::InvalidShapeKey(key) => write!(f, "invalid shape key: {}", key),
            Self::InvalidPriority(value) => {
                write!(f, "invalid priority level: {}", value)
            }
            Self::InvalidAreaType(value) => write!(f, "invalid area type: {}", value),
        }
    }
}

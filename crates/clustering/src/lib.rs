use std::{error, fmt};

pub mod bbox;
pub mod feature;
pub mod index;
pub mod layer;
pub mod options;
pub mod points;

pub use bbox::BoundingBox;
pub use feature::ClusterFeature;
pub use index::ClusterIndex;
pub use layer::MarkerLayer;
pub use options::{ClusterOptions, ClusteringConfig};

#[derive(Debug, Clone, PartialEq)]
pub enum ClusterError {
    InvalidOptions(String),
    InvalidCoordinate { id: String },
    NoSuchCluster(usize),
    InvalidBoundingBox(String),
}

impl error::Error for ClusterError {}

impl fmt::Display for ClusterError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidOptions(why) => write!(f, "invalid cluster options: {}", why),
            Self::InvalidCoordinate { id } => {
                write!(f, "point '{}' has no usable coordinate", id)
            }
            Self::NoSuchCluster(id) => write!(f, "no cluster with id {}", id),
            Self::InvalidBoundingBox(value) => {
                write!(f, "invalid bounding box: {}", value)
            }
        }
    }
}

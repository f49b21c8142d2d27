use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use utility::{geo::wrap_longitude, serde::comma_separated};

use crate::ClusterError;

/// A viewport in WGS84 degrees, `[west, south, east, north]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub const WORLD: BoundingBox = BoundingBox::new(-180.0, -85.0, 180.0, 85.0);

    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }

    /// Whether a point lies inside the box. Boxes whose west edge lies east
    /// of their east edge wrap around the antimeridian.
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        if lat < self.south || lat > self.north {
            return false;
        }
        if self.east - self.west >= 360.0 {
            return true;
        }
        let west = wrap_longitude(self.west);
        let east = if self.east == 180.0 {
            180.0
        } else {
            wrap_longitude(self.east)
        };
        let lng = wrap_longitude(lng);
        if west <= east {
            lng >= west && lng <= east
        } else {
            lng >= west || lng <= east
        }
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([west, south, east, north]: [f64; 4]) -> Self {
        Self::new(west, south, east, north)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&comma_separated::join(&self.to_array()))
    }
}

impl FromStr for BoundingBox {
    type Err = ClusterError;

    /// Parses `west,south,east,north`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|value| value.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ClusterError::InvalidBoundingBox(s.to_owned()))?;
        match values.as_slice() {
            &[west, south, east, north]
                if values.iter().all(|value| value.is_finite()) && south <= north =>
            {
                Ok(Self::new(west, south, east, north))
            }
            _ => Err(ClusterError::InvalidBoundingBox(s.to_owned())),
        }
    }
}

impl Serialize for BoundingBox {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_array().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BoundingBox {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        <[f64; 4]>::deserialize(deserializer).map(Self::from)
    }
}

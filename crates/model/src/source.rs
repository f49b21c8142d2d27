use std::{fmt, str::FromStr};

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use utility::id::Id;

use crate::{area::CoverageArea, shape::CoverageShape, ModelError, WithId};

/// Which backend collection a displayed shape belongs to. Edits and deletes
/// are routed by this key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeKey {
    Legacy(Id<CoverageArea>),
    Shape(Id<CoverageShape>),
}

impl fmt::Display for ShapeKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Legacy(id) => write!(f, "legacy-{}", id),
            Self::Shape(id) => write!(f, "shape-{}", id),
        }
    }
}

impl FromStr for ShapeKey {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidShapeKey(s.to_owned());
        let (source, id) = s.trim().split_once('-').ok_or_else(invalid)?;
        match source {
            "legacy" => id.parse().map(Self::Legacy).map_err(|_| invalid()),
            "shape" => id.parse().map(Self::Shape).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl Serialize for ShapeKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ShapeKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

impl JsonSchema for ShapeKey {
    fn schema_name() -> String {
        "ShapeKey".to_owned()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(gen)
    }
}

/// A displayable shape together with the collection it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SourcedShape {
    pub key: ShapeKey,
    pub shape: CoverageShape,
}

impl SourcedShape {
    pub fn new(key: ShapeKey, shape: CoverageShape) -> Self {
        Self { key, shape }
    }
}

impl From<WithId<CoverageShape>> for SourcedShape {
    fn from(value: WithId<CoverageShape>) -> Self {
        Self::new(ShapeKey::Shape(value.id), value.content)
    }
}

impl From<&WithId<CoverageArea>> for SourcedShape {
    fn from(value: &WithId<CoverageArea>) -> Self {
        Self::new(ShapeKey::Legacy(value.id), value.content.to_shape())
    }
}

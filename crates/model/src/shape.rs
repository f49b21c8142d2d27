use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use schemars::{
    gen::SchemaGenerator,
    schema::{InstanceType, Schema, SchemaObject},
    JsonSchema,
};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use utility::id::{HasId, Id};

use crate::{
    geometry::{AreaType, LatLng, ShapeGeometry},
    technician::Technician,
    wire::ShapeRecord,
    ExampleData, ModelError,
};

pub const DEFAULT_SHAPE_COLOR: &str = "#3b82f6";

/// Urgency of a coverage shape. Travels as the bare integer 1, 2 or 3.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize_repr,
    Deserialize_repr,
)]
#[repr(u8)]
pub enum PriorityLevel {
    High = 1,
    Medium = 2,
    Low = 3,
}

impl PriorityLevel {
    pub const ALL: [PriorityLevel; 3] = [Self::High, Self::Medium, Self::Low];

    pub fn level(&self) -> u8 {
        *self as u8
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::High => "#dc2626",
            Self::Medium => "#f59e0b",
            Self::Low => "#16a34a",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl TryFrom<u8> for PriorityLevel {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::High),
            2 => Ok(Self::Medium),
            3 => Ok(Self::Low),
            other => Err(ModelError::InvalidPriority(other.to_string())),
        }
    }
}

impl FromStr for PriorityLevel {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "high" => Ok(Self::High),
            "2" | "medium" => Ok(Self::Medium),
            "3" | "low" => Ok(Self::Low),
            other => Err(ModelError::InvalidPriority(other.to_owned())),
        }
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

impl JsonSchema for PriorityLevel {
    fn schema_name() -> String {
        "PriorityLevel".to_owned()
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        SchemaObject {
            instance_type: Some(InstanceType::Integer.into()),
            enum_values: Some(
                Self::ALL
                    .iter()
                    .map(|level| serde_json::Value::from(level.level()))
                    .collect(),
            ),
            ..Default::default()
        }
        .into()
    }
}

/// A geographic area a technician covers. (De)serialized in the backend
/// wire format, see [`ShapeRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ShapeRecord", try_from = "ShapeRecord")]
pub struct CoverageShape {
    pub name: String,
    pub description: Option<String>,
    pub geometry: ShapeGeometry,
    pub color: Option<String>,
    pub priority_level: Option<PriorityLevel>,
    pub technician: Option<Id<Technician>>,
    pub service_types: Vec<String>,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CoverageShape {
    pub fn new<S: Into<String>>(name: S, geometry: ShapeGeometry) -> Self {
        Self {
            name: name.into(),
            description: None,
            geometry,
            color: None,
            priority_level: None,
            technician: None,
            service_types: vec![],
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn area_type(&self) -> AreaType {
        self.geometry.area_type()
    }

    /// Priority colors win over the stored color.
    pub fn display_color(&self) -> &str {
        match (&self.priority_level, &self.color) {
            (Some(level), _) => level.color(),
            (None, Some(color)) => color,
            (None, None) => DEFAULT_SHAPE_COLOR,
        }
    }

    pub fn has_service_type(&self, service_type: &str) -> bool {
        self.service_types
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(service_type.trim()))
    }
}

impl HasId for CoverageShape {
    type IdType = i64;
}

impl JsonSchema for CoverageShape {
    fn schema_name() -> String {
        "CoverageShape".to_owned()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        ShapeRecord::json_schema(gen)
    }
}

impl ExampleData for CoverageShape {
    fn example_data() -> Self {
        CoverageShape {
            name: "Downtown HVAC".to_owned(),
            description: Some("Same day service area".to_owned()),
            geometry: ShapeGeometry::Circle {
                center: LatLng::new(47.6097, -122.3331),
                radius_m: 1500.0,
            },
            color: None,
            priority_level: Some(PriorityLevel::High),
            technician: Some(Id::new(1)),
            service_types: vec!["hvac".to_owned(), "electrical".to_owned()],
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }
}

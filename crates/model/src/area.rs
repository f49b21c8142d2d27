use schemars::{gen::SchemaGenerator, schema::Schema, JsonSchema};
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{
    geometry::{LatLng, ShapeGeometry},
    shape::{CoverageShape, PriorityLevel},
    technician::Technician,
    wire::AreaRecord,
    ExampleData,
};

/// A coverage area from the older area endpoint. Always a polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "AreaRecord", try_from = "AreaRecord")]
pub struct CoverageArea {
    pub name: String,
    pub description: Option<String>,
    pub technician: Option<Id<Technician>>,
    pub ring: Vec<LatLng>,
    pub service_types: Vec<String>,
    pub priority_level: Option<PriorityLevel>,
    pub is_active: bool,
}

impl CoverageArea {
    /// The displayable form of this area. Areas share the shape pipeline
    /// (filtering, clustering, rendering) once converted.
    pub fn to_shape(&self) -> CoverageShape {
        CoverageShape {
            name: self.name.clone(),
            description: self.description.clone(),
            geometry: ShapeGeometry::Polygon {
                ring: self.ring.clone(),
            },
            color: None,
            priority_level: self.priority_level,
            technician: self.technician,
            service_types: self.service_types.clone(),
            is_active: self.is_active,
            created_at: None,
            updated_at: None,
        }
    }

    /// Writes the editable parts of a shape back into this area. Returns
    /// `None` if the shape is not a polygon, areas can not hold circles.
    pub fn updated_from(&self, shape: &CoverageShape) -> Option<Self> {
        let ring = shape.geometry.ring()?.to_vec();
        Some(Self {
            name: shape.name.clone(),
            description: shape.description.clone(),
            technician: shape.technician,
            ring,
            service_types: shape.service_types.clone(),
            priority_level: shape.priority_level,
            is_active: shape.is_active,
        })
    }
}

impl HasId for CoverageArea {
    type IdType = i64;
}

impl JsonSchema for CoverageArea {
    fn schema_name() -> String {
        "CoverageArea".to_owned()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        AreaRecord::json_schema(gen)
    }
}

impl ExampleData for CoverageArea {
    fn example_data() -> Self {
        CoverageArea {
            name: "North district".to_owned(),
            description: None,
            technician: Some(Id::new(1)),
            ring: vec![
                LatLng::new(47.70, -122.40),
                LatLng::new(47.70, -122.30),
                LatLng::new(47.65, -122.30),
                LatLng::new(47.65, -122.40),
            ],
            service_types: vec!["plumbing".to_owned()],
            priority_level: Some(PriorityLevel::Medium),
            is_active: true,
        }
    }
}

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    geometry::AreaType,
    shape::{CoverageShape, PriorityLevel},
    ExampleData,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PriorityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unset: usize,
}

/// Counts shown above the coverage map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ShapeSummary {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub polygons: usize,
    pub circles: usize,
    pub by_priority: PriorityCounts,
}

impl ShapeSummary {
    pub fn from_shapes<'a, I>(shapes: I) -> Self
    where
        I: IntoIterator<Item = &'a CoverageShape>,
    {
        shapes.into_iter().fold(Self::default(), |mut summary, shape| {
            summary.total += 1;
            if shape.is_active {
                summary.active += 1;
            } else {
                summary.inactive += 1;
            }
            match shape.area_type() {
                AreaType::Polygon => summary.polygons += 1,
                AreaType::Circle => summary.circles += 1,
            }
            match shape.priority_level {
                Some(PriorityLevel::High) => summary.by_priority.high += 1,
                Some(PriorityLevel::Medium) => summary.by_priority.medium += 1,
                Some(PriorityLevel::Low) => summary.by_priority.low += 1,
                None => summary.by_priority.unset += 1,
            }
            summary
        })
    }
}

impl ExampleData for ShapeSummary {
    fn example_data() -> Self {
        ShapeSummary {
            total: 3,
            active: 2,
            inactive: 1,
            polygons: 2,
            circles: 1,
            by_priority: PriorityCounts {
                high: 1,
                medium: 1,
                low: 0,
                unset: 1,
            },
        }
    }
}

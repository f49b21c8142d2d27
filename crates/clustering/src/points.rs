//! Turns technicians and coverage shapes into uniform clustering input.

use model::{
    geometry::{LatLng, ShapeGeometry},
    point::{MapPoint, PointKind},
    source::SourcedShape,
    technician::Technician,
    WithId,
};
use serde_json::Value;

/// One point per technician with a usable location, then one per polygon
/// centroid, then one per circle center. Entries without the geometry their
/// list implies are skipped.
pub fn build_points<'a, T, P, C>(technicians: T, polygons: P, circles: C) -> Vec<MapPoint>
where
    T: IntoIterator<Item = &'a WithId<Technician>>,
    P: IntoIterator<Item = &'a SourcedShape>,
    C: IntoIterator<Item = &'a SourcedShape>,
{
    let technician_points = technicians.into_iter().filter_map(technician_point);
    let polygon_points = polygons.into_iter().filter_map(|shape| match &shape.shape.geometry {
        ShapeGeometry::Polygon { .. } => shape_point(shape, PointKind::Polygon),
        ShapeGeometry::Circle { .. } => None,
    });
    let circle_points = circles.into_iter().filter_map(|shape| match &shape.shape.geometry {
        ShapeGeometry::Circle { .. } => shape_point(shape, PointKind::Circle),
        ShapeGeometry::Polygon { .. } => None,
    });

    technician_points
        .chain(polygon_points)
        .chain(circle_points)
        .collect()
}

/// Partitions shapes into polygons and circles, keeping their order.
pub fn split_shapes(shapes: &[SourcedShape]) -> (Vec<&SourcedShape>, Vec<&SourcedShape>) {
    shapes
        .iter()
        .partition(|shape| matches!(shape.shape.geometry, ShapeGeometry::Polygon { .. }))
}

fn technician_point(technician: &WithId<Technician>) -> Option<MapPoint> {
    let location = technician.content.valid_location()?;
    Some(
        MapPoint::new(format!("technician-{}", technician.id), location)
            .with_property("kind", kind_value(PointKind::Technician))
            .with_property("entity_id", technician.id.into_raw())
            .with_property("name", technician.content.name.clone())
            .with_property("is_active", technician.content.is_active),
    )
}

fn shape_point(sourced: &SourcedShape, kind: PointKind) -> Option<MapPoint> {
    let shape = &sourced.shape;
    let location = shape.geometry.centroid().filter(LatLng::is_valid)?;
    let prefix = match kind {
        PointKind::Polygon => "polygon",
        _ => "circle",
    };

    let mut point = MapPoint::new(format!("{}-{}", prefix, sourced.key), location)
        .with_property("kind", kind_value(kind))
        .with_property("entity_id", sourced.key.to_string())
        .with_property("name", shape.name.clone())
        .with_property("color", shape.display_color())
        .with_property("is_active", shape.is_active);
    if let Some(level) = shape.priority_level {
        point = point.with_property("priority_level", level.level());
    }
    if let Some(technician) = shape.technician {
        point = point.with_property("technician", technician.into_raw());
    }
    Some(point)
}

fn kind_value(kind: PointKind) -> Value {
    serde_json::to_value(kind).unwrap_or(Value::Null)
}

use model::{geometry::LatLng, point::MapPoint};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// An aggregate marker standing in for several points.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSummary {
    pub id: usize,
    pub lat: f64,
    pub lng: f64,
    pub point_count: usize,
}

impl ClusterSummary {
    pub fn point_count_abbreviated(&self) -> String {
        abbreviate(self.point_count)
    }
}

/// Result of a cluster query: either an aggregate or one original point.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterFeature {
    Cluster(ClusterSummary),
    Point(MapPoint),
}

impl ClusterFeature {
    pub fn is_cluster(&self) -> bool {
        matches!(self, Self::Cluster(_))
    }

    pub fn cluster_id(&self) -> Option<usize> {
        match self {
            Self::Cluster(cluster) => Some(cluster.id),
            Self::Point(_) => None,
        }
    }

    /// Number of input points this feature represents.
    pub fn point_count(&self) -> usize {
        match self {
            Self::Cluster(cluster) => cluster.point_count,
            Self::Point(_) => 1,
        }
    }

    pub fn location(&self) -> LatLng {
        match self {
            Self::Cluster(cluster) => LatLng::new(cluster.lat, cluster.lng),
            Self::Point(point) => point.location(),
        }
    }

    /// Feature properties. Leaves expose the original point properties and
    /// never carry a `cluster` entry.
    pub fn properties(&self) -> Map<String, Value> {
        match self {
            Self::Cluster(cluster) => {
                let mut properties = Map::new();
                properties.insert("cluster".to_owned(), Value::Bool(true));
                properties.insert("cluster_id".to_owned(), cluster.id.into());
                properties.insert("point_count".to_owned(), cluster.point_count.into());
                properties.insert(
                    "point_count_abbreviated".to_owned(),
                    cluster.point_count_abbreviated().into(),
                );
                properties
            }
            Self::Point(point) => point.properties.clone(),
        }
    }
}

#[derive(Serialize)]
struct GeoJsonPoint {
    r#type: &'static str,
    coordinates: [f64; 2],
}

#[derive(Serialize)]
struct GeoJsonFeature {
    r#type: &'static str,
    id: Value,
    geometry: GeoJsonPoint,
    properties: Map<String, Value>,
}

impl Serialize for ClusterFeature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let location = self.location();
        let id = match self {
            Self::Cluster(cluster) => Value::from(cluster.id),
            Self::Point(point) => Value::from(point.id.clone()),
        };
        GeoJsonFeature {
            r#type: "Feature",
            id,
            geometry: GeoJsonPoint {
                r#type: "Point",
                coordinates: [location.lng, location.lat],
            },
            properties: self.properties(),
        }
        .serialize(serializer)
    }
}

pub fn abbreviate(count: usize) -> String {
    if count >= 1_000_000 {
        format!("{}M", (count as f64 / 1_000_000.0).round())
    } else if count >= 10_000 {
        format!("{}k", (count as f64 / 1_000.0).round())
    } else if count >= 1_000 {
        format!("{}k", (count as f64 / 100.0).round() / 10.0)
    } else {
        count.to_string()
    }
}

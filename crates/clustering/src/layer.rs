use model::point::MapPoint;

use crate::{
    bbox::BoundingBox, feature::ClusterFeature, index::ClusterIndex, options::ClusteringConfig,
};

/// The marker source of a map view.
///
/// Small point sets are shown as individual markers. Once the point count
/// reaches the activation threshold they are served from a [`ClusterIndex`]
/// instead.
#[derive(Debug)]
pub enum MarkerLayer {
    Individual(Vec<MapPoint>),
    Clustered(ClusterIndex),
}

impl Default for MarkerLayer {
    fn default() -> Self {
        Self::Individual(vec![])
    }
}

impl MarkerLayer {
    /// Never fails. An index that cannot be built leaves the points as
    /// individual markers.
    pub fn build(points: Vec<MapPoint>, config: &ClusteringConfig) -> Self {
        if points.len() < config.activation_threshold {
            log::debug!(
                "{} points below activation threshold {}, not clustering",
                points.len(),
                config.activation_threshold
            );
            return Self::Individual(points);
        }

        if let Err(err) = config.options.validate() {
            log::warn!("falling back to individual markers: {}", err);
            return Self::Individual(points);
        }
        // keep a copy around so a failed build still has something to show
        match ClusterIndex::build(points.clone(), config.options.clone()) {
            Ok(index) => Self::Clustered(index),
            Err(err) => {
                log::warn!("falling back to individual markers: {}", err);
                Self::Individual(points)
            }
        }
    }

    pub fn is_clustered(&self) -> bool {
        matches!(self, Self::Clustered(_))
    }

    pub fn index(&self) -> Option<&ClusterIndex> {
        match self {
            Self::Clustered(index) => Some(index),
            Self::Individual(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Individual(points) => points.len(),
            Self::Clustered(index) => index.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Markers to draw for the given viewport.
    pub fn features(&self, bbox: &BoundingBox, zoom: u8) -> Vec<ClusterFeature> {
        match self {
            Self::Clustered(index) => index.get_clusters(bbox, zoom),
            Self::Individual(points) => points
                .iter()
                .filter(|point| bbox.contains(point.lat, point.lng))
                .cloned()
                .map(ClusterFeature::Point)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use model::geometry::LatLng;

    use super::*;
    use crate::options::ClusterOptions;

    fn points(count: usize) -> Vec<MapPoint> {
        (0..count)
            .map(|i| {
                MapPoint::new(
                    format!("technician-{}", i),
                    LatLng::new(40.0 + (i / 20) as f64 * 0.001, -74.0 + (i % 20) as f64 * 0.001),
                )
            })
            .collect()
    }

    #[test]
    fn small_sets_stay_individual() {
        let layer = MarkerLayer::build(points(199), &ClusteringConfig::default());
        assert!(!layer.is_clustered());
        assert!(layer.index().is_none());
        assert_eq!(layer.features(&BoundingBox::WORLD, 3).len(), 199);
    }

    #[test]
    fn threshold_activates_clustering() {
        let layer = MarkerLayer::build(points(200), &ClusteringConfig::default());
        assert!(layer.is_clustered());
        assert_eq!(layer.len(), 200);
        let features = layer.features(&BoundingBox::WORLD, 3);
        assert!(features.len() < 200);
        assert_eq!(
            features.iter().map(ClusterFeature::point_count).sum::<usize>(),
            200
        );
    }

    #[test]
    fn broken_options_fall_back_to_individual_markers() {
        let config = ClusteringConfig {
            options: ClusterOptions::default().with_radius(-1.0),
            activation_threshold: 10,
        };
        let layer = MarkerLayer::build(points(50), &config);
        assert!(!layer.is_clustered());
        assert_eq!(layer.len(), 50);
    }

    #[test]
    fn individual_markers_respect_the_viewport() {
        let mut all = points(5);
        all.push(MapPoint::new("far", LatLng::new(-33.9, 151.2)));
        let layer = MarkerLayer::build(all, &ClusteringConfig::default());
        let features = layer.features(&BoundingBox::new(-75.0, 39.0, -73.0, 41.0), 10);
        assert_eq!(features.len(), 5);
    }
}

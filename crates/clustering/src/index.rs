//! Greedy hierarchical point clustering.
//!
//! Every zoom level from `max_zoom` down to `min_zoom` holds the clusters of
//! the level above it, merged with a radius measured in screen pixels. Each
//! level keeps its nodes in an R-tree over unit web mercator coordinates, so
//! viewport queries only touch the nodes they return.

use model::point::MapPoint;
use rstar::{primitives::GeomWithData, RTree, AABB};
use utility::geo::{mercator, wrap_longitude};

use crate::{
    bbox::BoundingBox,
    feature::{ClusterFeature, ClusterSummary},
    options::ClusterOptions,
    ClusterError,
};

type IndexedNode = GeomWithData<[f64; 2], usize>;

#[derive(Debug, Clone, Copy)]
enum NodeSource {
    Point(usize),
    Cluster(usize),
}

#[derive(Debug, Clone, Copy)]
struct Node {
    x: f64,
    y: f64,
    /// Set once the node was merged or carried over while building the
    /// level below.
    claimed: bool,
    num_points: usize,
    source: NodeSource,
    parent: Option<usize>,
}

impl Node {
    fn carried_over(&self) -> Self {
        Self {
            claimed: false,
            parent: None,
            ..*self
        }
    }
}

#[derive(Debug)]
struct Level {
    nodes: Vec<Node>,
    tree: RTree<IndexedNode>,
}

impl Level {
    fn new(nodes: Vec<Node>) -> Self {
        let tree = RTree::bulk_load(
            nodes
                .iter()
                .enumerate()
                .map(|(index, node)| GeomWithData::new([node.x, node.y], index))
                .collect(),
        );
        Self { nodes, tree }
    }

    fn empty() -> Self {
        Self::new(vec![])
    }

    fn within(&self, x: f64, y: f64, radius: f64) -> Vec<usize> {
        within(&self.tree, x, y, radius)
    }

    fn range(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<usize> {
        let envelope = AABB::from_corners([min_x, min_y], [max_x, max_y]);
        let mut indices = self
            .tree
            .locate_in_envelope(&envelope)
            .map(|node| node.data)
            .collect::<Vec<_>>();
        indices.sort_unstable();
        indices
    }
}

fn within(tree: &RTree<IndexedNode>, x: f64, y: f64, radius: f64) -> Vec<usize> {
    let mut indices = tree
        .locate_within_distance([x, y], radius * radius)
        .map(|node| node.data)
        .collect::<Vec<_>>();
    indices.sort_unstable();
    indices
}

/// Queryable cluster hierarchy over a fixed point set. Rebuild it when the
/// points change, there is no incremental update.
#[derive(Debug)]
pub struct ClusterIndex {
    options: ClusterOptions,
    points: Vec<MapPoint>,
    /// Indexed by zoom, `levels[max_zoom + 1]` holds the raw points.
    levels: Vec<Level>,
}

impl ClusterIndex {
    pub fn build(
        points: Vec<MapPoint>,
        options: ClusterOptions,
    ) -> Result<Self, ClusterError> {
        options.validate()?;

        let mut nodes = Vec::with_capacity(points.len());
        for (index, point) in points.iter().enumerate() {
            if !point.lat.is_finite() || !point.lng.is_finite() {
                return Err(ClusterError::InvalidCoordinate {
                    id: point.id.clone(),
                });
            }
            nodes.push(Node {
                x: mercator::lng_to_x(point.lng),
                y: mercator::lat_to_y(point.lat),
                claimed: false,
                num_points: 1,
                source: NodeSource::Point(index),
                parent: None,
            });
        }

        let top = options.max_zoom as usize + 1;
        let mut levels = (0..=top).map(|_| Level::empty()).collect::<Vec<_>>();
        levels[top] = Level::new(nodes);

        for zoom in (options.min_zoom..=options.max_zoom).rev() {
            let next = cluster_level(
                &mut levels[zoom as usize + 1],
                zoom,
                &options,
                points.len(),
            );
            log::trace!("zoom {}: {} nodes", zoom, next.len());
            levels[zoom as usize] = Level::new(next);
        }

        log::debug!(
            "built cluster index over {} points, {} top level nodes",
            points.len(),
            levels[options.min_zoom as usize].nodes.len()
        );

        Ok(Self {
            options,
            points,
            levels,
        })
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Clusters and points inside `bbox` at `zoom`. Zoom levels above
    /// `max_zoom` return the raw points.
    pub fn get_clusters(&self, bbox: &BoundingBox, zoom: u8) -> Vec<ClusterFeature> {
        let mut min_lng = wrap_longitude(bbox.west);
        let min_lat = bbox.south.clamp(-90.0, 90.0);
        let mut max_lng = if bbox.east == 180.0 {
            180.0
        } else {
            wrap_longitude(bbox.east)
        };
        let max_lat = bbox.north.clamp(-90.0, 90.0);

        if bbox.east - bbox.west >= 360.0 {
            min_lng = -180.0;
            max_lng = 180.0;
        } else if min_lng > max_lng {
            // the box crosses the antimeridian
            let mut features = self.get_clusters(
                &BoundingBox::new(min_lng, min_lat, 180.0, max_lat),
                zoom,
            );
            features.extend(self.get_clusters(
                &BoundingBox::new(-180.0, min_lat, max_lng, max_lat),
                zoom,
            ));
            return features;
        }

        let level = &self.levels[self.limit_zoom(zoom)];
        level
            .range(
                mercator::lng_to_x(min_lng),
                mercator::lat_to_y(max_lat),
                mercator::lng_to_x(max_lng),
                mercator::lat_to_y(min_lat),
            )
            .into_iter()
            .map(|index| self.feature(&level.nodes[index]))
            .collect()
    }

    /// Features one level below the given cluster.
    pub fn get_children(&self, cluster_id: usize) -> Result<Vec<ClusterFeature>, ClusterError> {
        let (origin_zoom, origin_index) = self.decode(cluster_id)?;
        let level = &self.levels[origin_zoom];
        let origin = &level.nodes[origin_index];
        let radius = self.radius_at(origin_zoom as u8 - 1);

        let children = level
            .within(origin.x, origin.y, radius)
            .into_iter()
            .map(|index| &level.nodes[index])
            .filter(|node| node.parent == Some(cluster_id))
            .map(|node| self.feature(node))
            .collect::<Vec<_>>();

        if children.is_empty() {
            return Err(ClusterError::NoSuchCluster(cluster_id));
        }
        Ok(children)
    }

    /// Original points below a cluster, paginated.
    pub fn get_leaves(
        &self,
        cluster_id: usize,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MapPoint>, ClusterError> {
        let mut leaves = vec![];
        let mut skipped = 0;
        self.append_leaves(cluster_id, limit, offset, &mut skipped, &mut leaves)?;
        Ok(leaves)
    }

    fn append_leaves(
        &self,
        cluster_id: usize,
        limit: usize,
        offset: usize,
        skipped: &mut usize,
        leaves: &mut Vec<MapPoint>,
    ) -> Result<(), ClusterError> {
        for child in self.get_children(cluster_id)? {
            if leaves.len() >= limit {
                break;
            }
            match child {
                ClusterFeature::Cluster(cluster) => {
                    if *skipped + cluster.point_count <= offset {
                        // the whole cluster lies before the requested page
                        *skipped += cluster.point_count;
                    } else {
                        self.append_leaves(cluster.id, limit, offset, skipped, leaves)?;
                    }
                }
                ClusterFeature::Point(point) => {
                    if *skipped < offset {
                        *skipped += 1;
                    } else {
                        leaves.push(point);
                    }
                }
            }
        }
        Ok(())
    }

    /// The zoom level at which a cluster falls apart into several features.
    pub fn expansion_zoom(&self, cluster_id: usize) -> Result<u8, ClusterError> {
        let (origin_zoom, _) = self.decode(cluster_id)?;
        let mut expansion_zoom = origin_zoom as u8 - 1;
        let mut cluster_id = cluster_id;
        while expansion_zoom <= self.options.max_zoom {
            let children = self.get_children(cluster_id)?;
            expansion_zoom += 1;
            match children.as_slice() {
                [ClusterFeature::Cluster(only)] => cluster_id = only.id,
                _ => break,
            }
        }
        Ok(expansion_zoom)
    }

    fn limit_zoom(&self, zoom: u8) -> usize {
        zoom.clamp(self.options.min_zoom, self.options.max_zoom + 1) as usize
    }

    fn radius_at(&self, zoom: u8) -> f64 {
        self.options.radius / (self.options.extent * 2f64.powi(zoom as i32))
    }

    /// Splits a cluster id into the level its members live in and the index
    /// of the node that seeded the cluster.
    fn decode(&self, cluster_id: usize) -> Result<(usize, usize), ClusterError> {
        let not_found = ClusterError::NoSuchCluster(cluster_id);
        let encoded = cluster_id
            .checked_sub(self.points.len())
            .ok_or(not_found.clone())?;
        let origin_zoom = encoded % 32;
        let origin_index = encoded >> 5;

        let valid_zoom = origin_zoom > self.options.min_zoom as usize
            && origin_zoom <= self.options.max_zoom as usize + 1;
        if !valid_zoom {
            return Err(not_found);
        }
        match self.levels[origin_zoom].nodes.get(origin_index) {
            Some(node) if node.parent == Some(cluster_id) => Ok((origin_zoom, origin_index)),
            _ => Err(not_found),
        }
    }

    fn feature(&self, node: &Node) -> ClusterFeature {
        match node.source {
            NodeSource::Point(index) => ClusterFeature::Point(self.points[index].clone()),
            NodeSource::Cluster(id) => ClusterFeature::Cluster(ClusterSummary {
                id,
                lat: mercator::y_to_lat(node.y),
                lng: mercator::x_to_lng(node.x),
                point_count: node.num_points,
            }),
        }
    }
}

/// Builds the nodes of level `zoom` from the level above it.
fn cluster_level(
    level: &mut Level,
    zoom: u8,
    options: &ClusterOptions,
    total_points: usize,
) -> Vec<Node> {
    let radius = options.radius / (options.extent * 2f64.powi(zoom as i32));
    let Level { nodes, tree } = level;
    let mut next = vec![];

    for index in 0..nodes.len() {
        if nodes[index].claimed {
            continue;
        }
        nodes[index].claimed = true;

        let origin = nodes[index];
        let neighbors = within(tree, origin.x, origin.y, radius);

        let num_points = origin.num_points
            + neighbors
                .iter()
                .map(|&neighbor| &nodes[neighbor])
                .filter(|node| !node.claimed)
                .map(|node| node.num_points)
                .sum::<usize>();

        if num_points > origin.num_points && num_points >= options.min_points {
            let id = (index << 5) + (zoom as usize + 1) + total_points;
            let mut weighted_x = origin.x * origin.num_points as f64;
            let mut weighted_y = origin.y * origin.num_points as f64;

            for &neighbor in &neighbors {
                let node = &mut nodes[neighbor];
                if node.claimed {
                    continue;
                }
                node.claimed = true;
                node.parent = Some(id);
                weighted_x += node.x * node.num_points as f64;
                weighted_y += node.y * node.num_points as f64;
            }
            nodes[index].parent = Some(id);

            next.push(Node {
                x: weighted_x / num_points as f64,
                y: weighted_y / num_points as f64,
                claimed: false,
                num_points,
                source: NodeSource::Cluster(id),
                parent: None,
            });
        } else {
            next.push(origin.carried_over());
            if num_points > 1 {
                // too few neighbors to form a cluster, carry them over as is
                for &neighbor in &neighbors {
                    let node = &mut nodes[neighbor];
                    if node.claimed {
                        continue;
                    }
                    node.claimed = true;
                    next.push(node.carried_over());
                }
            }
        }
    }

    next
}

#[cfg(test)]
mod tests {
    use model::geometry::LatLng;

    use super::*;

    fn grid(count: usize, origin: LatLng, step: f64) -> Vec<MapPoint> {
        (0..count)
            .map(|i| {
                let location = LatLng::new(
                    origin.lat + (i / 10) as f64 * step,
                    origin.lng + (i % 10) as f64 * step,
                );
                MapPoint::new(format!("technician-{}", i), location)
            })
            .collect()
    }

    fn total_points(features: &[ClusterFeature]) -> usize {
        features.iter().map(ClusterFeature::point_count).sum()
    }

    #[test]
    fn ten_nearby_points_form_one_cluster_at_low_zoom() {
        let points = grid(10, LatLng::new(47.6, -122.3), 0.05);
        let index =
            ClusterIndex::build(points, ClusterOptions::default().with_radius(70.0)).unwrap();

        let features = index.get_clusters(&BoundingBox::WORLD, 2);
        assert_eq!(features.len(), 1);
        assert!(features[0].is_cluster());
        assert_eq!(features[0].point_count(), 10);
    }

    #[test]
    fn ten_nearby_points_separate_at_high_zoom() {
        let points = grid(10, LatLng::new(47.6, -122.3), 0.05);
        let index = ClusterIndex::build(points, ClusterOptions::default()).unwrap();

        let features = index.get_clusters(&BoundingBox::WORLD, 12);
        assert_eq!(features.len(), 10);
        assert!(features.iter().all(|feature| !feature.is_cluster()));
    }

    #[test]
    fn every_point_is_returned_above_max_zoom() {
        let points = grid(250, LatLng::new(40.0, -74.0), 0.001);
        let index = ClusterIndex::build(points.clone(), ClusterOptions::default()).unwrap();

        let features = index.get_clusters(&BoundingBox::WORLD, 19);
        assert_eq!(features.len(), points.len());
        assert!(features
            .iter()
            .all(|feature| feature.properties().get("cluster").is_none()));
    }

    #[test]
    fn low_zoom_keeps_point_counts() {
        let mut points = grid(150, LatLng::new(40.0, -74.0), 0.01);
        points.extend(grid(100, LatLng::new(-33.9, 151.2), 0.01));
        let index = ClusterIndex::build(points.clone(), ClusterOptions::default()).unwrap();

        for zoom in 0..=18 {
            let features = index.get_clusters(&BoundingBox::WORLD, zoom);
            assert_eq!(total_points(&features), points.len(), "zoom {}", zoom);
        }
        let coarse = index.get_clusters(&BoundingBox::WORLD, 3);
        assert!(coarse.len() < points.len());
        assert_eq!(coarse.len(), 2);
    }

    #[test]
    fn viewport_limits_results() {
        let mut points = grid(10, LatLng::new(40.0, -74.0), 0.05);
        points.extend(grid(10, LatLng::new(-33.9, 151.2), 0.05));
        let index = ClusterIndex::build(points, ClusterOptions::default()).unwrap();

        let new_york = BoundingBox::new(-80.0, 35.0, -70.0, 45.0);
        let features = index.get_clusters(&new_york, 12);
        assert_eq!(features.len(), 10);
        assert!(features.iter().all(|feature| feature.location().lng < -70.0));
    }

    #[test]
    fn boxes_across_the_antimeridian_are_split() {
        let points = vec![
            MapPoint::new("east", LatLng::new(0.0, 179.5)),
            MapPoint::new("west", LatLng::new(0.0, -179.5)),
            MapPoint::new("far", LatLng::new(0.0, 0.0)),
        ];
        let index = ClusterIndex::build(points, ClusterOptions::default()).unwrap();

        let features = index.get_clusters(&BoundingBox::new(179.0, -1.0, -179.0, 1.0), 19);
        let mut ids = features
            .iter()
            .filter_map(|feature| match feature {
                ClusterFeature::Point(point) => Some(point.id.as_str()),
                ClusterFeature::Cluster(_) => None,
            })
            .collect::<Vec<_>>();
        ids.sort_unstable();
        assert_eq!(ids, vec!["east", "west"]);
    }

    #[test]
    fn children_leaves_and_expansion_zoom_agree() {
        let points = grid(10, LatLng::new(47.6, -122.3), 0.05);
        let index = ClusterIndex::build(points, ClusterOptions::default()).unwrap();
        let cluster_id = index.get_clusters(&BoundingBox::WORLD, 2)[0]
            .cluster_id()
            .unwrap();

        let children = index.get_children(cluster_id).unwrap();
        assert_eq!(total_points(&children), 10);

        let leaves = index.get_leaves(cluster_id, usize::MAX, 0).unwrap();
        assert_eq!(leaves.len(), 10);
        let page = index.get_leaves(cluster_id, 3, 4).unwrap();
        assert_eq!(page.len(), 3);
        assert!(page.iter().all(|point| leaves.contains(point)));

        let expansion_zoom = index.expansion_zoom(cluster_id).unwrap();
        assert!(expansion_zoom > 2);
        assert!(index.get_clusters(&BoundingBox::WORLD, expansion_zoom).len() > 1);
    }

    #[test]
    fn unknown_clusters_are_reported() {
        let points = grid(10, LatLng::new(47.6, -122.3), 0.05);
        let index = ClusterIndex::build(points, ClusterOptions::default()).unwrap();
        assert_eq!(
            index.get_children(3).unwrap_err(),
            ClusterError::NoSuchCluster(3)
        );
        assert!(index.expansion_zoom(99_999).is_err());
    }

    #[test]
    fn invalid_coordinates_fail_the_build() {
        let points = vec![MapPoint::new("broken", LatLng::new(f64::NAN, 0.0))];
        let result = ClusterIndex::build(points, ClusterOptions::default());
        assert_eq!(
            result.unwrap_err(),
            ClusterError::InvalidCoordinate {
                id: "broken".to_owned()
            }
        );
    }
}

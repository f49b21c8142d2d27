//! The remote coverage backend.
//!
//! Every call answers in the backend wire format: lists come wrapped as
//! `{ "data": { "results": [...] } }`, single resources as `{ "data": ... }`.

use std::{error, fmt, path::Path, result, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use model::{
    area::CoverageArea,
    geometry::AreaType,
    shape::CoverageShape,
    summary::ShapeSummary,
    technician::Technician,
    wire::{Envelope, ResultsEnvelope, SeedDocument},
    WithId,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use utility::id::{HasId, Id};

#[derive(Debug)]
pub enum BackendError {
    NotFound,
    Invalid(String),
    Other(Box<dyn error::Error + Send + Sync>),
}

impl error::Error for BackendError {}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "resource not found"),
            Self::Invalid(why) => write!(f, "rejected by backend: {}", why),
            Self::Other(why) => write!(f, "{}", why),
        }
    }
}

pub type Result<T> = result::Result<T, BackendError>;

/// Server side filter for the shape list.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ShapeQuery {
    pub is_active: Option<bool>,
    pub area_type: Option<AreaType>,
    pub technician: Option<Id<Technician>>,
}

impl ShapeQuery {
    pub fn active() -> Self {
        Self {
            is_active: Some(true),
            ..Self::default()
        }
    }

    pub fn matches(&self, shape: &CoverageShape) -> bool {
        self.is_active.map_or(true, |active| shape.is_active == active)
            && self
                .area_type
                .map_or(true, |area_type| shape.area_type() == area_type)
            && self
                .technician
                .map_or(true, |technician| shape.technician == Some(technician))
    }
}

#[async_trait]
pub trait CoverageBackend: Clone + Send + Sync {
    /// Legacy polygon areas.
    async fn coverage_areas(&self) -> Result<ResultsEnvelope<WithId<CoverageArea>>>;

    async fn update_coverage_area(
        &self,
        id: Id<CoverageArea>,
        area: CoverageArea,
    ) -> Result<Envelope<WithId<CoverageArea>>>;

    async fn delete_coverage_area(&self, id: Id<CoverageArea>) -> Result<()>;

    async fn coverage_shapes(
        &self,
        query: &ShapeQuery,
    ) -> Result<ResultsEnvelope<WithId<CoverageShape>>>;

    async fn coverage_shape(
        &self,
        id: Id<CoverageShape>,
    ) -> Result<Envelope<WithId<CoverageShape>>>;

    async fn create_coverage_shape(
        &self,
        shape: CoverageShape,
    ) -> Result<Envelope<WithId<CoverageShape>>>;

    async fn update_coverage_shape(
        &self,
        id: Id<CoverageShape>,
        shape: CoverageShape,
    ) -> Result<Envelope<WithId<CoverageShape>>>;

    async fn delete_coverage_shape(&self, id: Id<CoverageShape>) -> Result<()>;

    async fn technicians(&self) -> Result<ResultsEnvelope<WithId<Technician>>>;

    async fn coverage_shape_summary(&self) -> Result<Envelope<ShapeSummary>>;
}

#[derive(Debug, Default)]
struct Store {
    technicians: IndexMap<Id<Technician>, Technician>,
    shapes: IndexMap<Id<CoverageShape>, CoverageShape>,
    areas: IndexMap<Id<CoverageArea>, CoverageArea>,
    sequences: Sequences,
}

/// Last id handed out per collection. Only ever grows, so ids of deleted
/// entries are never reused.
#[derive(Debug, Default)]
struct Sequences {
    technicians: i64,
    shapes: i64,
    areas: i64,
}

impl Sequences {
    fn after(store: &Store) -> Self {
        Self {
            technicians: last_id(&store.technicians),
            shapes: last_id(&store.shapes),
            areas: last_id(&store.areas),
        }
    }
}

fn last_id<V>(entries: &IndexMap<Id<V>, V>) -> i64
where
    V: HasId<IdType = i64>,
{
    entries.keys().map(|id| id.into_raw()).max().unwrap_or(0)
}

fn next_id<V>(sequence: &mut i64) -> Id<V>
where
    V: HasId<IdType = i64>,
{
    *sequence += 1;
    Id::new(*sequence)
}

fn to_list<V>(entries: &IndexMap<Id<V>, V>) -> Vec<WithId<V>>
where
    V: HasId<IdType = i64> + Clone,
{
    entries
        .iter()
        .map(|(id, content)| WithId::new(*id, content.clone()))
        .collect()
}

/// Backend kept in process memory. Clones share the same store, so a clone
/// can be handed to every request handler.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    store: Arc<RwLock<Store>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: SeedDocument) -> Self {
        let mut store = Store {
            technicians: seed
                .technicians
                .into_iter()
                .map(|entry| (entry.id, entry.content))
                .collect(),
            shapes: seed
                .coverage_shapes
                .into_iter()
                .map(|entry| (entry.id, entry.content))
                .collect(),
            areas: seed
                .coverage_areas
                .into_iter()
                .map(|entry| (entry.id, entry.content))
                .collect(),
            sequences: Sequences::default(),
        };
        store.sequences = Sequences::after(&store);
        log::info!(
            "seeded backend with {} technicians, {} shapes and {} legacy areas",
            store.technicians.len(),
            store.shapes.len(),
            store.areas.len()
        );
        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }

    /// Reads a [`SeedDocument`] in wire format from a json file.
    pub async fn from_seed_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|why| BackendError::Other(Box::new(why)))?;
        let seed: SeedDocument = serde_json::from_str(&content)
            .map_err(|why| BackendError::Invalid(why.to_string()))?;
        Ok(Self::from_seed(seed))
    }

    pub async fn insert_technician(&self, technician: Technician) -> WithId<Technician> {
        let mut store = self.store.write().await;
        let id = next_id(&mut store.sequences.technicians);
        store.technicians.insert(id, technician.clone());
        WithId::new(id, technician)
    }

    pub async fn insert_coverage_area(&self, area: CoverageArea) -> WithId<CoverageArea> {
        let mut store = self.store.write().await;
        let id = next_id(&mut store.sequences.areas);
        store.areas.insert(id, area.clone());
        WithId::new(id, area)
    }
}

#[async_trait]
impl CoverageBackend for InMemoryBackend {
    async fn coverage_areas(&self) -> Result<ResultsEnvelope<WithId<CoverageArea>>> {
        let store = self.store.read().await;
        Ok(Envelope::results(to_list(&store.areas)))
    }

    async fn update_coverage_area(
        &self,
        id: Id<CoverageArea>,
        area: CoverageArea,
    ) -> Result<Envelope<WithId<CoverageArea>>> {
        let mut store = self.store.write().await;
        let entry = store.areas.get_mut(&id).ok_or(BackendError::NotFound)?;
        *entry = area.clone();
        Ok(Envelope::new(WithId::new(id, area)))
    }

    async fn delete_coverage_area(&self, id: Id<CoverageArea>) -> Result<()> {
        let mut store = self.store.write().await;
        store
            .areas
            .shift_remove(&id)
            .map(|_| ())
            .ok_or(BackendError::NotFound)
    }

    async fn coverage_shapes(
        &self,
        query: &ShapeQuery,
    ) -> Result<ResultsEnvelope<WithId<CoverageShape>>> {
        let store = self.store.read().await;
        let shapes = store
            .shapes
            .iter()
            .filter(|(_, shape)| query.matches(shape))
            .map(|(id, shape)| WithId::new(*id, shape.clone()))
            .collect();
        Ok(Envelope::results(shapes))
    }

    async fn coverage_shape(
        &self,
        id: Id<CoverageShape>,
    ) -> Result<Envelope<WithId<CoverageShape>>> {
        let store = self.store.read().await;
        let shape = store.shapes.get(&id).ok_or(BackendError::NotFound)?;
        Ok(Envelope::new(WithId::new(id, shape.clone())))
    }

    async fn create_coverage_shape(
        &self,
        mut shape: CoverageShape,
    ) -> Result<Envelope<WithId<CoverageShape>>> {
        let now = Utc::now();
        shape.created_at = Some(now);
        shape.updated_at = Some(now);

        let mut store = self.store.write().await;
        let id = next_id(&mut store.sequences.shapes);
        store.shapes.insert(id, shape.clone());
        log::debug!("created coverage shape {} ({})", id, shape.name);
        Ok(Envelope::new(WithId::new(id, shape)))
    }

    async fn update_coverage_shape(
        &self,
        id: Id<CoverageShape>,
        mut shape: CoverageShape,
    ) -> Result<Envelope<WithId<CoverageShape>>> {
        let mut store = self.store.write().await;
        let entry = store.shapes.get_mut(&id).ok_or(BackendError::NotFound)?;
        shape.created_at = entry.created_at;
        shape.updated_at = Some(Utc::now());
        *entry = shape.clone();
        Ok(Envelope::new(WithId::new(id, shape)))
    }

    async fn delete_coverage_shape(&self, id: Id<CoverageShape>) -> Result<()> {
        let mut store = self.store.write().await;
        store
            .shapes
            .shift_remove(&id)
            .map(|_| ())
            .ok_or(BackendError::NotFound)
    }

    async fn technicians(&self) -> Result<ResultsEnvelope<WithId<Technician>>> {
        let store = self.store.read().await;
        Ok(Envelope::results(to_list(&store.technicians)))
    }

    async fn coverage_shape_summary(&self) -> Result<Envelope<ShapeSummary>> {
        let store = self.store.read().await;
        Ok(Envelope::new(ShapeSummary::from_shapes(store.shapes.values())))
    }
}

#[cfg(test)]
mod tests {
    use model::{
        geometry::{LatLng, ShapeGeometry},
        ExampleData,
    };
    use serde_json::json;

    use super::*;

    fn circle(name: &str) -> CoverageShape {
        CoverageShape::new(
            name,
            ShapeGeometry::circle(LatLng::new(47.6, -122.3), 500.0).unwrap(),
        )
    }

    #[tokio::test]
    async fn created_shapes_get_ids_and_timestamps() {
        let backend = InMemoryBackend::new();
        let first = backend.create_coverage_shape(circle("a")).await.unwrap().data;
        let second = backend.create_coverage_shape(circle("b")).await.unwrap().data;
        assert_eq!(first.id, Id::new(1));
        assert_eq!(second.id, Id::new(2));
        assert!(first.content.created_at.is_some());

        let shapes = backend
            .coverage_shapes(&ShapeQuery::default())
            .await
            .unwrap()
            .into_results();
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].content.name, "a");
    }

    #[tokio::test]
    async fn deleted_ids_are_not_reused() {
        let backend = InMemoryBackend::new();
        backend.create_coverage_shape(circle("a")).await.unwrap();
        let last = backend.create_coverage_shape(circle("b")).await.unwrap().data;
        backend.delete_coverage_shape(last.id).await.unwrap();

        let next = backend.create_coverage_shape(circle("c")).await.unwrap().data;
        assert_ne!(next.id, last.id);
        assert_eq!(next.id, Id::new(3));
    }

    #[tokio::test]
    async fn updates_keep_creation_time() {
        let backend = InMemoryBackend::new();
        let created = backend.create_coverage_shape(circle("a")).await.unwrap().data;
        let updated = backend
            .update_coverage_shape(created.id, circle("renamed"))
            .await
            .unwrap()
            .data;
        assert_eq!(updated.content.name, "renamed");
        assert_eq!(updated.content.created_at, created.content.created_at);
    }

    #[tokio::test]
    async fn missing_entries_are_not_found() {
        let backend = InMemoryBackend::new();
        assert!(matches!(
            backend.coverage_shape(Id::new(7)).await,
            Err(BackendError::NotFound)
        ));
        assert!(matches!(
            backend.delete_coverage_area(Id::new(7)).await,
            Err(BackendError::NotFound)
        ));
        assert!(matches!(
            backend.update_coverage_shape(Id::new(7), circle("x")).await,
            Err(BackendError::NotFound)
        ));
    }

    #[tokio::test]
    async fn query_filters_shapes() {
        let backend = InMemoryBackend::new();
        let mut inactive = circle("inactive");
        inactive.is_active = false;
        backend.create_coverage_shape(circle("active")).await.unwrap();
        backend.create_coverage_shape(inactive).await.unwrap();

        let active = backend
            .coverage_shapes(&ShapeQuery::active())
            .await
            .unwrap()
            .into_results();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].content.name, "active");

        let polygons = backend
            .coverage_shapes(&ShapeQuery {
                area_type: Some(AreaType::Polygon),
                ..ShapeQuery::default()
            })
            .await
            .unwrap()
            .into_results();
        assert!(polygons.is_empty());
    }

    #[tokio::test]
    async fn seed_document_is_read_in_wire_format() {
        let seed: SeedDocument = serde_json::from_value(json!({
            "technicians": [
                { "id": 1, "name": "Sam", "location": { "lat": 47.6, "lng": -122.3 } }
            ],
            "coverage_shapes": [{
                "id": 4,
                "name": "Depot",
                "area_type": "circle",
                "geometry": { "type": "Point", "coordinates": [-122.3, 47.6] },
                "radius": 800,
                "priority_level": 1
            }],
            "coverage_areas": [{
                "id": 9,
                "name": "North",
                "coordinates": [[-122.4, 47.7], [-122.3, 47.7], [-122.3, 47.8], [-122.4, 47.7]]
            }]
        }))
        .unwrap();
        let backend = InMemoryBackend::from_seed(seed);

        assert_eq!(backend.technicians().await.unwrap().into_results().len(), 1);
        let areas = backend.coverage_areas().await.unwrap().into_results();
        assert_eq!(areas[0].id, Id::new(9));
        assert_eq!(areas[0].content.ring.len(), 3);

        let created = backend.create_coverage_shape(circle("next")).await.unwrap().data;
        assert_eq!(created.id, Id::new(5));

        let summary = backend.coverage_shape_summary().await.unwrap().data;
        assert_eq!(summary.total, 2);
        assert_eq!(summary.circles, 2);
        assert_eq!(summary.by_priority.high, 1);
    }

    #[tokio::test]
    async fn areas_can_be_updated_and_deleted() {
        let backend = InMemoryBackend::new();
        let area = backend
            .insert_coverage_area(CoverageArea::example_data())
            .await;
        let mut changed = area.content.clone();
        changed.name = "Renamed".to_owned();
        backend.update_coverage_area(area.id, changed).await.unwrap();
        assert_eq!(
            backend.coverage_areas().await.unwrap().into_results()[0]
                .content
                .name,
            "Renamed"
        );
        backend.delete_coverage_area(area.id).await.unwrap();
        assert!(backend.coverage_areas().await.unwrap().into_results().is_empty());
    }
}

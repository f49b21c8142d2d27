use model::{
    area::CoverageArea,
    shape::CoverageShape,
    source::{ShapeKey, SourcedShape},
    summary::ShapeSummary,
    technician::Technician,
    WithId,
};
use utility::{id::Id, let_also::LetAlso};

use crate::{
    backend::{CoverageBackend, ShapeQuery},
    confirm::Confirm,
    RequestError, RequestResult,
};

/// Named calls against a [`CoverageBackend`], with the envelopes already
/// unwrapped.
#[derive(Debug, Clone)]
pub struct Client<B>
where
    B: CoverageBackend,
{
    backend: B,
}

impl<B> Client<B>
where
    B: CoverageBackend,
{
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn get_coverage_areas(&self) -> RequestResult<Vec<WithId<CoverageArea>>> {
        Ok(self.backend.coverage_areas().await?.into_results())
    }

    pub async fn get_coverage_area(
        &self,
        id: Id<CoverageArea>,
    ) -> RequestResult<WithId<CoverageArea>> {
        self.get_coverage_areas()
            .await?
            .into_iter()
            .find(|area| area.id == id)
            .ok_or(RequestError::NotFound)
    }

    pub async fn update_coverage_area(
        &self,
        id: Id<CoverageArea>,
        area: CoverageArea,
    ) -> RequestResult<WithId<CoverageArea>> {
        Ok(self.backend.update_coverage_area(id, area).await?.data)
    }

    pub async fn delete_coverage_area(&self, id: Id<CoverageArea>) -> RequestResult<()> {
        Ok(self.backend.delete_coverage_area(id).await?)
    }

    pub async fn get_coverage_shapes(
        &self,
        query: &ShapeQuery,
    ) -> RequestResult<Vec<WithId<CoverageShape>>> {
        Ok(self.backend.coverage_shapes(query).await?.into_results())
    }

    pub async fn get_coverage_shape(
        &self,
        id: Id<CoverageShape>,
    ) -> RequestResult<WithId<CoverageShape>> {
        Ok(self.backend.coverage_shape(id).await?.data)
    }

    pub async fn create_coverage_shape(
        &self,
        shape: CoverageShape,
    ) -> RequestResult<WithId<CoverageShape>> {
        Ok(self.backend.create_coverage_shape(shape).await?.data)
    }

    pub async fn update_coverage_shape(
        &self,
        id: Id<CoverageShape>,
        shape: CoverageShape,
    ) -> RequestResult<WithId<CoverageShape>> {
        Ok(self.backend.update_coverage_shape(id, shape).await?.data)
    }

    pub async fn delete_coverage_shape(&self, id: Id<CoverageShape>) -> RequestResult<()> {
        Ok(self.backend.delete_coverage_shape(id).await?)
    }

    pub async fn get_technicians(&self) -> RequestResult<Vec<WithId<Technician>>> {
        Ok(self.backend.technicians().await?.into_results())
    }

    pub async fn get_coverage_shape_summary(&self) -> RequestResult<ShapeSummary> {
        Ok(self.backend.coverage_shape_summary().await?.data)
    }
}

/// Calls that treat legacy areas and coverage shapes as one collection. The
/// [`ShapeKey`] decides which endpoint a call goes to.
impl<B> Client<B>
where
    B: CoverageBackend,
{
    /// Legacy areas first, then coverage shapes, each in backend order.
    pub async fn get_sourced_shapes(
        &self,
        query: &ShapeQuery,
    ) -> RequestResult<Vec<SourcedShape>> {
        let (areas, shapes) = futures::try_join!(
            self.get_coverage_areas(),
            self.get_coverage_shapes(query)
        )?;
        merge_sources(areas, shapes, query).let_owned(Ok)
    }

    pub async fn get_sourced_shape(&self, key: ShapeKey) -> RequestResult<SourcedShape> {
        let sourced = match key {
            ShapeKey::Legacy(id) => SourcedShape::from(&self.get_coverage_area(id).await?),
            ShapeKey::Shape(id) => SourcedShape::from(self.get_coverage_shape(id).await?),
        };
        Ok(sourced)
    }

    /// Creates a new coverage shape when `key` is `None`, otherwise writes
    /// the shape back to the collection the key points into.
    pub async fn save_shape(
        &self,
        key: Option<ShapeKey>,
        shape: CoverageShape,
    ) -> RequestResult<SourcedShape> {
        let saved = match key {
            None => SourcedShape::from(self.create_coverage_shape(shape).await?),
            Some(ShapeKey::Shape(id)) => {
                SourcedShape::from(self.update_coverage_shape(id, shape).await?)
            }
            Some(ShapeKey::Legacy(id)) => {
                let existing = self.get_coverage_area(id).await?;
                let area = existing.content.updated_from(&shape).ok_or_else(|| {
                    RequestError::Invalid("legacy areas can only hold polygons".to_owned())
                })?;
                SourcedShape::from(&self.update_coverage_area(id, area).await?)
            }
        };
        log::debug!("saved {}", saved.key);
        Ok(saved)
    }

    pub async fn delete_shape(&self, key: ShapeKey) -> RequestResult<()> {
        log::info!("deleting {}", key);
        match key {
            ShapeKey::Legacy(id) => self.delete_coverage_area(id).await,
            ShapeKey::Shape(id) => self.delete_coverage_shape(id).await,
        }
    }

    /// Deletes a shape once `confirm` agrees to a prompt naming it. A
    /// declined confirmation does not reach the backend.
    pub async fn delete_confirmed<C>(
        &self,
        key: ShapeKey,
        name: &str,
        confirm: &C,
    ) -> RequestResult<()>
    where
        C: Confirm + ?Sized,
    {
        if !confirm.confirm(&format!("Delete coverage area '{}'?", name)) {
            log::debug!("delete of {} was not confirmed", key);
            return Err(RequestError::Declined);
        }
        self.delete_shape(key).await
    }
}

/// Legacy areas have no server side query, so the shape query is applied to
/// them here.
fn merge_sources(
    areas: Vec<WithId<CoverageArea>>,
    shapes: Vec<WithId<CoverageShape>>,
    query: &ShapeQuery,
) -> Vec<SourcedShape> {
    areas
        .iter()
        .map(SourcedShape::from)
        .filter(|sourced| query.matches(&sourced.shape))
        .chain(shapes.into_iter().map(SourcedShape::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use model::{
        geometry::{LatLng, ShapeGeometry},
        ExampleData,
    };

    use super::*;
    use crate::backend::InMemoryBackend;

    fn circle() -> CoverageShape {
        CoverageShape::new(
            "Depot",
            ShapeGeometry::circle(LatLng::new(47.6, -122.3), 500.0).unwrap(),
        )
    }

    async fn client_with_area() -> (Client<InMemoryBackend>, Id<CoverageArea>) {
        let backend = InMemoryBackend::new();
        let area = backend
            .insert_coverage_area(CoverageArea::example_data())
            .await;
        (Client::new(backend), area.id)
    }

    #[tokio::test]
    async fn sourced_shapes_merge_both_collections() {
        let (client, area_id) = client_with_area().await;
        let created = client.create_coverage_shape(circle()).await.unwrap();

        let shapes = client
            .get_sourced_shapes(&ShapeQuery::default())
            .await
            .unwrap();
        let keys = shapes.iter().map(|shape| shape.key).collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec![ShapeKey::Legacy(area_id), ShapeKey::Shape(created.id)]
        );
    }

    #[tokio::test]
    async fn save_dispatches_on_key() {
        let (client, area_id) = client_with_area().await;

        let created = client.save_shape(None, circle()).await.unwrap();
        assert!(matches!(created.key, ShapeKey::Shape(_)));

        let mut legacy = client
            .get_sourced_shape(ShapeKey::Legacy(area_id))
            .await
            .unwrap();
        legacy.shape.name = "Renamed district".to_owned();
        let saved = client
            .save_shape(Some(legacy.key), legacy.shape)
            .await
            .unwrap();
        assert_eq!(saved.key, ShapeKey::Legacy(area_id));
        assert_eq!(
            client.get_coverage_area(area_id).await.unwrap().content.name,
            "Renamed district"
        );
        // the shape collection is untouched
        assert_eq!(
            client
                .get_coverage_shapes(&ShapeQuery::default())
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn legacy_areas_reject_circles() {
        let (client, area_id) = client_with_area().await;
        let result = client
            .save_shape(Some(ShapeKey::Legacy(area_id)), circle())
            .await;
        assert!(matches!(result, Err(RequestError::Invalid(_))));
    }

    #[tokio::test]
    async fn delete_dispatches_on_key() {
        let (client, area_id) = client_with_area().await;
        let created = client.create_coverage_shape(circle()).await.unwrap();

        client.delete_shape(ShapeKey::Legacy(area_id)).await.unwrap();
        assert!(client.get_coverage_areas().await.unwrap().is_empty());
        assert_eq!(
            client
                .get_coverage_shapes(&ShapeQuery::default())
                .await
                .unwrap()
                .len(),
            1
        );

        client.delete_shape(ShapeKey::Shape(created.id)).await.unwrap();
        assert!(matches!(
            client.delete_shape(ShapeKey::Shape(created.id)).await,
            Err(RequestError::NotFound)
        ));
    }

    #[tokio::test]
    async fn declined_deletes_keep_the_shape() {
        let (client, area_id) = client_with_area().await;
        let key = ShapeKey::Legacy(area_id);

        let asked = std::sync::Mutex::new(String::new());
        let decline = |prompt: &str| {
            *asked.lock().unwrap() = prompt.to_owned();
            false
        };
        let declined = client.delete_confirmed(key, "North district", &decline).await;
        assert!(matches!(declined, Err(RequestError::Declined)));
        assert_eq!(
            asked.into_inner().unwrap(),
            "Delete coverage area 'North district'?"
        );
        assert_eq!(client.get_coverage_areas().await.unwrap().len(), 1);

        client
            .delete_confirmed(key, "North district", &true)
            .await
            .unwrap();
        assert!(client.get_coverage_areas().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_area_maps_to_none() {
        let (client, _) = client_with_area().await;
        let missing = crate::not_found_to_none(client.get_coverage_area(Id::new(99)).await);
        assert!(matches!(missing, Ok(None)));
    }
}

//! State of the coverage map view.
//!
//! Data flows one way: loaded shapes pass the [`ShapeFilter`], become
//! [`MapPoint`](model::point::MapPoint)s, feed a [`MarkerLayer`] and are
//! queried for the current viewport on every move or zoom.

use clustering::{
    points::{build_points, split_shapes},
    BoundingBox, ClusterFeature, ClusteringConfig, MarkerLayer,
};
use model::{
    source::{ShapeKey, SourcedShape},
    technician::Technician,
    WithId,
};
use serde::Serialize;

use crate::{
    backend::{CoverageBackend, ShapeQuery},
    client::Client,
    confirm::Confirm,
    drawing::{Drawing, ShapeDetails},
    filter::ShapeFilter,
    format::FormattingConfig,
    render::{MapRender, ShapeOverlay, ViewportRender},
    request::{RequestTicket, RequestTracker},
    RequestError, RequestResult,
};

pub const DEFAULT_ZOOM: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub bbox: BoundingBox,
    pub zoom: u8,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            bbox: BoundingBox::WORLD,
            zoom: DEFAULT_ZOOM,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed {
        message: String,
    },
}

/// Everything the map shows, fetched in one go.
#[derive(Debug, Clone, Default)]
pub struct LoadedData {
    pub technicians: Vec<WithId<Technician>>,
    pub shapes: Vec<SourcedShape>,
}

/// A pending load. Run it against a client, then hand the response back to
/// [`CoverageMap::finish_load`].
#[derive(Debug)]
pub struct LoadRequest {
    ticket: RequestTicket,
}

#[derive(Debug)]
pub struct LoadResponse {
    ticket: RequestTicket,
    result: RequestResult<LoadedData>,
}

impl LoadRequest {
    pub fn ticket(&self) -> &RequestTicket {
        &self.ticket
    }

    /// Fetches technicians, coverage shapes and legacy areas concurrently.
    /// Gives up with [`RequestError::Cancelled`] once a newer load starts.
    pub async fn run<B: CoverageBackend>(self, client: &Client<B>) -> LoadResponse {
        let fetch = async {
            let shape_query = ShapeQuery::default();
            let (technicians, shapes) = futures::try_join!(
                client.get_technicians(),
                client.get_sourced_shapes(&shape_query)
            )?;
            Ok::<_, RequestError>(LoadedData {
                technicians,
                shapes,
            })
        };
        let result = tokio::select! {
            biased;
            _ = self.ticket.cancelled() => Err(RequestError::Cancelled),
            result = fetch => result,
        };
        LoadResponse {
            ticket: self.ticket,
            result,
        }
    }
}

impl LoadResponse {
    pub fn new(ticket: RequestTicket, result: RequestResult<LoadedData>) -> Self {
        Self { ticket, result }
    }
}

#[derive(Debug)]
pub struct CoverageMap {
    clustering: ClusteringConfig,
    formatting: FormattingConfig,
    data: LoadedData,
    filter: ShapeFilter,
    drawing: Drawing,
    viewport: Viewport,
    layer: MarkerLayer,
    markers: Vec<ClusterFeature>,
    load_state: LoadState,
    tracker: RequestTracker,
}

impl CoverageMap {
    pub fn new(clustering: ClusteringConfig, formatting: FormattingConfig) -> Self {
        Self {
            clustering,
            formatting,
            data: LoadedData::default(),
            filter: ShapeFilter::default(),
            drawing: Drawing::new(),
            viewport: Viewport::default(),
            layer: MarkerLayer::default(),
            markers: vec![],
            load_state: LoadState::Idle,
            tracker: RequestTracker::new(),
        }
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn filter(&self) -> &ShapeFilter {
        &self.filter
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn drawing(&self) -> &Drawing {
        &self.drawing
    }

    pub fn drawing_mut(&mut self) -> &mut Drawing {
        &mut self.drawing
    }

    pub fn layer(&self) -> &MarkerLayer {
        &self.layer
    }

    pub fn markers(&self) -> &[ClusterFeature] {
        &self.markers
    }

    pub fn shapes(&self) -> &[SourcedShape] {
        &self.data.shapes
    }

    /// Shapes passing the active filter, in load order.
    pub fn visible_shapes(&self) -> Vec<SourcedShape> {
        self.filter.apply(&self.data.shapes)
    }

    pub fn begin_load(&mut self) -> LoadRequest {
        self.load_state = LoadState::Loading;
        LoadRequest {
            ticket: self.tracker.issue(),
        }
    }

    /// Applies a finished load. Responses of superseded requests are dropped
    /// and `false` is returned.
    pub fn finish_load(&mut self, response: LoadResponse) -> bool {
        self.apply_load(response).is_some()
    }

    /// `None` for a superseded response, otherwise the outcome of the load
    /// with the error it failed with.
    fn apply_load(&mut self, response: LoadResponse) -> Option<RequestResult<()>> {
        if !self.tracker.is_current(&response.ticket) {
            log::debug!(
                "dropping stale load response {}",
                response.ticket.generation()
            );
            return None;
        }
        match response.result {
            Ok(data) => {
                log::debug!(
                    "loaded {} technicians and {} shapes",
                    data.technicians.len(),
                    data.shapes.len()
                );
                self.data = data;
                self.load_state = LoadState::Loaded;
                self.rebuild();
                Some(Ok(()))
            }
            Err(why) => {
                log::error!("failed to load coverage data: {}", why);
                self.load_state = LoadState::Failed {
                    message: why.to_string(),
                };
                Some(Err(why))
            }
        }
    }

    pub async fn refresh<B: CoverageBackend>(&mut self, client: &Client<B>) -> RequestResult<()> {
        let response = self.begin_load().run(client).await;
        self.apply_load(response).unwrap_or(Err(RequestError::Cancelled))
    }

    /// Reloads after a failed load. Returns whether a reload was attempted.
    pub async fn retry<B: CoverageBackend>(&mut self, client: &Client<B>) -> RequestResult<bool> {
        if !matches!(self.load_state, LoadState::Failed { .. }) {
            return Ok(false);
        }
        self.refresh(client).await.map(|_| true)
    }

    pub fn set_filter(&mut self, filter: ShapeFilter) {
        if filter != self.filter {
            self.filter = filter;
            self.rebuild();
        }
    }

    pub fn on_move_end(&mut self, viewport: Viewport) {
        self.set_viewport(viewport);
    }

    pub fn on_zoom_end(&mut self, viewport: Viewport) {
        self.set_viewport(viewport);
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.query_markers();
    }

    /// Reruns filter, point builder and marker layer for the loaded data.
    fn rebuild(&mut self) {
        let visible = self.visible_shapes();
        let (polygons, circles) = split_shapes(&visible);
        let points = build_points(&self.data.technicians, polygons, circles);
        self.layer = MarkerLayer::build(points, &self.clustering);
        self.query_markers();
    }

    fn query_markers(&mut self) {
        self.markers = self
            .layer
            .features(&self.viewport.bbox, self.viewport.zoom);
    }

    pub fn render(&self) -> MapRender {
        MapRender {
            viewport: ViewportRender {
                bbox: self.viewport.bbox,
                zoom: self.viewport.zoom,
            },
            load_state: self.load_state.clone(),
            filter: self.filter.to_query(),
            shapes: self
                .visible_shapes()
                .iter()
                .map(|sourced| ShapeOverlay::new(sourced, &self.formatting))
                .collect(),
            clustered: self.layer.is_clustered(),
            markers: self.markers.clone(),
            drawing: self.drawing.state().clone(),
        }
    }

    /// Finishes the current drawing and saves it as a new coverage shape.
    /// A drawing that can not be finished yet stays active.
    pub async fn save_drawing<B: CoverageBackend>(
        &mut self,
        details: ShapeDetails,
        client: &Client<B>,
    ) -> RequestResult<SourcedShape> {
        let draft = self.drawing.finish()?;
        let shape = draft.into_shape(details)?;
        let saved = client.save_shape(None, shape).await?;
        self.data.shapes.push(saved.clone());
        self.rebuild();
        Ok(saved)
    }

    /// Deletes a shape after the user confirmed it. A declined confirmation
    /// does not reach the backend.
    pub async fn delete_shape<B, C>(
        &mut self,
        key: ShapeKey,
        confirm: &C,
        client: &Client<B>,
    ) -> RequestResult<()>
    where
        B: CoverageBackend,
        C: Confirm + ?Sized,
    {
        let name = self
            .data
            .shapes
            .iter()
            .find(|sourced| sourced.key == key)
            .map(|sourced| sourced.shape.name.clone())
            .unwrap_or_else(|| key.to_string());
        client.delete_confirmed(key, &name, confirm).await?;
        self.data.shapes.retain(|sourced| sourced.key != key);
        self.rebuild();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use model::{
        area::CoverageArea,
        geometry::{LatLng, ShapeGeometry},
        shape::{CoverageShape, PriorityLevel},
        summary::ShapeSummary,
        wire::{Envelope, ResultsEnvelope},
    };
    use utility::id::Id;

    use super::*;
    use crate::backend::{self, BackendError, InMemoryBackend};

    async fn seeded(technicians: usize) -> Client<InMemoryBackend> {
        let backend = InMemoryBackend::new();
        for i in 0..technicians {
            backend
                .insert_technician(Technician {
                    name: format!("Technician {}", i),
                    email: None,
                    phone: None,
                    location: Some(LatLng::new(
                        47.6 + (i / 20) as f64 * 0.001,
                        -122.3 + (i % 20) as f64 * 0.001,
                    )),
                    is_active: true,
                })
                .await;
        }
        let client = Client::new(backend);
        let mut high = CoverageShape::new(
            "High",
            ShapeGeometry::circle(LatLng::new(47.6, -122.3), 500.0).unwrap(),
        );
        high.priority_level = Some(PriorityLevel::High);
        let mut low = CoverageShape::new(
            "Low",
            ShapeGeometry::polygon(vec![
                LatLng::new(47.5, -122.4),
                LatLng::new(47.5, -122.2),
                LatLng::new(47.7, -122.2),
            ])
            .unwrap(),
        );
        low.priority_level = Some(PriorityLevel::Low);
        client.create_coverage_shape(high).await.unwrap();
        client.create_coverage_shape(low).await.unwrap();
        client
    }

    fn map() -> CoverageMap {
        CoverageMap::new(ClusteringConfig::default(), FormattingConfig::default())
    }

    #[tokio::test]
    async fn small_data_sets_render_individual_markers() {
        let client = seeded(10).await;
        let mut map = map();
        map.refresh(&client).await.unwrap();

        assert_eq!(map.load_state(), &LoadState::Loaded);
        assert!(!map.layer().is_clustered());
        // 10 technicians, one polygon centroid, one circle center
        assert_eq!(map.markers().len(), 12);
        let render = map.render();
        assert_eq!(render.shapes.len(), 2);
        assert!(!render.clustered);
    }

    #[tokio::test]
    async fn large_data_sets_are_clustered() {
        let client = seeded(250).await;
        let mut map = map();
        map.refresh(&client).await.unwrap();

        assert!(map.layer().is_clustered());
        assert!(map.markers().len() < 252);
        let total = map
            .markers()
            .iter()
            .map(ClusterFeature::point_count)
            .sum::<usize>();
        assert_eq!(total, 252);

        map.on_zoom_end(Viewport {
            bbox: BoundingBox::WORLD,
            zoom: 19,
        });
        assert_eq!(map.markers().len(), 252);
    }

    #[tokio::test]
    async fn filter_changes_rebuild_markers() {
        let client = seeded(0).await;
        let mut map = map();
        map.refresh(&client).await.unwrap();
        assert_eq!(map.markers().len(), 2);

        map.set_filter(ShapeFilter::from_query("priority=1"));
        assert_eq!(map.markers().len(), 1);
        let render = map.render();
        assert_eq!(render.filter, "priority=1");
        assert_eq!(render.shapes.len(), 1);
        assert_eq!(render.shapes[0].name, "High");
    }

    #[tokio::test]
    async fn stale_responses_are_dropped() {
        let client = seeded(3).await;
        let mut map = map();

        let first = map.begin_load();
        let second = map.begin_load();
        let stale = first.run(&client).await;
        assert!(matches!(stale.result, Err(RequestError::Cancelled)));
        assert!(!map.finish_load(stale));
        assert_eq!(map.load_state(), &LoadState::Loading);

        let fresh = second.run(&client).await;
        assert!(map.finish_load(fresh));
        assert_eq!(map.load_state(), &LoadState::Loaded);
        assert_eq!(map.markers().len(), 5);
    }

    #[tokio::test]
    async fn superseded_success_does_not_overwrite() {
        let client = seeded(3).await;
        let mut map = map();
        let old = map.begin_load();
        let old_ticket = old.ticket().clone();
        let _newer = map.begin_load();
        let response = LoadResponse::new(old_ticket, Ok(LoadedData::default()));
        assert!(!map.finish_load(response));
        assert!(map.shapes().is_empty());
        drop(client);
    }

    #[tokio::test]
    async fn deletes_need_confirmation() {
        let client = seeded(0).await;
        let mut map = map();
        map.refresh(&client).await.unwrap();
        let key = map.shapes()[0].key;

        let declined = map.delete_shape(key, &false, &client).await;
        assert!(matches!(declined, Err(RequestError::Declined)));
        assert_eq!(client.get_coverage_shapes(&ShapeQuery::default()).await.unwrap().len(), 2);

        map.delete_shape(key, &true, &client).await.unwrap();
        assert_eq!(map.shapes().len(), 1);
        assert_eq!(client.get_coverage_shapes(&ShapeQuery::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn drawings_are_saved_as_shapes() {
        let client = seeded(0).await;
        let mut map = map();
        map.refresh(&client).await.unwrap();

        map.drawing_mut().start_polygon().unwrap();
        map.drawing_mut().click(LatLng::new(1.0, 1.0));
        map.drawing_mut().click(LatLng::new(1.0, 2.0));
        let details = ShapeDetails {
            name: "New".to_owned(),
            ..ShapeDetails::default()
        };
        assert!(matches!(
            map.save_drawing(details.clone(), &client).await,
            Err(RequestError::Invalid(_))
        ));
        assert!(map.drawing().is_drawing());

        map.drawing_mut().click(LatLng::new(2.0, 2.0));
        let saved = map.save_drawing(details, &client).await.unwrap();
        assert_eq!(saved.shape.geometry.ring().unwrap().len(), 3);
        assert_eq!(map.shapes().len(), 3);
        assert!(!map.drawing().is_drawing());
    }

    #[derive(Debug, Clone)]
    struct FailingBackend;

    #[async_trait]
    impl CoverageBackend for FailingBackend {
        async fn coverage_areas(&self) -> backend::Result<ResultsEnvelope<WithId<CoverageArea>>> {
            Err(BackendError::Invalid("unavailable".to_owned()))
        }

        async fn update_coverage_area(
            &self,
            _id: Id<CoverageArea>,
            _area: CoverageArea,
        ) -> backend::Result<Envelope<WithId<CoverageArea>>> {
            Err(BackendError::NotFound)
        }

        async fn delete_coverage_area(&self, _id: Id<CoverageArea>) -> backend::Result<()> {
            Err(BackendError::NotFound)
        }

        async fn coverage_shapes(
            &self,
            _query: &ShapeQuery,
        ) -> backend::Result<ResultsEnvelope<WithId<CoverageShape>>> {
            Err(BackendError::Invalid("unavailable".to_owned()))
        }

        async fn coverage_shape(
            &self,
            _id: Id<CoverageShape>,
        ) -> backend::Result<Envelope<WithId<CoverageShape>>> {
            Err(BackendError::NotFound)
        }

        async fn create_coverage_shape(
            &self,
            _shape: CoverageShape,
        ) -> backend::Result<Envelope<WithId<CoverageShape>>> {
            Err(BackendError::Invalid("unavailable".to_owned()))
        }

        async fn update_coverage_shape(
            &self,
            _id: Id<CoverageShape>,
            _shape: CoverageShape,
        ) -> backend::Result<Envelope<WithId<CoverageShape>>> {
            Err(BackendError::NotFound)
        }

        async fn delete_coverage_shape(&self, _id: Id<CoverageShape>) -> backend::Result<()> {
            Err(BackendError::NotFound)
        }

        async fn technicians(&self) -> backend::Result<ResultsEnvelope<WithId<Technician>>> {
            Err(BackendError::Invalid("unavailable".to_owned()))
        }

        async fn coverage_shape_summary(&self) -> backend::Result<Envelope<ShapeSummary>> {
            Err(BackendError::Invalid("unavailable".to_owned()))
        }
    }

    #[tokio::test]
    async fn failed_loads_can_be_retried() {
        let mut map = map();
        assert!(!map.retry(&Client::new(FailingBackend)).await.unwrap());

        assert!(matches!(
            map.refresh(&Client::new(FailingBackend)).await,
            Err(RequestError::Invalid(why)) if why == "unavailable"
        ));
        assert_eq!(
            map.load_state(),
            &LoadState::Failed {
                message: "invalid request: unavailable".to_owned()
            }
        );

        let client = seeded(1).await;
        assert!(map.retry(&client).await.unwrap());
        assert_eq!(map.load_state(), &LoadState::Loaded);
    }
}

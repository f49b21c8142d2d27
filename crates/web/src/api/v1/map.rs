//! The coverage map as one resource. Every request loads the current
//! backend state into a fresh [`CoverageMap`] and queries it for the
//! requested viewport.

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::Method,
    routing::{get, on},
    Extension, Router,
};
use clustering::{BoundingBox, ClusterError, ClusterFeature};
use coverage::{
    filter::{FilterQuery, ShapeFilter},
    map::{CoverageMap, Viewport, DEFAULT_ZOOM},
    render::MapRender,
};
use model::point::MapPoint;
use serde::{Deserialize, Serialize};

use crate::{
    api::v1::shapes,
    common::{route_not_found, HateoasResult, RouteErrorResponse, METHOD_FILTER_ALL},
    hateoas,
    middleware::base_url::{base_url_middleware, BaseUrl},
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/map{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub const DEFAULT_LEAF_LIMIT: usize = 10;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/clusters/:id", get(get_cluster))
        .route("/", get(get_map))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MapParams {
    /// `west,south,east,north`, the whole world when missing.
    bbox: Option<String>,
    zoom: Option<u8>,
    priority: Option<String>,
    services: Option<String>,
}

impl MapParams {
    fn viewport(&self) -> Result<Viewport, ClusterError> {
        let bbox = match &self.bbox {
            Some(bbox) => bbox.parse()?,
            None => BoundingBox::WORLD,
        };
        Ok(Viewport {
            bbox,
            zoom: self.zoom.unwrap_or(DEFAULT_ZOOM),
        })
    }

    fn filter(&self) -> ShapeFilter {
        ShapeFilter::from(FilterQuery {
            priority: self.priority.clone(),
            services: self.services.clone(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LeafParams {
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterExpansion {
    pub cluster_id: usize,
    pub expansion_zoom: u8,
    pub children: Vec<ClusterFeature>,
    pub leaves: Vec<MapPoint>,
}

async fn load_map(
    state: &WebState,
    params: &MapParams,
) -> Result<CoverageMap, RouteErrorResponse> {
    let viewport = params.viewport()?;
    let mut map = CoverageMap::new(state.clustering.clone(), state.formatting.clone());
    map.set_filter(params.filter());
    map.on_move_end(viewport);
    map.refresh(&state.coverage_client).await?;
    Ok(map)
}

async fn get_map(
    OriginalUri(original_uri): OriginalUri,
    Query(params): Query<MapParams>,
    State(state): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<MapRender> {
    let map = load_map(&state, &params)
        .await
        .map_err(|why| why.with_method(&Method::GET).with_uri(original_uri.path()))?;
    let render = map.render();
    let filter = Some(render.filter.clone()).filter(|filter| !filter.is_empty());
    let response = hateoas::Response::builder(render, base_url)
        .link("self", resource!("/"))
        .link("shapes", shapes::resource!("/"))
        .link_option(
            "filtered_shapes",
            filter.map(|filter| shapes::resource!("?{}", filter)),
        )
        .link("summary", shapes::resource!("/summary"))
        .debug_info("point_count", map.layer().len())
        .debug_info("activation_threshold", state.clustering.activation_threshold)
        .build();
    Ok(response.json())
}

async fn get_cluster(
    OriginalUri(original_uri): OriginalUri,
    Path(cluster_id): Path<usize>,
    Query(params): Query<MapParams>,
    Query(page): Query<LeafParams>,
    State(state): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<ClusterExpansion> {
    let with_request =
        |why: RouteErrorResponse| why.with_method(&Method::GET).with_uri(original_uri.path());
    let map = load_map(&state, &params).await.map_err(with_request)?;
    let expansion = map
        .layer()
        .index()
        .ok_or(ClusterError::NoSuchCluster(cluster_id))
        .and_then(|index| {
            Ok(ClusterExpansion {
                cluster_id,
                expansion_zoom: index.expansion_zoom(cluster_id)?,
                children: index.get_children(cluster_id)?,
                leaves: index.get_leaves(
                    cluster_id,
                    page.limit.unwrap_or(DEFAULT_LEAF_LIMIT),
                    page.offset.unwrap_or_default(),
                )?,
            })
        })
        .map_err(|why| with_request(RouteErrorResponse::from(why)))?;
    let response = hateoas::Response::builder(expansion, base_url)
        .link("self", resource!("/clusters/{}", cluster_id))
        .link("map", resource!("/"))
        .build();
    Ok(response.json())
}

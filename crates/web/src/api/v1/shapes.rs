use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{Method, StatusCode},
    routing::{get, on},
    Extension, Json, Router,
};
use coverage::{
    backend::ShapeQuery,
    filter::{FilterQuery, ShapeFilter},
};
use model::{
    geometry::AreaType,
    shape::CoverageShape,
    source::{ShapeKey, SourcedShape},
    summary::ShapeSummary,
    wire::Envelope,
};
use serde::Deserialize;
use utility::id::Id;

use crate::{
    api::v1::technicians,
    common::{
        route_not_found, schema, ConfirmParams, HateoasResult, ListResult, RouteErrorResponse,
        RouteResult, METHOD_FILTER_ALL,
    },
    hateoas,
    middleware::base_url::{base_url_middleware, BaseUrl},
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/shapes{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/schema", get(schema::<CoverageShape>))
        .route("/summary", get(get_summary))
        .route("/:key", get(get_shape).put(update_shape).delete(delete_shape))
        .route("/", get(get_shapes).post(create_shape))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

/// Query parameters of the shape list. `priority` and `services` filter
/// like the map does, the rest narrows the backend query.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ShapeListParams {
    priority: Option<String>,
    services: Option<String>,
    is_active: Option<bool>,
    area_type: Option<AreaType>,
    technician: Option<i64>,
}

impl ShapeListParams {
    fn query(&self) -> ShapeQuery {
        ShapeQuery {
            is_active: self.is_active,
            area_type: self.area_type,
            technician: self.technician.map(Id::new),
        }
    }

    fn filter(&self) -> ShapeFilter {
        ShapeFilter::from(FilterQuery {
            priority: self.priority.clone(),
            services: self.services.clone(),
        })
    }
}

/// Shape keys look like `shape-3` or `legacy-1`, a bare number addresses a
/// coverage shape.
fn parse_key(value: &str) -> Result<ShapeKey, RouteErrorResponse> {
    value
        .parse::<ShapeKey>()
        .or_else(|why| value.trim().parse().map(ShapeKey::Shape).map_err(|_| why))
        .map_err(|why| RouteErrorResponse::bad_request(why.to_string()))
}

async fn get_shapes(
    OriginalUri(original_uri): OriginalUri,
    Query(params): Query<ShapeListParams>,
    State(WebState {
        coverage_client, ..
    }): State<WebState>,
) -> ListResult<SourcedShape> {
    coverage_client
        .get_sourced_shapes(&params.query())
        .await
        .map(|shapes| Json(Envelope::results(params.filter().apply(&shapes))))
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

async fn get_summary(
    OriginalUri(original_uri): OriginalUri,
    State(WebState {
        coverage_client, ..
    }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<ShapeSummary> {
    coverage_client
        .get_coverage_shape_summary()
        .await
        .map(|summary| {
            hateoas::Response::builder(summary, base_url)
                .link("self", resource!("/summary"))
                .link("shapes", resource!("/"))
                .build()
                .json()
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

async fn get_shape(
    OriginalUri(original_uri): OriginalUri,
    Path(key): Path<String>,
    State(WebState {
        coverage_client, ..
    }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<SourcedShape> {
    let with_request =
        |why: RouteErrorResponse| why.with_method(&Method::GET).with_uri(original_uri.path());
    let key = parse_key(&key).map_err(with_request)?;
    coverage_client
        .get_sourced_shape(key)
        .await
        .map(|shape| shape_hateoas(shape, base_url).json())
        .map_err(|why| with_request(RouteErrorResponse::from(why)))
}

async fn create_shape(
    OriginalUri(original_uri): OriginalUri,
    State(WebState {
        coverage_client, ..
    }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(shape): Json<CoverageShape>,
) -> RouteResult<(StatusCode, Json<hateoas::Response<SourcedShape>>)> {
    coverage_client
        .save_shape(None, shape)
        .await
        .map(|shape| {
            log::info!("created {}", shape.key);
            (StatusCode::CREATED, shape_hateoas(shape, base_url).json())
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::POST)
                .with_uri(original_uri.path())
        })
}

async fn update_shape(
    OriginalUri(original_uri): OriginalUri,
    Path(key): Path<String>,
    State(WebState {
        coverage_client, ..
    }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(shape): Json<CoverageShape>,
) -> HateoasResult<SourcedShape> {
    let with_request =
        |why: RouteErrorResponse| why.with_method(&Method::PUT).with_uri(original_uri.path());
    let key = parse_key(&key).map_err(with_request)?;
    coverage_client
        .save_shape(Some(key), shape)
        .await
        .map(|shape| shape_hateoas(shape, base_url).json())
        .map_err(|why| with_request(RouteErrorResponse::from(why)))
}

/// Answers `409 Conflict` unless called with `?confirm=true`.
async fn delete_shape(
    OriginalUri(original_uri): OriginalUri,
    Path(key): Path<String>,
    Query(params): Query<ConfirmParams>,
    State(WebState {
        coverage_client, ..
    }): State<WebState>,
) -> RouteResult<StatusCode> {
    let with_request =
        |why: RouteErrorResponse| why.with_method(&Method::DELETE).with_uri(original_uri.path());
    let key = parse_key(&key).map_err(with_request)?;
    coverage_client
        .delete_confirmed(key, &key.to_string(), &params.confirm)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(|why| with_request(RouteErrorResponse::from(why)))
}

pub(crate) fn shape_hateoas(
    sourced: SourcedShape,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<SourcedShape> {
    let technician = sourced
        .shape
        .technician
        .map(|technician| technicians::resource!("/{}", technician));
    let key = sourced.key;
    hateoas::Response::builder(sourced, base_url)
        .link("self", resource!("/{}", key))
        .link_option("technician", technician)
        .build()
}

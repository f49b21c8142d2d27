use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, State},
    http::Method,
    routing::{get, on},
    Extension, Json, Router,
};
use coverage::RequestError;
use model::{technician::Technician, wire::Envelope, WithId};
use utility::id::Id;

use crate::{
    api::v1::shapes,
    common::{
        route_not_found, schema, HateoasResult, ListResult, RouteErrorResponse,
        METHOD_FILTER_ALL,
    },
    hateoas,
    middleware::base_url::{base_url_middleware, BaseUrl},
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/technicians{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/schema", get(schema::<Technician>))
        .route("/:id", get(get_technician))
        .route("/", get(get_technicians))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_technicians(
    OriginalUri(original_uri): OriginalUri,
    State(WebState {
        coverage_client, ..
    }): State<WebState>,
) -> ListResult<WithId<Technician>> {
    coverage_client
        .get_technicians()
        .await
        .map(|technicians| Json(Envelope::results(technicians)))
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

async fn get_technician(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<i64>,
    State(WebState {
        coverage_client, ..
    }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<Technician> {
    let id = Id::<Technician>::new(id);
    coverage_client
        .get_technicians()
        .await
        .and_then(|technicians| {
            technicians
                .into_iter()
                .find(|technician| technician.id == id)
                .ok_or(RequestError::NotFound)
        })
        .map(|technician| technician_hateoas(technician, base_url).json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

pub(crate) fn technician_hateoas(
    technician: WithId<Technician>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<Technician> {
    hateoas::Response::builder(technician.content, base_url)
        .link("self", resource!("/{}", technician.id))
        .link("shapes", shapes::resource!("?technician={}", technician.id))
        .build()
}

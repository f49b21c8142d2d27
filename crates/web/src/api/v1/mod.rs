use std::sync::Arc;

use axum::{
    routing::{get, on},
    Extension, Router,
};
use serde::Serialize;

use crate::{
    common::{route_not_found, HateoasResult, METHOD_FILTER_ALL},
    hateoas,
    middleware::base_url::{base_url_middleware, BaseUrl},
    WebState,
};

mod areas;
mod map;
mod shapes;
mod technicians;

#[cfg(test)]
mod test_support;

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::resource!("/v1{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/", get(index))
        .nest_service("/technicians", technicians::routes(state.clone()))
        .nest_service("/areas", areas::routes(state.clone()))
        .nest_service("/shapes", shapes::routes(state.clone()))
        .nest_service("/map", map::routes(state.clone()))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Serialize)]
struct ApiIndex {
    version: &'static str,
}

async fn index(Extension(base_url): Extension<Arc<BaseUrl>>) -> HateoasResult<ApiIndex> {
    Ok(hateoas::Response::builder(ApiIndex { version: "v1" }, base_url)
        .link("technicians", technicians::resource!("/"))
        .link("areas", areas::resource!("/"))
        .link("shapes", shapes::resource!("/"))
        .link("summary", shapes::resource!("/summary"))
        .link("map", map::resource!("/"))
        .build()
        .json())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn index_links_every_resource() {
        let axum::Json(response) = index(test_support::base_url()).await.unwrap();
        assert_eq!(response.content.version, "v1");
        assert_eq!(
            response.link("map"),
            Some("http://localhost/api/v1/map/")
        );
        assert_eq!(response.links.len(), 5);
    }
}

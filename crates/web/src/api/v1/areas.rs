use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{Method, StatusCode},
    routing::{get, on},
    Extension, Json, Router,
};
use model::{area::CoverageArea, source::ShapeKey, wire::Envelope, WithId};
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
        crate::api::v1::resource!("/areas{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/schema", get(schema::<CoverageArea>))
        .route("/:id", get(get_area).put(update_area).delete(delete_area))
        .route("/", get(get_areas))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_areas(
    OriginalUri(original_uri): OriginalUri,
    State(WebState {
        coverage_client, ..
    }): State<WebState>,
) -> ListResult<WithId<CoverageArea>> {
    coverage_client
        .get_coverage_areas()
        .await
        .map(|areas| Json(Envelope::results(areas)))
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

async fn get_area(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<i64>,
    State(WebState {
        coverage_client, ..
    }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<CoverageArea> {
    coverage_client
        .get_coverage_area(Id::new(id))
        .await
        .map(|area| area_hateoas(area, base_url).json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

async fn update_area(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<i64>,
    State(WebState {
        coverage_client, ..
    }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(area): Json<CoverageArea>,
) -> HateoasResult<CoverageArea> {
    coverage_client
        .update_coverage_area(Id::new(id), area)
        .await
        .map(|area| {
            log::info!("updated legacy area {}", area.id);
            area_hateoas(area, base_url).json()
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::PUT)
                .with_uri(original_uri.path())
        })
}

/// Answers `409 Conflict` unless called with `?confirm=true`.
async fn delete_area(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<i64>,
    Query(params): Query<ConfirmParams>,
    State(WebState {
        coverage_client, ..
    }): State<WebState>,
) -> RouteResult<StatusCode> {
    let key = ShapeKey::Legacy(Id::new(id));
    coverage_client
        .delete_confirmed(key, &key.to_string(), &params.confirm)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::DELETE)
                .with_uri(original_uri.path())
        })
}

pub(crate) fn area_hateoas(
    area: WithId<CoverageArea>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<CoverageArea> {
    let technician = area
        .content
        .technician
        .map(|technician| technicians::resource!("/{}", technician));
    hateoas::Response::builder(area.content, base_url)
        .link("self", resource!("/{}", area.id))
        .link_option("technician", technician)
        .build()
}

#[cfg(test)]
mod tests {
    use model::shape::PriorityLevel;

    use super::*;
    use crate::api::v1::test_support::{base_url, harbor_area, seeded_state, uri};

    #[tokio::test]
    async fn lists_legacy_areas() {
        let Json(envelope) = get_areas(uri("/api/v1/areas"), seeded_state().await)
            .await
            .unwrap();
        let areas = envelope.into_results();
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].content, harbor_area());
    }

    #[tokio::test]
    async fn updates_keep_the_area_id() {
        let mut area = harbor_area();
        area.priority_level = Some(PriorityLevel::High);
        area.technician = Some(Id::new(1));
        let Json(response) = update_area(
            uri("/api/v1/areas/1"),
            Path(1),
            seeded_state().await,
            base_url(),
            Json(area),
        )
        .await
        .unwrap();
        assert_eq!(response.content.priority_level, Some(PriorityLevel::High));
        assert_eq!(response.link("self"), Some("http://localhost/api/v1/areas/1"));
        assert_eq!(
            response.link("technician"),
            Some("http://localhost/api/v1/technicians/1")
        );
    }

    #[tokio::test]
    async fn unconfirmed_delete_keeps_the_area() {
        let state = seeded_state().await;
        let error = delete_area(
            uri("/api/v1/areas/1"),
            Path(1),
            Query(ConfirmParams::default()),
            state.clone(),
        )
        .await
        .unwrap_err();
        assert_eq!(error.status_code, StatusCode::CONFLICT);
        assert_eq!(error.http_method.as_deref(), Some("DELETE"));

        let State(state) = state;
        assert_eq!(state.coverage_client.get_coverage_areas().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn confirmed_delete_removes_the_area() {
        let state = seeded_state().await;
        let status = delete_area(
            uri("/api/v1/areas/1"),
            Path(1),
            Query(ConfirmParams { confirm: true }),
            state.clone(),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let State(state) = state;
        assert!(state.coverage_client.get_coverage_areas().await.unwrap().is_empty());
    }
}

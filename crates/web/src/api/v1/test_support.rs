use std::sync::Arc;

use axum::{
    extract::{OriginalUri, State},
    http::Uri,
    Extension,
};
use coverage::backend::InMemoryBackend;
use model::{
    area::CoverageArea,
    geometry::{LatLng, ShapeGeometry},
    shape::{CoverageShape, PriorityLevel},
    technician::Technician,
};

use crate::{middleware::base_url::BaseUrl, WebState};

pub(super) fn uri(path: &'static str) -> OriginalUri {
    OriginalUri(Uri::from_static(path))
}

pub(super) fn base_url() -> Extension<Arc<BaseUrl>> {
    Extension(Arc::new(BaseUrl::default()))
}

pub(super) fn technician(name: &str, lat: f64, lng: f64) -> Technician {
    Technician {
        name: name.to_owned(),
        email: None,
        phone: None,
        location: Some(LatLng::new(lat, lng)),
        is_active: true,
    }
}

pub(super) fn harbor_area() -> CoverageArea {
    CoverageArea {
        name: "Harbor".to_owned(),
        description: None,
        technician: None,
        ring: vec![
            LatLng::new(54.30, 10.10),
            LatLng::new(54.30, 10.20),
            LatLng::new(54.35, 10.20),
        ],
        service_types: vec!["plumbing".to_owned()],
        priority_level: Some(PriorityLevel::Low),
        is_active: true,
    }
}

pub(super) fn downtown_circle() -> CoverageShape {
    let mut shape = CoverageShape::new(
        "Downtown",
        ShapeGeometry::Circle {
            center: LatLng::new(54.32, 10.13),
            radius_m: 800.0,
        },
    );
    shape.priority_level = Some(PriorityLevel::High);
    shape.service_types = vec!["hvac".to_owned()];
    shape
}

/// One technician, one legacy area and one circle shape.
pub(super) async fn seeded_state() -> State<WebState> {
    let backend = InMemoryBackend::new();
    backend
        .insert_technician(technician("Jamie Rivera", 54.32, 10.12))
        .await;
    backend.insert_coverage_area(harbor_area()).await;
    let state = WebState::new(backend);
    state
        .coverage_client
        .create_coverage_shape(downtown_circle())
        .await
        .unwrap();
    State(state)
}

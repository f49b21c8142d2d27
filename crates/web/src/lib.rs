pub use crate::common::RouteResult;

use std::{env, path::PathBuf};

use axum::{extract::FromRef, Router};
use clustering::ClusteringConfig;
use coverage::{backend::InMemoryBackend, client::Client, format::FormattingConfig};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod common;
pub mod hateoas;
pub mod middleware;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

#[derive(Clone, FromRef)]
pub struct WebState {
    pub coverage_client: Client<InMemoryBackend>,
    pub clustering: ClusteringConfig,
    pub formatting: FormattingConfig,
}

impl WebState {
    pub fn new(backend: InMemoryBackend) -> Self {
        Self {
            coverage_client: Client::new(backend),
            clustering: ClusteringConfig::default(),
            formatting: FormattingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub seed_file: Option<PathBuf>,
}

impl ServiceConfig {
    /// Reads `COVERAGE_BIND_ADDRESS` and `COVERAGE_SEED_FILE`.
    pub fn from_env() -> Self {
        Self {
            bind_address: env::var("COVERAGE_BIND_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_owned()),
            seed_file: env::var_os("COVERAGE_SEED_FILE").map(PathBuf::from),
        }
    }
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .nest_service("/api", api::routes(state))
        .layer(TraceLayer::new_for_http())
}

pub async fn start_web_server(state: WebState, bind_address: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_address).await?;
    log::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state).into_make_service()).await?;

    Ok(())
}

use std::process;

use clustering::ClusteringConfig;
use coverage::{backend::InMemoryBackend, client::Client, format::FormattingConfig};
use web::{start_web_server, ServiceConfig, WebState};

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = ServiceConfig::from_env();

    // backend
    let backend = match &config.seed_file {
        Some(path) => match InMemoryBackend::from_seed_file(path).await {
            Ok(backend) => backend,
            Err(why) => {
                log::error!("could not read seed file {}: {}", path.display(), why);
                process::exit(1);
            }
        },
        None => {
            log::warn!("COVERAGE_SEED_FILE is not set, starting with an empty backend");
            InMemoryBackend::new()
        }
    };

    // web server
    let state = WebState {
        coverage_client: Client::new(backend),
        clustering: ClusteringConfig::from_env(),
        formatting: FormattingConfig::from_env(),
    };

    if let Err(why) = start_web_server(state, &config.bind_address).await {
        log::error!("web server stopped: {}", why);
        process::exit(1);
    }
}

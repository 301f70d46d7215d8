use std::sync::Arc;

use clap::Parser;

use bankfeed::config::{CliArgs, Config};
use bankfeed::http::{router, AppState};
use bankfeed::remote::HttpRemoteClient;
use bankfeed::store::InMemoryStore;

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();
    let config = Arc::new(Config::load(&cli));

    init_tracing(&config);

    if config.remote.client_id.is_empty() || config.remote.secret.is_empty() {
        tracing::warn!("remote.client_id or remote.secret is empty; remote calls will be rejected");
    }

    let remote = Arc::new(HttpRemoteClient::new(
        &config.remote.base_url,
        &config.remote.client_id,
        &config.remote.secret,
    ));
    let store = Arc::new(InMemoryStore::new());

    let state = AppState {
        remote,
        store,
        config: config.clone(),
    };

    let app = router(state, Arc::new(config.auth.clone()));
    let addr = config.listen_addr();

    tracing::info!(%addr, store_data = config.sync.store_data, "API listening");

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

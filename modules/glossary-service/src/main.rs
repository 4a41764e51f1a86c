//! Glossary Service — standalone binary serving the glossary HTTP API.
//!
//! Terms live in a single JSON document loaded at startup.
//! Default: http://127.0.0.1:8000/

mod config;
mod error;
mod routes;
mod store;

use config::Config;
use routes::AppState;
use std::sync::Arc;
use std::time::Instant;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();

    log::info!("Opening glossary document at: {}", config.data_path.display());
    let store = match store::TermStore::open(&config.data_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    log::info!("Serving {} terms from {}", store.len(), store.path().display());

    let state = Arc::new(AppState {
        store,
        start_time: Instant::now(),
    });

    let app = routes::router(state);

    let addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    log::info!("Glossary Service listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        log::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

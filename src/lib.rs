pub mod adapters;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod live;
pub mod ports;
pub mod state;
pub mod store;
pub mod types;

mod assets;
mod templates;

use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "timetrack=info,tower_http=info";

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error(transparent)]
    Store(#[from] store::StoreError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Server(std::io::Error),
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

pub async fn serve(config: config::AppConfig) -> Result<(), ServeError> {
    let store = store::Store::open(&config.db_path)?;
    let addr = config.bind;
    let state = state::AppState::new(config, store);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app::app(state))
        .await
        .map_err(ServeError::Server)
}

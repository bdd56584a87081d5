use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;

mod error;
pub mod logs;
pub mod system;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,

    pub store: Store,
}

pub async fn create_app_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    Ok(Arc::new(AppState {
        config: config.clone(),
        store,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config.server.cors_allowed_origins.clone();

    // The literal /logs/stats route wins over /logs/{id}, so "stats" is never
    // parsed as an id.
    let api_router = Router::new()
        .route("/logs", post(logs::ingest).get(logs::query_logs))
        .route("/logs/bulk", post(logs::ingest_bulk))
        .route("/logs/stats", get(logs::get_stats))
        .route("/logs/{id}", get(logs::get_log));

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/health", get(system::health))
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

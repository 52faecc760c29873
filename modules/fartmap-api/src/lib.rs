use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

use fartmap_common::Config;
use fartmap_stats::ClusterParams;
use fartmap_store::{EventLog, EventStore};

pub mod auth;
pub mod error;
pub mod rest;

pub struct AppState {
    pub log: EventLog<Arc<dyn EventStore>>,
    pub api_secret: String,
    pub admin_key: String,
    pub cluster: ClusterParams,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EventStore>,
        api_secret: impl Into<String>,
        admin_key: impl Into<String>,
        cluster: ClusterParams,
    ) -> Self {
        Self {
            log: EventLog::new(store),
            api_secret: api_secret.into(),
            admin_key: admin_key.into(),
            cluster,
        }
    }

    pub fn from_config(store: Arc<dyn EventStore>, config: &Config) -> Self {
        Self::new(
            store,
            config.api_secret.clone(),
            config.admin_key.clone(),
            ClusterParams {
                threshold: config.hot_zone_threshold,
                min_cluster_size: config.hot_zone_min_size,
            },
        )
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Events
        .route(
            "/events",
            get(rest::list_events)
                .post(rest::submit::submit_event)
                .delete(rest::clear_events),
        )
        // Derived views
        .route("/hot-zones", get(rest::hot_zones))
        .route("/leaderboard", get(rest::leaderboard))
        .route("/profile/{device_id}", get(rest::profile))
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Privacy headers: no caching
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Logging layer: method + path + status + latency only (no query params, no IP)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

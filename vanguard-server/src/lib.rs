pub mod api;
pub mod error;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{AllowMethods, Any, CorsLayer};
use vanguard::cluster::ClusterSet;
use vanguard::config::Config;
use vanguard::notify::NotifierClient;
use vanguard::storage::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub notifier: NotifierClient,
    pub per_page: usize,
    pub clustered: Arc<ClusterSet>,
}

impl AppState {
    pub fn new(store: Store, notifier: NotifierClient, config: &Config) -> Self {
        Self { store, notifier, per_page: config.per_page, clustered: Arc::new(config.clustered.clone()) }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/stats", get(api::stats))
        .route("/categories", get(api::categories))
        .route("/categories/{slug}", put(api::put_category))
        .route("/home", get(api::home))
        .route("/posts", get(api::list_posts).post(api::create_post))
        .route("/posts/{id}", get(api::post_detail))
        .route("/posts/{id}/publish", post(api::publish_post))
        .route("/posts/{id}/comments", post(api::add_comment))
        .route("/posts/{id}/reactions", post(api::react))
        .route("/comments/{id}", delete(api::delete_comment))
        .with_state(state)
}

pub fn build_cors(origins: &[String]) -> CorsLayer {
    let list = origins.iter().filter_map(|s| HeaderValue::from_str(s.trim()).ok()).collect::<Vec<_>>();
    if !list.is_empty() {
        return CorsLayer::new().allow_origin(list).allow_methods(AllowMethods::any()).allow_headers(Any);
    }
    CorsLayer::new().allow_origin(Any).allow_methods(AllowMethods::any()).allow_headers(Any)
}

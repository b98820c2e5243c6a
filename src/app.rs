use std::sync::Arc;

use axum::http::Method;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::GateConfig;
use crate::errors::AppError;
use crate::routes::{guard, health, pages};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GateConfig>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: GateConfig) -> Result<Self, AppError> {
        // Upstream redirects are handed back to the browser, not followed here.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }
}

/// Puts the route guard in front of every route of `router`, fallback
/// included.
pub fn guarded<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn(guard::route_guard))
}

pub async fn create_app(config: GateConfig) -> Result<Router, AppError> {
    let state = AppState::new(config)?;

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/api/health", get(health::health))
        .fallback(pages::forward)
        .with_state(state);

    let router = guarded(router)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}

/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use pingcrm_api::{app::{build_router, AppState}, config::Config};
/// use pingcrm_shared::store::memory::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let state = AppState::new(Arc::new(MemoryStore::new()), Config::in_memory());
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use pingcrm_shared::{
    models::{Account, Contact, Organization, User},
    store::RecordStore,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{
    config::Config,
    middleware::error_envelope::{error_envelope, handle_panic},
    routes::{self, resources::API_PREFIX},
};

/// Shared application state
///
/// Cloned for each request by Axum's `State` extractor; both members are
/// reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Record store every handler opens its unit of work from
    pub store: Arc<dyn RecordStore>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_is_permissive() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::LOCATION])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health
/// └── /api/v1/
///     ├── /accounts[/:id]
///     ├── /users[/:id]
///     ├── /organizations[/:id]
///     └── /contacts[/:id]
/// ```
///
/// Layers, innermost first: error envelope, panic catcher, request tracing,
/// CORS.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(routes::resources::routes::<Account>())
        .merge(routes::resources::routes::<User>())
        .merge(routes::resources::routes::<Organization>())
        .merge(routes::resources::routes::<Contact>());

    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest(API_PREFIX, api_routes)
        .fallback(routes::fallback)
        .layer(axum::middleware::from_fn(error_envelope))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_builds_for_explicit_origins() {
        let mut config = Config::in_memory();
        config.api.cors_origins = vec!["https://crm.example.com".to_string()];

        assert!(!config.cors_is_permissive());
        let _layer = cors_layer(&config);
    }
}

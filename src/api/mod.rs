//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP endpoints of the Foodgram backend:
//! - User and token endpoints
//! - Recipe endpoints with favorites, shopping cart and short links
//! - Tag and ingredient lookups
//! - Short link redirects and media file serving

pub mod auth;
pub mod common;
pub mod ingredients;
pub mod middleware;
pub mod recipes;
pub mod responses;
pub mod short_links;
pub mod tags;
pub mod users;


use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the `/api` router
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .merge(users::router())
        .merge(auth::router())
        .merge(recipes::router())
        .merge(tags::router())
        .merge(ingredients::router())
}

fn cors_layer(cors_origin: &str) -> CorsLayer {
    let origin = if cors_origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        match cors_origin.parse::<HeaderValue>() {
            Ok(value) => AllowOrigin::exact(value),
            Err(e) => {
                tracing::warn!("Invalid CORS origin '{}': {}, allowing any", cors_origin, e);
                AllowOrigin::any()
            }
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let media_prefix = state.media.url_prefix().trim_end_matches('/').to_string();
    let media_files = ServeDir::new(state.media.root());

    let mut router = Router::new()
        .nest("/api", build_api_router())
        .merge(short_links::router());

    if media_prefix.is_empty() {
        tracing::warn!("Media URL prefix is '/', media files are not served");
    } else {
        router = router.nest_service(&media_prefix, media_files);
    }

    router
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ))
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

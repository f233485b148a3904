// SPDX-License-Identifier: MIT

//! HTTP route handlers.

pub mod auth;
pub mod google;
pub mod health;
pub mod profile;

use crate::middleware::auth::require_auth;
use crate::AppState;
use axum::http::{header, Method};
use axum::response::Redirect;
use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - the app serves its own frontend, so only localhost
    // origins (dev servers) are allowed cross-origin.
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(google::routes())
        .merge(profile::public_routes())
        .route("/logout", get(|| async { Redirect::temporary("/") }));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .merge(profile::protected_routes())
        .merge(google::protected_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let static_files = ServeDir::new(&state.config.static_dir);
    let views = ServeDir::new(&state.config.views_dir).append_index_html_on_directories(true);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/static", static_files)
        .fallback_service(views)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::telemetry::track_requests,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .with_state(state)
}

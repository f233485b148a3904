// SPDX-License-Identifier: MIT

//! Request tracing and metrics middleware.
//!
//! Wraps every request in a server span named `"{METHOD} {route}"` and
//! records its duration and status into the metrics registry. The route
//! label is the matched pattern (e.g. `/api/profile/learn_status`), not
//! the raw path, so label cardinality stays bounded.

use crate::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

pub async fn track_requests(
    State(state): State<Arc<AppState>>,
    matched_path: Option<MatchedPath>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    // Requests served by the static fallback have no matched pattern;
    // collapsing them keeps metric label cardinality bounded. The full
    // path is still on the span as http.target.
    let route = matched_path
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_default();
    let user_agent = request
        .headers()
        .get(axum::http::header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("")
        .to_string();

    let span = tracing::info_span!(
        "http.request",
        otel.name = format!("{} {}", method, route),
        otel.kind = "server",
        http.method = %method,
        http.route = %route,
        http.target = %target,
        http.user_agent = %user_agent,
        http.status_code = tracing::field::Empty,
        otel.status_code = tracing::field::Empty,
    );

    let start = Instant::now();
    let response = next.run(request).instrument(span.clone()).await;
    let status = response.status();

    span.record("http.status_code", status.as_u16());
    if status.is_client_error() || status.is_server_error() {
        span.record("otel.status_code", "ERROR");
    } else {
        span.record("otel.status_code", "OK");
    }

    state
        .metrics
        .record_request(&method, &route, status.as_u16(), start.elapsed());

    response
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::db::Database;
    use crate::services::GoogleOAuthService;
    use crate::telemetry::MetricsRegistry;
    use crate::AppState;
    use axum::{body::Body, http::Request, routing::get, Router};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        let config = Config::test_default();
        let metrics = Arc::new(MetricsRegistry::new(
            &config.service_name,
            &config.service_version,
        ));
        let db = Database::connect(&config.database_url(), metrics.clone())
            .expect("lazy pool should build");
        let google_oauth = GoogleOAuthService::new(&config);

        Arc::new(AppState {
            config,
            db,
            metrics,
            google_oauth,
        })
    }

    #[tokio::test]
    async fn test_request_recorded_with_matched_route() {
        let state = test_state();
        let app = Router::new()
            .route("/items/{id}", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                super::track_requests,
            ))
            .with_state(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/items/42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_success());
        assert_eq!(state.metrics.total_requests(), 1);

        // The metrics label is the route pattern, not the concrete path.
        let text = state.metrics.render_prometheus();
        assert!(text.contains("path=\"/items/{id}\""));
        assert!(!text.contains("path=\"/items/42\""));
    }

    #[tokio::test]
    async fn test_error_status_recorded() {
        let state = test_state();
        let app = Router::new()
            .route(
                "/fail",
                get(|| async { axum::http::StatusCode::INTERNAL_SERVER_ERROR }),
            )
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                super::track_requests,
            ))
            .with_state(state.clone());

        let response = app
            .oneshot(Request::builder().uri("/fail").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 500);
        let text = state.metrics.render_prometheus();
        assert!(text.contains("path=\"/fail\",status=\"500\"} 1"));
    }
}

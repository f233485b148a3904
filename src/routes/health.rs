// SPDX-License-Identifier: MIT

//! Health, readiness, liveness, metrics and version endpoints.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::config::Config;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/live", get(live))
        .route("/metrics", get(metrics))
        .route("/api/version", get(version))
}

#[derive(Serialize)]
struct CheckResult {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: String,
    version: String,
    checks: HealthChecks,
}

#[derive(Serialize)]
struct HealthChecks {
    database: CheckResult,
    telemetry: CheckResult,
}

/// Deep health check: probes the database, reports telemetry wiring.
///
/// 200 when all checks pass, 503 otherwise.
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match state.db.ping().await {
        Ok(()) => CheckResult {
            status: "ok",
            detail: None,
        },
        Err(e) => {
            // Full error goes to the log only; the body stays generic.
            tracing::warn!(error = %e, "Health check: database unreachable");
            CheckResult {
                status: "error",
                detail: Some("connection failed".to_string()),
            }
        }
    };

    // Telemetry is initialized at startup; report the request counter as
    // evidence the pipeline is recording.
    let telemetry = CheckResult {
        status: "ok",
        detail: Some(format!(
            "requests_recorded={}",
            state.metrics.total_requests()
        )),
    };

    let healthy = database.status == "ok";
    state.metrics.record_health_check(healthy);

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" },
        service: state.config.service_name.clone(),
        version: state.config.service_version.clone(),
        checks: HealthChecks {
            database,
            telemetry,
        },
    };

    (status_code, Json(body))
}

#[derive(Serialize)]
struct ReadyResponse {
    ready: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing_env: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<String>,
}

/// Readiness: required configuration present and the database answers.
async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let missing_env = Config::missing_required_env();
    if !missing_env.is_empty() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                missing_env,
                database: None,
            }),
        );
    }

    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                missing_env: Vec::new(),
                database: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check: database unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    ready: false,
                    missing_env: Vec::new(),
                    database: Some("connection failed".to_string()),
                }),
            )
        }
    }
}

/// Liveness: the process is up and serving.
async fn live() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "alive" }))
}

/// Prometheus text exposition of the in-process registry.
async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    (headers, state.metrics.render_prometheus())
}

#[derive(Serialize)]
struct VersionResponse {
    success: bool,
    data: VersionInfo,
}

#[derive(Serialize)]
struct VersionInfo {
    service: String,
    version: String,
    commit_hash: &'static str,
    build_time: &'static str,
    environment: String,
}

/// Build identity: version, short commit hash, build timestamp.
async fn version(State(state): State<Arc<AppState>>) -> Json<VersionResponse> {
    Json(VersionResponse {
        success: true,
        data: VersionInfo {
            service: state.config.service_name.clone(),
            version: state.config.service_version.clone(),
            commit_hash: short_commit(),
            build_time: option_env!("BUILD_TIME").unwrap_or("unknown"),
            environment: state.config.environment.clone(),
        },
    })
}

/// First 7 characters of the build commit, from CI env when available.
fn short_commit() -> &'static str {
    let full = option_env!("GIT_COMMIT_HASH")
        .or(option_env!("GITHUB_SHA"))
        .unwrap_or("unknown");
    full.get(..7).unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_commit_is_at_most_seven_chars() {
        assert!(short_commit().len() <= 7);
    }
}

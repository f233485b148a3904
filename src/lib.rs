// SPDX-License-Identifier: MIT

//! Learntrack: learning-status web backend with end-to-end telemetry.
//!
//! This crate provides the backend API for account registration/login
//! (password and Google OAuth), learning-status records, and an
//! OpenTelemetry-based observability layer (request spans, OTLP export,
//! in-process metrics aggregation).

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod telemetry;

use std::sync::Arc;

use config::Config;
use db::Database;
use services::GoogleOAuthService;
use telemetry::MetricsRegistry;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub metrics: Arc<MetricsRegistry>,
    pub google_oauth: GoogleOAuthService,
}

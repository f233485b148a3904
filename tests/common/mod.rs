// SPDX-License-Identifier: MIT

use learntrack::config::Config;
use learntrack::db::Database;
use learntrack::routes::create_router;
use learntrack::services::GoogleOAuthService;
use learntrack::telemetry::MetricsRegistry;
use learntrack::AppState;
use std::sync::Arc;

/// Check if a MySQL test database is available via environment variable.
#[allow(dead_code)]
pub fn database_available() -> bool {
    std::env::var("TEST_DATABASE_URL").is_ok()
}

/// Skip test with message if no test database is configured.
#[macro_export]
macro_rules! require_database {
    () => {
        if !crate::common::database_available() {
            eprintln!("⚠️  Skipping: TEST_DATABASE_URL not set");
            return;
        }
    };
}

/// Create a test app with an offline (lazily connected) database.
///
/// The pool never dials MySQL until a handler runs a query, so routing,
/// auth and telemetry behavior can be exercised without a server.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let metrics = Arc::new(MetricsRegistry::new(
        &config.service_name,
        &config.service_version,
    ));
    let db = Database::connect(&config.database_url(), metrics.clone())
        .expect("lazy pool construction should not fail");
    let google_oauth = GoogleOAuthService::new(&config);

    let state = Arc::new(AppState {
        config,
        db,
        metrics,
        google_oauth,
    });

    (create_router(state.clone()), state)
}

/// Create a test app wired to the database named by `TEST_DATABASE_URL`,
/// with migrations applied. Callers must gate on `require_database!`.
#[allow(dead_code)]
pub async fn create_live_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let metrics = Arc::new(MetricsRegistry::new(
        &config.service_name,
        &config.service_version,
    ));

    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let db = Database::connect(&url, metrics.clone()).expect("pool construction should not fail");
    db.run_migrations()
        .await
        .expect("migrations should apply to the test database");

    let google_oauth = GoogleOAuthService::new(&config);

    let state = Arc::new(AppState {
        config,
        db,
        metrics,
        google_oauth,
    });

    (create_router(state.clone()), state)
}

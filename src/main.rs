// SPDX-License-Identifier: MIT

use std::sync::Arc;

use learntrack::config::Config;
use learntrack::db::Database;
use learntrack::routes::create_router;
use learntrack::services::GoogleOAuthService;
use learntrack::telemetry::{self, MetricsRegistry};
use learntrack::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let telemetry = telemetry::init(&config)?;

    let metrics = Arc::new(MetricsRegistry::new(
        &config.service_name,
        &config.service_version,
    ));

    let db = Database::connect(&config.database_url(), metrics.clone())?;

    // Migrations need the server to be up; a warning keeps local runs
    // without MySQL usable for the static pages.
    if let Err(e) = db.run_migrations().await {
        tracing::warn!(error = %e, "Skipping migrations, database not ready");
    }

    let google_oauth = GoogleOAuthService::new(&config);

    let port = config.port;
    let state = Arc::new(AppState {
        config,
        db,
        metrics,
        google_oauth,
    });

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down, flushing telemetry");
    telemetry.shutdown();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

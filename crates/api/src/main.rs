use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rendertrack_api::background::reconciliation;
use rendertrack_api::config::ServerConfig;
use rendertrack_api::router::build_app_router;
use rendertrack_api::state::AppState;
use rendertrack_render::RenderServiceApi;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "rendertrack_api=debug,rendertrack_reconciler=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        render_service = %config.render_service.base_url,
        "Loaded server configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = rendertrack_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    rendertrack_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    rendertrack_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Render service client ---
    let render_api = Arc::new(
        RenderServiceApi::new(config.render_service.clone())
            .expect("Failed to build render service client"),
    );

    // --- Reconciler ---
    let reconcile_cancel = CancellationToken::new();
    let reconcile_handle = reconciliation::spawn(
        pool.clone(),
        Arc::clone(&render_api),
        config.reconciler.clone(),
        reconcile_cancel.clone(),
    );

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        render_api,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    reconcile_cancel.cancel();
    if tokio::time::timeout(Duration::from_secs(5), reconcile_handle)
        .await
        .is_err()
    {
        tracing::warn!("Reconciler did not stop within 5s");
    }
    tracing::info!("Reconciler stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM (on Unix) to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

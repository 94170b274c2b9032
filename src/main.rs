use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ovenly_api::{
    api, bootstrap,
    config::{Config, InitMode},
    paths::PathResolver,
    storage::RedbConnector,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "ovenly-api starting");

    // Load configuration
    let config = Config::load()?;
    info!(
        app = %config.app.name,
        environment = ?config.app.environment,
        serverless = config.app.serverless,
        "Loaded configuration"
    );

    let paths = PathResolver::from_environment(config.app.serverless)?;
    info!("Uploads directory: {}", paths.uploads_root().display());

    let data_dir = paths.resolve(&config.database.data_dir);
    let connector = Arc::new(RedbConnector::new(data_dir));
    let state = Arc::new(AppState::new(config.clone(), connector, paths));

    match config.init_mode() {
        InitMode::Listen => {
            if let Err(e) = bootstrap::initialize(Arc::clone(&state)).await {
                error!(error = %e, "Failed to initialize application");
                // Give the log writer a moment before exiting.
                tokio::time::sleep(Duration::from_millis(100)).await;
                std::process::exit(1);
            }
        }
        InitMode::Guarded => {
            state
                .init
                .start(bootstrap::initialize(Arc::clone(&state)));
        }
    }

    // Build and start the HTTP server
    let app = api::routes::create_router(Arc::clone(&state));
    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on: http://{bind_address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = state.db.disconnect().await {
        error!(error = %e, "Failed to close database connection during shutdown");
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}

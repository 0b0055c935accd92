//! paytrack-intake - payroll contract intake microservice
//!
//! Accepts employment contracts, runs the five-stage payroll workflow in the
//! background and serves job status, employees and the dashboard summary.

use anyhow::{Context, Result};
use clap::Parser;
use paytrack_common::config::{CompiledDefaults, RootFolderInitializer, TomlConfig};
use paytrack_common::events::EventBus;
use paytrack_common::logging::init_logging;
use tokio::signal;
use tracing::info;

use paytrack_intake::config::{Args, IntakeSettings};
use paytrack_intake::services::build_parser;
use paytrack_intake::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml = TomlConfig::load_or_default();
    let settings = IntakeSettings::resolve(&args, &toml, &CompiledDefaults::for_current_platform());

    init_logging(&settings.log_level);

    info!(
        "Starting paytrack-intake v{} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE"),
    );

    let initializer = RootFolderInitializer::new(settings.root_folder.clone());
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path();
    let db_pool = paytrack_intake::db::init_database_pool(&db_path).await?;
    info!("Database: {}", db_path.display());

    let parser = build_parser(settings.parser_url.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to configure contract parser: {}", e))?;
    info!("Contract parser: {}", parser.name());

    let event_bus = EventBus::new(settings.event_bus_capacity);

    let state = AppState::new(
        db_pool,
        event_bus,
        parser,
        &settings,
        initializer.uploads_dir(),
        initializer.outputs_dir(),
    );

    let interrupted = state.orchestrator.fail_interrupted_jobs().await?;
    if interrupted > 0 {
        info!("Marked {} interrupted payroll job(s) as failed", interrupted);
    }

    let app = paytrack_intake::build_router(state, &settings.allowed_origins);

    let addr = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}

use std::sync::Arc;

use anyhow::Context;
use staff_portal::config::PortalConfig;
use staff_portal::onboarding::{OnboardingDeps, OnboardingRouteState, spawn_idle_sweep};
use staff_portal::server::build_router;
use staff_portal::store::{Database, LibSqlBackend};
use staff_portal::uploads::{FileStore, LocalFileStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = PortalConfig::from_env().context("invalid configuration")?;

    eprintln!("Staff Portal v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   Uploads: {}", config.upload_dir.display());
    eprintln!("   API: http://0.0.0.0:{}/api/onboarding", config.port);

    // ── Database ──────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .context("failed to open database")?,
    );

    // ── File storage ──────────────────────────────────────────────────────
    let file_store = LocalFileStore::new(config.upload_dir.clone(), config.public_url.clone());
    file_store
        .ensure_dirs()
        .await
        .context("failed to create upload directory")?;
    let files: Arc<dyn FileStore> = Arc::new(file_store);

    // ── HTTP ──────────────────────────────────────────────────────────────
    let mut deps = OnboardingDeps::new(db, files);
    deps.provider_id = config.provider_id.clone();
    let state = OnboardingRouteState::new(deps);
    let _sweep = spawn_idle_sweep(state.sessions.clone(), config.session_idle);
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Staff portal listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down");
        })
        .await
        .context("server error")?;

    Ok(())
}

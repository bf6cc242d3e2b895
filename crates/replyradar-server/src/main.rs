mod api;
mod middleware;

use std::sync::Arc;

use replyradar_engine::{
    CleanupConfig, CleanupService, DiscoveryConfig, DiscoveryService, Scheduler,
};
use replyradar_platform::NoopAdapter;
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(replyradar_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = replyradar_db::PoolConfig::from_app_config(&config);
    let pool = replyradar_db::connect_pool(&config.database_url, pool_config).await?;
    replyradar_db::run_migrations(&pool).await?;

    // The platform client is deployed separately; until it is wired in,
    // discovery runs against the no-op adapter and the API surface is
    // still fully usable.
    let discovery = Arc::new(DiscoveryService::new(
        pool.clone(),
        Arc::new(NoopAdapter),
        DiscoveryConfig::from_app_config(&config),
    ));

    let scheduler = Arc::new(Scheduler::new(pool.clone(), discovery).await?);
    let registered = scheduler.initialize().await?;
    scheduler.start().await?;
    tracing::info!(jobs = registered, "discovery scheduler started");

    let cleanup = CleanupService::new(pool.clone(), CleanupConfig::from_app_config(&config));
    tokio::spawn(cleanup.run_loop());

    let app = build_app(AppState {
        pool,
        scheduler: Arc::clone(&scheduler),
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}

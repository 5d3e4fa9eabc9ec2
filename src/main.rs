//! Entry point: loads configuration and the static catalog, wires up the
//! orchestrator's scheduler/watcher/background-load, then waits for a
//! shutdown signal.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use lapcache_harvester::{Catalog, Config, Orchestrator, UpstreamClient};

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}

fn log_memory_limit() {
    match std::env::var("LAPCACHE_MEMORY_LIMIT_MB") {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(mb) => log::info!("memory soft limit configured: {mb} MB"),
            Err(_) => log::warn!("LAPCACHE_MEMORY_LIMIT_MB={raw:?} is not a valid integer, ignoring"),
        },
        Err(_) => log::debug!("no memory soft limit configured"),
    }
}

/// Log a one-line summary of what's already on disk before the bootstrap
/// load begins, so operators can see what will be served while the first
/// sweep runs.
async fn log_reconciliation_summary(store: &lapcache_harvester::cache::Store) {
    let summary = store.main.reconciliation_summary().await;
    let fmt = |t: std::time::SystemTime| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339();
    match (summary.oldest, summary.newest) {
        (Some(oldest), Some(newest)) => log::info!(
            "reconciliation: {} combination(s) cached, oldest {}, newest {}",
            summary.combination_count,
            fmt(oldest),
            fmt(newest),
        ),
        _ => log::info!("reconciliation: cache is empty, starting cold"),
    }
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => log::info!("received SIGINT, shutting down"),
            _ = terminate.recv() => log::info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        log::info!("received shutdown signal");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config_path = env_path("LAPCACHE_CONFIG_PATH", "config.json");
    let catalog_path = env_path("LAPCACHE_CATALOG_PATH", "catalog.json");
    let cache_dir = env_path("LAPCACHE_CACHE_DIR", "cache");
    let temp_dir = env_path("LAPCACHE_CACHE_TEMP_DIR", "cache_temp");
    let base_url = std::env::var("LAPCACHE_UPSTREAM_BASE_URL")
        .unwrap_or_else(|_| "https://leaderboard.example.test".to_string());

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            log::error!("fatal: unreadable config at {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    let catalog = match Catalog::load(&catalog_path) {
        Ok(catalog) => catalog,
        Err(e) => {
            log::error!("fatal: failed to load catalog at {}: {e}", catalog_path.display());
            std::process::exit(1);
        }
    };
    log::info!(
        "catalog loaded: {} tracks, {} classes, {} combinations",
        catalog.tracks().len(),
        catalog.classes().len(),
        catalog.tracks().len() * catalog.classes().len()
    );

    let upstream = UpstreamClient::new(base_url).context("failed to build upstream HTTP client")?;

    std::fs::create_dir_all(&cache_dir).context("failed to create cache directory")?;
    let store = lapcache_harvester::cache::Store::new(cache_dir.clone(), temp_dir);

    log_memory_limit();
    log_reconciliation_summary(&store).await;

    let orchestrator = Orchestrator::new(
        catalog,
        store,
        upstream,
        cache_dir.clone(),
        Duration::from_secs(config.indexing_minutes * 60),
    );

    orchestrator.start_scheduler(u32::from(config.refresh_hour), u32::from(config.refresh_minute));
    orchestrator.start_watcher(cache_dir.join("refresh_now"), None);
    orchestrator.start_background_load();

    wait_for_shutdown_signal().await;
    orchestrator.cleanup();

    Ok(())
}

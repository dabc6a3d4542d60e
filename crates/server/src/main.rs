mod bootstrap;
mod cache;
pub mod dashboard;
mod health;
mod pdf;

use std::future::IntoFuture;
use std::time::Duration;

use anyhow::Result;
use ganvie_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use ganvie_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    // Now bootstrap using the same config we already loaded
    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
    )
    .await?;

    let router = dashboard::router(
        app.db_pool.clone(),
        Duration::from_secs(app.config.dashboard.cache_ttl_secs),
        app.config.report.template_dir.as_deref(),
    );

    let addr = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        event_name = "system.server.started",
        address = %addr,
        cache_ttl_secs = app.config.dashboard.cache_ttl_secs,
        "dashboard server listening"
    );

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let mut serving = tokio::spawn(
        axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()).into_future(),
    );

    tokio::select! {
        result = &mut serving => {
            result??;
            return Ok(());
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
        }
    }

    tracing::info!(
        event_name = "system.server.stopping",
        grace_secs = app.config.server.graceful_shutdown_secs,
        "dashboard server draining connections"
    );

    if drained_within(grace, serving).await? {
        tracing::info!(event_name = "system.server.stopped", "dashboard server stopped");
    } else {
        tracing::warn!(
            event_name = "system.server.forced_stop",
            "shutdown grace period elapsed with connections still open"
        );
    }

    Ok(())
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Waits for the serve task to finish draining, up to `grace`. Returns
/// `false` when the window elapses and the task had to be aborted.
async fn drained_within(
    grace: Duration,
    mut serving: tokio::task::JoinHandle<std::io::Result<()>>,
) -> Result<bool> {
    match tokio::time::timeout(grace, &mut serving).await {
        Ok(result) => {
            result??;
            Ok(true)
        }
        Err(_) => {
            serving.abort();
            Ok(false)
        }
    }
}

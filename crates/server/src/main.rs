mod bootstrap;
mod health;
mod routes;

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use gangway_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use gangway_core::config::LogFormat::*;
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

    let app = Arc::new(bootstrap::bootstrap_with_config(config)?);
    let shutdown_grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "gangway-server listening for fulfillment webhooks"
    );

    let (signal_tx, signal_rx) = tokio::sync::oneshot::channel::<()>();
    let shutdown = async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = signal_tx.send(());
    };

    let server =
        axum::serve(listener, routes::router(app)).with_graceful_shutdown(shutdown).into_future();

    tokio::select! {
        result = server => result?,
        _ = async {
            let _ = signal_rx.await;
            tokio::time::sleep(shutdown_grace).await;
        } => {
            tracing::warn!(
                event_name = "system.server.shutdown_forced",
                correlation_id = "shutdown",
                grace_secs = shutdown_grace.as_secs(),
                "graceful shutdown window elapsed; dropping in-flight requests"
            );
        }
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "gangway-server stopping"
    );

    Ok(())
}

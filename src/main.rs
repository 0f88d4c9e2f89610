//! coolkv - In-Memory Key-Value Store
//!
//! Entry point for the server binary. Builds the shared store, starts the
//! expiry sweeper, and runs the TCP command server and the HTTP gateway
//! side by side until a shutdown signal arrives.

use anyhow::Context;
use clap::Parser;
use coolkv::config::Config;
use coolkv::http;
use coolkv::server::TcpServer;
use coolkv::storage::{ExpirySweeper, StorageEngine};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn print_banner(config: &Config) {
    println!(
        r#"
coolkv v{} - In-Memory Key-Value Store
──────────────────────────────────────────────
Line protocol on {}
HTTP gateway on  {}

Use Ctrl+C to shutdown gracefully.
"#,
        coolkv::VERSION,
        config.tcp_addr(),
        config.http_addr()
    );
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Resolves once the shutdown flag flips.
async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    // An Err means the sender is gone, which also means shutdown
    let _ = rx.wait_for(|stop| *stop).await;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level())),
        )
        .with_target(false)
        .init();

    // Shared by both front-ends
    let storage = Arc::new(StorageEngine::new());
    info!("Storage engine initialized with 64 shards");

    let sweeper = ExpirySweeper::start(Arc::clone(&storage), config.expiry_config());

    let tcp_server = TcpServer::bind(
        config.tcp_addr(),
        Arc::clone(&storage),
        config.connection_config(),
        config.max_connections,
    )
    .await
    .with_context(|| format!("failed to bind line protocol on {}", config.tcp_addr()))?;

    let http_listener = TcpListener::bind(config.http_addr())
        .await
        .with_context(|| format!("failed to bind HTTP gateway on {}", config.http_addr()))?;

    print_banner(&config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let tcp_task = tokio::spawn(tcp_server.run(wait_for_shutdown(shutdown_rx.clone())));
    let http_task = tokio::spawn(http::serve(
        http_listener,
        Arc::clone(&storage),
        config.http_config(),
        wait_for_shutdown(shutdown_rx),
    ));

    shutdown_signal().await;
    info!("Shutdown signal received, stopping server...");
    let _ = shutdown_tx.send(true);

    if let Err(e) = tcp_task.await {
        warn!(error = %e, "TCP server task ended abnormally");
    }
    match http_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "HTTP gateway stopped with an error"),
        Err(e) => warn!(error = %e, "HTTP gateway task ended abnormally"),
    }

    sweeper.stop();

    let stats = storage.stats();
    info!(
        keys = stats.keys,
        sets = stats.set_ops,
        gets = stats.get_ops,
        deletes = stats.del_ops,
        expired = stats.expired,
        "Server shutdown complete"
    );
    Ok(())
}

//! herald-server - REST API server binary.

use std::net::SocketAddr;

use herald_core::HeraldConfig;
use herald_server::{bootstrap, create_server};
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
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
}

fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::from_default_env()
        .add_directive(Level::INFO.into())
        .add_directive("herald_server=debug".parse()?);

    // HERALD_LOG_FORMAT=json switches to structured output
    if std::env::var("HERALD_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing()?;

    // HERALD_CONFIG points at a file; HERALD_* variables override it
    let config = match std::env::var("HERALD_CONFIG") {
        Ok(path) => {
            info!(path = %path, "Loading configuration file");
            HeraldConfig::from_file(&path)?.apply_overrides(|key| std::env::var(key).ok())
        }
        Err(_) => HeraldConfig::from_env(),
    };

    let (state, worker) = bootstrap(&config)?;
    let app = create_server(state);

    let addr: SocketAddr = config.bind_address().parse()?;
    info!("Starting herald-server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Shutdown signal received, draining event queue...");
        })
        .await?;

    // The router (and its dispatcher) is gone, so the worker drains and exits
    worker.await?;

    info!("Server stopped cleanly");
    Ok(())
}

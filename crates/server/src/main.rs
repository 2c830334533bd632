use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use printwizard_core::{
    config_path, load_config, validate_config, HttpJobService, RemoteJobService, SanitizedConfig,
};
use printwizard_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = config_path();

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!(
        "Job service: {}",
        SanitizedConfig::from(&config).remote.url
    );
    info!(
        "Polling every {}ms, countdown budget {}s",
        config.lifecycle.poll_interval_ms, config.lifecycle.eta_budget_secs
    );
    info!(
        "Sessions expire after {}s idle, at most {} tracked",
        config.server.session_idle_secs, config.server.max_sessions
    );

    // Create job service client
    let remote: Arc<dyn RemoteJobService> = Arc::new(
        HttpJobService::new(config.remote.clone()).context("Failed to create job service client")?,
    );
    info!("Using job service backend: {}", remote.service_name());

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), remote));

    // Drop sessions whose users went away
    let sweeper = {
        let state = Arc::clone(&state);
        let period = config.server.session_idle() / 4;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                state.evict_idle().await;
            }
        })
    };

    // Create router
    let app = create_router(Arc::clone(&state));

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Stop background polling of every session
    info!("Server shutting down...");
    sweeper.abort();
    state.reset_all().await;
    info!("Job controllers stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use kubefacade::cli::{format_endpoints, Args};
use kubefacade::cluster::{InMemoryClusterClient, KubeClusterClient, SharedClusterClient};
use kubefacade::config::load_config;
use kubefacade::server::{create_router, AppState};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.log_filter())),
        )
        .init();

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    // Load .env file if specified
    if let Some(ref env_file) = args.env_file {
        dotenvy::from_path(env_file)
            .with_context(|| format!("Failed to load env file {}", env_file.display()))?;
    }

    let config = load_config(args.config.as_deref()).context("Failed to load config")?;
    let config = args.apply_to(config);

    let client: SharedClusterClient = if args.in_memory {
        warn!("Serving against an in-memory cluster; nothing reaches Kubernetes");
        Arc::new(InMemoryClusterClient::new())
    } else {
        let client = KubeClusterClient::connect(&config.kube)
            .await
            .context("Failed to initialize Kubernetes client")?;
        Arc::new(client)
    };

    let app = create_router(AppState::new(client));

    let addr = config.server.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Server listening on {}", addr);
    for line in format_endpoints().lines() {
        info!("{}", line);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

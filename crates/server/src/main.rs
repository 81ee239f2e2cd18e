use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use invoicer_core::{
    load_config, validate_config, Collaborators, CommandCollaborator, Config, FsLocalCleanup,
    OrderStore, PipelineController, PipelineKind, SanitizedConfig, SqliteOrderStore,
};
use invoicer_server::api::create_router;
use invoicer_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    let fmt_layer = match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => tracing_subscriber::fmt::layer().json().boxed(),
        _ => tracing_subscriber::fmt::layer().boxed(),
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(fmt_layer)
        .init();

    // Determine config path
    let config_path = std::env::var("INVOICER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Invoicer v{} starting", VERSION);
    let sanitized = SanitizedConfig::from(&config);
    info!(
        "Configuration: {}",
        serde_json::to_string(&sanitized).unwrap_or_else(|_| "<unserializable>".to_string())
    );

    let collaborators = build_collaborators(&config)?;

    let controller = |kind: PipelineKind, enabled: bool| {
        if enabled {
            info!("{} pipeline enabled at /{}", kind.title(), kind.route());
            Some(Arc::new(PipelineController::from_config(
                kind,
                &config.pipelines,
                collaborators.clone(),
            )))
        } else {
            warn!("{} pipeline disabled", kind.title());
            None
        }
    };
    let invoice = controller(PipelineKind::Invoice, config.pipelines.invoice.enabled);
    let training = controller(PipelineKind::Training, config.pipelines.training.enabled);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, invoice, training));
    let app = create_router(state);

    // Start server
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Wires the command-backed collaborators and the workspace cleanup.
///
/// The order store used by recognition is opened only when the invoice
/// pipeline is enabled.
fn build_collaborators(config: &Config) -> Result<Collaborators> {
    let mut commands =
        CommandCollaborator::new(config.commands.clone(), config.workspace.dir.clone());

    if config.pipelines.invoice.enabled {
        let order_store: Arc<dyn OrderStore> = Arc::new(
            SqliteOrderStore::new(&config.database.path).with_context(|| {
                format!(
                    "Failed to open order database at {:?}",
                    config.database.path
                )
            })?,
        );
        info!("Order store initialized at {:?}", config.database.path);
        commands = commands.with_order_store(order_store);
    }

    let commands = Arc::new(commands);
    let cleanup = Arc::new(FsLocalCleanup::new(config.workspace.dir.clone()));

    Ok(Collaborators {
        storage: commands.clone(),
        inference: commands.clone(),
        recognizer: commands,
        cleanup,
    })
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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

    info!("Shutdown signal received");
}

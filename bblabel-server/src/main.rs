//! BlackBytt Labels Server
//!
//! Backend of the product-label app: verifies platform webhooks and pushes
//! product changes to open admin sessions over Server-Sent Events.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use bblabel_core::auth::ShopifyAuthGateway;
use bblabel_core::events::hub_event_channel_with_capacity;
use bblabel_core::hub::EventHub;
use bblabel_core::processors::EventForwarder;
use bblabel_core::store::{LabelStore, MemoryStore, PgStore, SessionStore};
use clap::{Parser, ValueEnum};
use config::{ConfigLoader, get_database_url};
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

/// BlackBytt Labels - webhook to SSE bridge for the label app
#[derive(Parser, Debug)]
#[command(name = "bblabel-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./bblabel-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,

    /// Keep labels and sessions in memory instead of Postgres
    #[arg(long, default_value = "false")]
    memory: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "BBLABEL_LOG_FORMAT")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    init_tracing(args.log_format);

    tracing::info!("Starting bblabel-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded_config.server.listen;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let shared_config = loaded_config.into_shared();

    // Pick the store
    let (labels, sessions, db_pool): (Arc<dyn LabelStore>, Arc<dyn SessionStore>, Option<PgPool>) =
        if args.memory {
            tracing::warn!("Using in-memory store, data is lost on restart");
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store, None)
        } else {
            let db_pool = connect_database(args.migrate).await?;
            let store = Arc::new(PgStore::new(db_pool.clone()));
            (store.clone(), store, Some(db_pool))
        };

    // Event hub and the queue feeding it
    let hub = EventHub::new(shared_config.stream.hub_config());
    let (forward_tx, forward_rx) =
        hub_event_channel_with_capacity(shared_config.stream.forward_queue);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let forwarder = tokio::spawn(EventForwarder::new(hub.clone(), forward_rx, shutdown_rx).run());

    // Create application state
    let state = AppState {
        hub: hub.clone(),
        auth: Arc::new(ShopifyAuthGateway::new(shared_config.shopify.clone())),
        labels,
        sessions,
        forward_tx,
        config: shared_config.clone(),
    };

    // Spawn config reload handler (listens for SIGHUP)
    let shutdown_notify = spawn_config_reload_handler(shared_config, config_loader);

    // Build the router
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr, hub).await;

    // Stop background tasks
    shutdown_notify.notify_one();
    let _ = shutdown_tx.send(true);
    if let Err(e) = forwarder.await {
        tracing::error!(error = %e, "EventForwarder task failed");
    }

    // Close database connections gracefully
    if let Some(db_pool) = db_pool {
        tracing::info!("Closing database connections...");
        db_pool.close().await;
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Connect to Postgres and optionally run migrations.
async fn connect_database(migrate: bool) -> anyhow::Result<PgPool> {
    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set (use --memory to run without a database)");
        e
    })?;

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    if migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    Ok(db_pool)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=debug"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

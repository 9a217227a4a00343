use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eggdrop::{
    api, auth,
    config::ContestConfig,
    state::AppState,
    store::{RecordStore, SqliteStore},
    transport::{ChatTransport, HttpBridgeTransport, MemoryTransport},
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eggdrop=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting eggdrop...");

    let config = match ContestConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let auth_config = Arc::new(auth::AuthConfig::from_env());
    let gateway = Arc::new(auth::GatewayAuth::from_env());

    // Create the schema once before serving anything
    let store = match SqliteStore::open(config.store_path.clone()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("Failed to open store {}: {}", config.store_path.display(), e);
            std::process::exit(1);
        }
    };
    if let Err(e) = store.init().await {
        tracing::error!("Failed to initialize store {}: {}", store.path().display(), e);
        std::process::exit(1);
    }

    let transport: Arc<dyn ChatTransport> = match &config.bridge_url {
        Some(url) => match HttpBridgeTransport::new(
            url,
            config.bridge_token.clone(),
            config.transport_timeout,
        ) {
            Ok(transport) => {
                tracing::info!("Chat bridge at {}", url);
                Arc::new(transport)
            }
            Err(e) => {
                tracing::error!("Failed to set up chat bridge: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!(
                "CHAT_BRIDGE_URL not set, chat side effects are discarded (dry run)"
            );
            Arc::new(MemoryTransport::dry_run())
        }
    };

    tracing::info!("Using {} transport", transport.name());

    let bind_addr = config.bind_addr;
    let state = Arc::new(AppState::new(store, transport, config));
    let app = api::router(state, auth_config, gateway);

    tracing::info!("Listening on http://{}", bind_addr);

    let listener = match tokio::net::TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        tracing::info!("Shutting down");
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
    tracing::info!("Goodbye");
}
